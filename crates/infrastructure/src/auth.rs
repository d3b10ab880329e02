//! JWT 认证适配。
//!
//! 令牌由外部的登录/注册流程签发，这里只做两件事：
//! 校验并解析令牌中的 userId，然后从数据库加载用户身份。

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use sqlx::PgPool;

use application::{AuthError, AuthService};
use domain::{UserId, UserIdentity};

/// JWT Claims，与签发方约定的载荷
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    nome: String,
    email: String,
}

pub struct JwtAuthService {
    decoding_key: DecodingKey,
    pool: PgPool,
}

impl JwtAuthService {
    pub fn new(secret: &str, pool: PgPool) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            pool,
        }
    }
}

#[async_trait]
impl AuthService for JwtAuthService {
    async fn verify_token(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|err| {
                tracing::debug!(error = %err, "JWT 校验失败");
                AuthError::InvalidToken
            })?
            .claims;

        let row = sqlx::query_as::<_, UserRow>("SELECT id, nome, email FROM users WHERE id = $1")
            .bind(claims.user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| AuthError::unavailable(err.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserIdentity::new(UserId::new(row.id), row.nome, row.email))
    }

    async fn set_online(&self, user_id: UserId, online: bool) -> Result<(), AuthError> {
        sqlx::query("UPDATE users SET online = $2 WHERE id = $1")
            .bind(i64::from(user_id))
            .bind(online)
            .execute(&self.pool)
            .await
            .map_err(|err| AuthError::unavailable(err.to_string()))?;
        Ok(())
    }
}
