//! 认证服务抽象。
//!
//! 凭证校验、令牌签发和密码哈希都发生在这道接口之外；
//! 中心只关心"令牌 → 用户身份"和在线标记的写回。

use async_trait::async_trait;
use thiserror::Error;

use domain::{UserId, UserIdentity};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,
    #[error("user not found")]
    UserNotFound,
    #[error("auth service unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

#[async_trait]
pub trait AuthService: Send + Sync {
    /// 解析令牌为用户身份。
    async fn verify_token(&self, token: &str) -> Result<UserIdentity, AuthError>;

    /// 写回用户的在线标记。
    async fn set_online(&self, user_id: UserId, online: bool) -> Result<(), AuthError>;
}

/// 内存实现的认证服务（用于测试）
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// 以"令牌 → 身份"静态表为后端的认证服务。
    pub struct MemoryAuthService {
        tokens: Mutex<HashMap<String, UserIdentity>>,
        online: Mutex<HashSet<UserId>>,
    }

    impl Default for MemoryAuthService {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryAuthService {
        pub fn new() -> Self {
            Self {
                tokens: Mutex::new(HashMap::new()),
                online: Mutex::new(HashSet::new()),
            }
        }

        pub fn issue(&self, token: impl Into<String>, identity: UserIdentity) {
            self.tokens.lock().unwrap().insert(token.into(), identity);
        }

        pub fn is_online(&self, user_id: UserId) -> bool {
            self.online.lock().unwrap().contains(&user_id)
        }
    }

    #[async_trait]
    impl AuthService for MemoryAuthService {
        async fn verify_token(&self, token: &str) -> Result<UserIdentity, AuthError> {
            self.tokens
                .lock()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or(AuthError::InvalidToken)
        }

        async fn set_online(&self, user_id: UserId, online: bool) -> Result<(), AuthError> {
            let mut set = self.online.lock().unwrap();
            if online {
                set.insert(user_id);
            } else {
                set.remove(&user_id);
            }
            Ok(())
        }
    }
}
