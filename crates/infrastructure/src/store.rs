//! PostgreSQL 消息存储适配。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use application::{MessageStore, StoreError};
use domain::{ChatMessage, MessageAuthor, MessageContent, MessageId, UserId};

/// 数据库消息行，附带作者展示名
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    content: String,
    author_id: i64,
    created_at: DateTime<Utc>,
    nome: String,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: MessageId::new(row.id),
            content: row.content,
            author_id: UserId::new(row.author_id),
            created_at: row.created_at,
            author: MessageAuthor {
                id: UserId::new(row.author_id),
                display_name: row.nome,
            },
        }
    }
}

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(
        &self,
        author: UserId,
        content: &MessageContent,
    ) -> Result<ChatMessage, StoreError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            WITH inserted AS (
                INSERT INTO messages (content, author_id)
                VALUES ($1, $2)
                RETURNING id, content, author_id, created_at
            )
            SELECT i.id, i.content, i.author_id, i.created_at, u.nome
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(content.as_str())
        .bind(i64::from(author))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| StoreError::unavailable(err.to_string()))?;

        Ok(row.into())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, StoreError> {
        let mut rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, m.content, m.author_id, m.created_at, u.nome
            FROM messages m
            JOIN users u ON u.id = m.author_id
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::unavailable(err.to_string()))?;

        // 查询按时间倒序取最近 limit 条，反转为升序交付
        rows.reverse();
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }
}
