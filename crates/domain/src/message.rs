use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::identity::UserId;

/// 统一的时间戳类型。
pub type Timestamp = DateTime<Utc>;

/// 消息唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// 经过校验的消息正文。
///
/// 两条规则：trim 后非空、不超过 `max_chars` 个字符。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn parse(value: impl Into<String>, max_chars: usize) -> DomainResult<Self> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(DomainError::EmptyContent);
        }
        if value.chars().count() > max_chars {
            return Err(DomainError::ContentTooLong { max: max_chars });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 消息作者的公开信息，随消息一起下发。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub id: UserId,
    #[serde(rename = "nome")]
    pub display_name: String,
}

/// 已持久化的聊天消息。
///
/// 由消息存储在 append 时创建，此后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub content: String,
    pub author_id: UserId,
    pub created_at: Timestamp,
    pub author: MessageAuthor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        let content = MessageContent::parse("  hello  ", 500).unwrap();
        assert_eq!(content.as_str(), "hello");
    }

    #[test]
    fn empty_content_rejected() {
        assert_eq!(
            MessageContent::parse("   ", 500),
            Err(DomainError::EmptyContent)
        );
        assert_eq!(MessageContent::parse("", 500), Err(DomainError::EmptyContent));
    }

    #[test]
    fn over_length_content_rejected() {
        let long = "a".repeat(501);
        assert_eq!(
            MessageContent::parse(long, 500),
            Err(DomainError::ContentTooLong { max: 500 })
        );

        let exact = "a".repeat(500);
        assert!(MessageContent::parse(exact, 500).is_ok());
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 多字节字符按字符数计
        let content = "é".repeat(500);
        assert!(MessageContent::parse(content, 500).is_ok());
    }

    #[test]
    fn chat_message_wire_format() {
        let message = ChatMessage {
            id: MessageId::new(7),
            content: "oi".to_string(),
            author_id: UserId::new(3),
            created_at: Timestamp::from_timestamp_millis(1_700_000_000_000).unwrap(),
            author: MessageAuthor {
                id: UserId::new(3),
                display_name: "Ana".to_string(),
            },
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["content"], "oi");
        assert_eq!(json["authorId"], 3);
        assert_eq!(json["author"]["nome"], "Ana");
        assert!(json.get("createdAt").is_some());
    }
}
