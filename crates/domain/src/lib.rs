//! 聊天中心核心领域模型
//!
//! 包含用户身份、消息等核心实体，以及相关的校验规则。
//! 该层不做任何 I/O，也不依赖异步运行时。

pub mod errors;
pub mod identity;
pub mod message;

// 重新导出常用类型
pub use errors::{DomainError, DomainResult};
pub use identity::{UserId, UserIdentity};
pub use message::{ChatMessage, MessageAuthor, MessageContent, MessageId, Timestamp};
