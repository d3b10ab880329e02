//! 消息存储抽象。
//!
//! 中心只需要两种能力：持久化追加一条消息、读取最近的历史。
//! 具体的表结构和查询属于基础设施层。

use async_trait::async_trait;
use thiserror::Error;

use domain::{ChatMessage, MessageContent, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// 追加一条消息并返回含 id、创建时间和作者信息的完整记录。
    async fn append(
        &self,
        author: UserId,
        content: &MessageContent,
    ) -> Result<ChatMessage, StoreError>;

    /// 最近 `limit` 条消息，按创建时间升序，附带作者展示名。
    async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, StoreError>;
}

/// 内存实现的消息存储（用于测试）
pub mod memory {
    use super::*;
    use domain::{MessageAuthor, MessageId};
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub struct MemoryMessageStore {
        inner: Mutex<Inner>,
        /// 置为 true 时所有操作失败，用于模拟存储不可用
        fail: std::sync::atomic::AtomicBool,
    }

    struct Inner {
        messages: Vec<ChatMessage>,
        display_names: HashMap<UserId, String>,
        next_id: i64,
    }

    impl Default for MemoryMessageStore {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MemoryMessageStore {
        pub fn new() -> Self {
            Self {
                inner: Mutex::new(Inner {
                    messages: Vec::new(),
                    display_names: HashMap::new(),
                    next_id: 1,
                }),
                fail: std::sync::atomic::AtomicBool::new(false),
            }
        }

        pub fn set_display_name(&self, user_id: UserId, name: impl Into<String>) {
            self.inner
                .lock()
                .unwrap()
                .display_names
                .insert(user_id, name.into());
        }

        pub fn set_failing(&self, failing: bool) {
            self.fail
                .store(failing, std::sync::atomic::Ordering::SeqCst);
        }

        pub fn message_count(&self) -> usize {
            self.inner.lock().unwrap().messages.len()
        }
    }

    #[async_trait]
    impl MessageStore for MemoryMessageStore {
        async fn append(
            &self,
            author: UserId,
            content: &MessageContent,
        ) -> Result<ChatMessage, StoreError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::unavailable("simulated outage"));
            }

            let mut inner = self.inner.lock().unwrap();
            let display_name = inner
                .display_names
                .get(&author)
                .cloned()
                .unwrap_or_default();
            let message = ChatMessage {
                id: MessageId::new(inner.next_id),
                content: content.as_str().to_owned(),
                author_id: author,
                created_at: chrono::Utc::now(),
                author: MessageAuthor {
                    id: author,
                    display_name,
                },
            };
            inner.next_id += 1;
            inner.messages.push(message.clone());
            Ok(message)
        }

        async fn recent(&self, limit: i64) -> Result<Vec<ChatMessage>, StoreError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StoreError::unavailable("simulated outage"));
            }

            let inner = self.inner.lock().unwrap();
            let skip = inner.messages.len().saturating_sub(limit.max(0) as usize);
            Ok(inner.messages[skip..].to_vec())
        }
    }
}
