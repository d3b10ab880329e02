//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 消息正文 trim 后为空
    #[error("message content cannot be empty")]
    EmptyContent,
    /// 消息正文超出字符数上限
    #[error("message content must not exceed {max} characters")]
    ContentTooLong { max: usize },
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
