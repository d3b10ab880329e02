//! 应用层实现。
//!
//! 这里是实时聊天中心的核心：连接注册表、广播、在线状态、
//! 限流防刷，以及驱动单个连接生命周期的会话状态机。
//! 对外部协作方（认证服务、消息存储）只依赖抽象接口。

pub mod auth;
pub mod clock;
pub mod events;
pub mod hub;
pub mod presence;
pub mod rate_limiter;
pub mod registry;
pub mod session;
pub mod store;

pub use auth::{AuthError, AuthService};
pub use clock::{Clock, SystemClock};
pub use events::{ClientEvent, Outbound, ServerEvent, TypingUser};
pub use hub::BroadcastHub;
pub use presence::PresencePublisher;
pub use rate_limiter::{RateDecision, SpamGuard};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use session::{ChatHub, Session, SessionState};
pub use store::{MessageStore, StoreError};
