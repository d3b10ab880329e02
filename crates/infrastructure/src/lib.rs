//! 基础设施层。
//!
//! 两个外部协作方的具体适配：JWT + PostgreSQL 的认证服务，
//! 以及 PostgreSQL 的消息存储。

pub mod auth;
pub mod db;
pub mod store;

pub use auth::JwtAuthService;
pub use db::create_pg_pool;
pub use store::PgMessageStore;
