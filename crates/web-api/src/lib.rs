//! Web API 层。
//!
//! 提供 Axum 路由，把 WebSocket 连接交给应用层的会话状态机。

mod routes;
mod state;
mod ws_connection;

pub use routes::router;
pub use state::AppState;
