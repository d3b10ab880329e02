//! 在线状态发布。
//!
//! 在线列表由连接注册表推导，不单独维护状态。
//! 每次认证成功和每次断开后发布一次，所有连接
//! （包括触发变化的那个）都会收到最新列表。

use std::sync::Arc;

use crate::events::ServerEvent;
use crate::hub::BroadcastHub;
use crate::registry::ConnectionRegistry;

pub struct PresencePublisher {
    registry: Arc<ConnectionRegistry>,
    hub: Arc<BroadcastHub>,
}

impl PresencePublisher {
    pub fn new(registry: Arc<ConnectionRegistry>, hub: Arc<BroadcastHub>) -> Self {
        Self { registry, hub }
    }

    /// 读取注册表当前快照并广播 `onlineUsers` 事件。
    pub async fn publish(&self) {
        let users = self.registry.online_users().await;
        tracing::debug!(online = users.len(), "发布在线用户列表");
        self.hub.broadcast(ServerEvent::OnlineUsers { users }).await;
    }
}
