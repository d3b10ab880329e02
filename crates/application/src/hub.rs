//! 广播中枢。
//!
//! 把一个事件扇出到所有（或除一个之外的所有）活跃连接。
//! 投递是尽力而为且不阻塞的：慢连接不拖累其他接收方，
//! 投递失败视为对端已死，静默移出注册表，不向发送方上报。

use std::sync::Arc;

use domain::UserId;

use crate::events::ServerEvent;
use crate::registry::{ConnectionHandle, ConnectionRegistry};

pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastHub {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 扇出到所有活跃连接。
    ///
    /// 同一次调用推入的事件在每个接收方的队列中保持相同相对顺序。
    pub async fn broadcast(&self, event: ServerEvent) {
        let handles = self.registry.handles().await;
        self.deliver(handles, event).await;
    }

    /// 发给单个连接。返回是否仍在线并投递成功。
    pub async fn send_to(&self, user_id: UserId, event: ServerEvent) -> bool {
        match self.registry.get(user_id).await {
            Some(handle) => {
                if handle.send(event) {
                    true
                } else {
                    self.reap(handle).await;
                    false
                }
            }
            None => false,
        }
    }

    /// 扇出到除 `excluded` 之外的所有连接（输入指示用）。
    pub async fn send_to_others(&self, excluded: UserId, event: ServerEvent) {
        let handles = self
            .registry
            .handles()
            .await
            .into_iter()
            .filter(|handle| handle.user_id() != excluded)
            .collect();
        self.deliver(handles, event).await;
    }

    async fn deliver(&self, handles: Vec<ConnectionHandle>, event: ServerEvent) {
        for handle in handles {
            if !handle.send(event.clone()) {
                self.reap(handle).await;
            }
        }
    }

    /// 投递失败的连接按隐式断开处理：移出注册表并记录。
    /// 其余清理（在线标记、限流记录、在线列表重播）由该连接
    /// 自己的关闭路径完成，注销在这里只是提前生效。
    async fn reap(&self, handle: ConnectionHandle) {
        tracing::warn!(
            user_id = %handle.user_id(),
            conn_id = %handle.conn_id,
            "投递失败，连接按断开处理"
        );
        self.registry
            .deregister(handle.user_id(), handle.conn_id)
            .await;
    }
}
