//! 连接注册表。
//!
//! 身份 → 活跃连接 的唯一事实来源，"谁在线"由它定义。
//! 同一身份同一时刻最多持有一个活跃连接，后来者驱逐先到者。

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use domain::{UserId, UserIdentity};

use crate::events::{Outbound, ServerEvent};

/// 单个活跃连接的句柄。
///
/// 持有身份和出站通道的发送端；发送永不阻塞，
/// 失败（接收端已销毁）意味着连接已死。
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    pub identity: UserIdentity,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub fn new(
        conn_id: Uuid,
        identity: UserIdentity,
        sender: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            conn_id,
            identity,
            sender,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.identity.id
    }

    /// 向该连接投递一个事件，返回是否投递成功。
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(Outbound::Event(event)).is_ok()
    }

    /// 要求该连接的传输层关闭（驱逐路径）。
    pub fn request_close(&self) {
        let _ = self.sender.send(Outbound::Close);
    }
}

/// 连接注册表
///
/// register/deregister/快照读取之间通过读写锁保证线性化；
/// 广播在快照上进行，中途被注销的连接只是投递失败被跳过。
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, ConnectionHandle>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// 注册一个已认证连接。
    ///
    /// 若该身份已有连接，旧句柄被原子地替换并返回，
    /// 由调用方负责关闭被驱逐的连接。
    pub async fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut connections = self.connections.write().await;
        let evicted = connections.insert(handle.user_id(), handle);
        if let Some(prior) = &evicted {
            tracing::info!(
                user_id = %prior.user_id(),
                old_conn = %prior.conn_id,
                "已有连接被新连接替换"
            );
        }
        evicted
    }

    /// 注销一个连接。
    ///
    /// 只有注册表中存的恰好是这个 conn_id 时才移除，
    /// 被驱逐连接迟到的关闭信号不会误伤接替者。
    pub async fn deregister(&self, user_id: UserId, conn_id: Uuid) -> bool {
        let mut connections = self.connections.write().await;
        match connections.get(&user_id) {
            Some(handle) if handle.conn_id == conn_id => {
                connections.remove(&user_id);
                tracing::info!(user_id = %user_id, conn_id = %conn_id, "连接已注销");
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, user_id: UserId) -> Option<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections.get(&user_id).cloned()
    }

    pub async fn is_online(&self, user_id: UserId) -> bool {
        let connections = self.connections.read().await;
        connections.contains_key(&user_id)
    }

    /// 当前在线用户的一致性快照，按 id 排序保证稳定输出。
    pub async fn online_users(&self) -> Vec<UserIdentity> {
        let connections = self.connections.read().await;
        let mut users: Vec<UserIdentity> = connections
            .values()
            .map(|handle| handle.identity.clone())
            .collect();
        users.sort_by_key(|user| user.id);
        users
    }

    /// 所有活跃连接句柄的快照，供广播迭代。
    pub async fn handles(&self) -> Vec<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
