//! 会话协议状态机。
//!
//! 每个传输层连接对应一个 `Session`，生命周期为
//! 未认证 → 已认证 → 已关闭（终态）。入站事件由连接自己的
//! 接收循环串行驱动；不同连接的会话并行运行。
//!
//! 外部服务（认证、消息存储）的任何失败都降级为发往
//! 来源连接的私有 error 事件，绝不影响其他连接。

use std::sync::Arc;

use config::{ChatConfig, RateLimitConfig};
use tokio::sync::mpsc;
use uuid::Uuid;

use domain::{DomainError, MessageContent, UserIdentity};

use crate::auth::AuthService;
use crate::clock::Clock;
use crate::events::{ClientEvent, Outbound, ServerEvent, TypingUser};
use crate::hub::BroadcastHub;
use crate::presence::PresencePublisher;
use crate::rate_limiter::{RateDecision, SpamGuard};
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::store::MessageStore;

/// 聊天中心聚合根。
///
/// 拥有注册表、广播中枢、在线发布器、限流器和两个外部端口。
/// 不存在任何进程级单例：接受新连接的一方显式持有它。
pub struct ChatHub {
    registry: Arc<ConnectionRegistry>,
    hub: Arc<BroadcastHub>,
    presence: PresencePublisher,
    guard: SpamGuard,
    auth: Arc<dyn AuthService>,
    store: Arc<dyn MessageStore>,
    chat: ChatConfig,
}

impl ChatHub {
    pub fn new(
        rate_limit: RateLimitConfig,
        chat: ChatConfig,
        clock: Arc<dyn Clock>,
        auth: Arc<dyn AuthService>,
        store: Arc<dyn MessageStore>,
    ) -> Arc<Self> {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(BroadcastHub::new(registry.clone()));
        let presence = PresencePublisher::new(registry.clone(), hub.clone());
        let guard = SpamGuard::new(rate_limit, clock);

        Arc::new(Self {
            registry,
            hub,
            presence,
            guard,
            auth,
            store,
            chat,
        })
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn spam_guard(&self) -> &SpamGuard {
        &self.guard
    }
}

/// 会话生命周期状态
#[derive(Debug, Clone)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(UserIdentity),
    Closed,
}

impl SessionState {
    pub fn is_closed(&self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

/// 单个连接的会话。
///
/// 持有自己出站通道的发送端；传输层拿接收端去驱动写任务。
pub struct Session {
    hub: Arc<ChatHub>,
    conn_id: Uuid,
    sender: mpsc::UnboundedSender<Outbound>,
    state: SessionState,
}

impl Session {
    /// 打开一个新会话，返回会话本身和它的出站帧接收端。
    pub fn open(hub: Arc<ChatHub>) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session = Self {
            hub,
            conn_id: Uuid::new_v4(),
            sender,
            state: SessionState::Unauthenticated,
        };
        (session, receiver)
    }

    pub fn conn_id(&self) -> Uuid {
        self.conn_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 处理一条原始入站文本。格式不合法时回以私有错误，状态不变。
    pub async fn handle_text(&mut self, raw: &str) {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(event) => self.handle_event(event).await,
            Err(err) => {
                tracing::debug!(conn_id = %self.conn_id, error = %err, "入站消息格式不合法");
                self.send_private(ServerEvent::error("Invalid message format"));
            }
        }
    }

    pub async fn handle_event(&mut self, event: ClientEvent) {
        if self.state.is_closed() {
            return;
        }
        match event {
            ClientEvent::Authenticate { token } => self.authenticate(&token).await,
            ClientEvent::SendMessage { content } => self.send_message(&content).await,
            ClientEvent::Typing { is_typing } => self.typing(is_typing).await,
        }
    }

    /// 未认证 + authenticate：成功则注册并进入已认证；
    /// 失败回以统一的认证失败错误，连接保持未注册。
    async fn authenticate(&mut self, token: &str) {
        if !matches!(self.state, SessionState::Unauthenticated) {
            tracing::debug!(conn_id = %self.conn_id, "忽略重复的认证请求");
            return;
        }

        let identity = match self.hub.auth.verify_token(token).await {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(conn_id = %self.conn_id, error = %err, "认证失败");
                self.send_private(ServerEvent::error("Authentication failed"));
                return;
            }
        };

        // 同一身份已有连接时驱逐旧连接：告知对端并关闭其传输
        let handle = ConnectionHandle::new(self.conn_id, identity.clone(), self.sender.clone());
        if let Some(prior) = self.hub.registry.register(handle).await {
            prior.send(ServerEvent::error(
                "You signed in from another connection.",
            ));
            prior.request_close();
        }

        // 在线标记写回失败不影响认证结果，在线列表以注册表为准
        if let Err(err) = self.hub.auth.set_online(identity.id, true).await {
            tracing::warn!(user_id = %identity.id, error = %err, "Failed to set online flag");
        }

        self.state = SessionState::Authenticated(identity.clone());
        tracing::info!(user_id = %identity.id, nome = %identity.display_name, "用户认证成功");

        self.send_private(ServerEvent::Authenticated {
            user: identity.clone(),
        });
        self.hub.presence.publish().await;

        match self.hub.store.recent(self.hub.chat.history_limit).await {
            Ok(messages) => self.send_private(ServerEvent::MessageHistory { messages }),
            Err(err) => {
                tracing::error!(user_id = %identity.id, error = %err, "Failed to load message history");
                self.send_private(ServerEvent::error("Failed to load message history"));
            }
        }
    }

    /// 已认证 + sendMessage：校验 → 限流 → 持久化 → 广播。
    async fn send_message(&mut self, content: &str) {
        let Some(identity) = self.identity().cloned() else {
            tracing::debug!(conn_id = %self.conn_id, "忽略未认证连接的消息");
            return;
        };

        let content = match MessageContent::parse(content, self.hub.chat.max_message_chars) {
            Ok(content) => content,
            Err(DomainError::EmptyContent) => {
                self.send_private(ServerEvent::error("Message cannot be empty."));
                return;
            }
            Err(DomainError::ContentTooLong { max }) => {
                self.send_private(ServerEvent::error(format!(
                    "Message too long. Maximum of {} characters.",
                    max
                )));
                return;
            }
        };

        match self.hub.guard.check(identity.id, content.as_str()) {
            RateDecision::Allowed => {}
            RateDecision::Denied {
                reason,
                retry_after_secs,
            } => {
                let event = match retry_after_secs {
                    Some(secs) => ServerEvent::error_with_retry(reason, secs),
                    None => ServerEvent::error(reason),
                };
                self.send_private(event);
                return;
            }
        }

        let message = match self.hub.store.append(identity.id, &content).await {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(user_id = %identity.id, error = %err, "Failed to persist message");
                self.send_private(ServerEvent::error("Failed to send message. Try again."));
                return;
            }
        };

        tracing::info!(
            user_id = %identity.id,
            nome = %identity.display_name,
            message_id = %message.id,
            "消息已广播"
        );
        self.hub.hub.broadcast(ServerEvent::NewMessage { message }).await;
    }

    /// 已认证 + typing：广播给除自己以外的所有连接；
    /// 不持久化、不限流，未认证连接的输入指示被忽略。
    async fn typing(&mut self, is_typing: bool) {
        let Some(identity) = self.identity().cloned() else {
            return;
        };

        self.hub
            .hub
            .send_to_others(
                identity.id,
                ServerEvent::UserTyping {
                    user: TypingUser {
                        nome: identity.display_name.clone(),
                    },
                    is_typing,
                },
            )
            .await;
    }

    /// 关闭会话。幂等：清理至多执行一次，即使关闭被多个信号观测到。
    ///
    /// 带 conn_id 保护的注销保证被驱逐的旧连接迟到的关闭
    /// 不会清理接替者的注册、限流记录或在线标记。
    /// 注销失败但该身份已无任何注册（广播投递失败被提前移除）时，
    /// 剩余清理仍在这里完成。
    pub async fn close(&mut self) {
        let state = std::mem::replace(&mut self.state, SessionState::Closed);
        let identity = match state {
            SessionState::Authenticated(identity) => identity,
            SessionState::Unauthenticated | SessionState::Closed => return,
        };

        let removed = self
            .hub
            .registry
            .deregister(identity.id, self.conn_id)
            .await;
        if !removed && self.hub.registry.get(identity.id).await.is_some() {
            // 本连接已被驱逐且接替者仍在线，清理职责属于接替的连接
            return;
        }

        self.hub.guard.forget(identity.id);
        if let Err(err) = self.hub.auth.set_online(identity.id, false).await {
            tracing::warn!(user_id = %identity.id, error = %err, "Failed to clear online flag");
        }
        self.hub.presence.publish().await;

        tracing::info!(
            user_id = %identity.id,
            nome = %identity.display_name,
            "用户已断开"
        );
    }

    fn identity(&self) -> Option<&UserIdentity> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    fn send_private(&self, event: ServerEvent) {
        // 自己的连接已死时丢弃即可，关闭路径随后会运行
        let _ = self.sender.send(Outbound::Event(event));
    }
}
