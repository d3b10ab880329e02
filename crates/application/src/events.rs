//! 线上协议事件定义。
//!
//! 客户端与中心之间通过持久双工连接交换 JSON 消息，
//! 全部以 `type` 字段区分。字段名与线上协议保持一致
//! （camelCase，用户展示名为 `nome`）。

use serde::{Deserialize, Serialize};

use domain::{ChatMessage, UserIdentity};

/// 客户端 → 中心
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// 携带令牌认证当前连接
    Authenticate { token: String },
    /// 发送一条公开消息
    SendMessage { content: String },
    /// 输入状态指示
    #[serde(rename_all = "camelCase")]
    Typing { is_typing: bool },
}

/// 中心 → 客户端
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// 私发：认证成功确认
    Authenticated { user: UserIdentity },
    /// 私发：认证成功后的历史消息快照，按时间升序
    MessageHistory { messages: Vec<ChatMessage> },
    /// 广播：新消息
    NewMessage { message: ChatMessage },
    /// 广播：在线用户列表（在线状态变化时）
    OnlineUsers { users: Vec<UserIdentity> },
    /// 广播给其他人：某用户的输入状态
    #[serde(rename_all = "camelCase")]
    UserTyping { user: TypingUser, is_typing: bool },
    /// 私发：错误事件
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        remaining_time: Option<u64>,
    },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            remaining_time: None,
        }
    }

    pub fn error_with_retry(message: impl Into<String>, remaining_time: u64) -> Self {
        Self::Error {
            message: message.into(),
            remaining_time: Some(remaining_time),
        }
    }
}

/// `userTyping` 事件中的用户信息，只暴露展示名。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingUser {
    pub nome: String,
}

/// 发往单个连接发送任务的帧。
///
/// 使用命令模式统一管理所有对传输层 sender 的写操作，
/// `Close` 用于强制驱逐时主动关闭对端传输。
#[derive(Debug, Clone)]
pub enum Outbound {
    Event(ServerEvent),
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{UserId, UserIdentity};

    #[test]
    fn client_events_parse_wire_format() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"authenticate","token":"abc"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Authenticate { token } if token == "abc"));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"sendMessage","content":"oi"}"#).unwrap();
        assert!(matches!(event, ClientEvent::SendMessage { content } if content == "oi"));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"typing","isTyping":true}"#).unwrap();
        assert!(matches!(event, ClientEvent::Typing { is_typing: true }));
    }

    #[test]
    fn unknown_client_event_is_rejected() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"type":"shutdown"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn authenticated_event_wire_format() {
        let event = ServerEvent::Authenticated {
            user: UserIdentity::new(UserId::new(1), "Ana", "ana@example.com"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "authenticated");
        assert_eq!(json["user"]["id"], 1);
        assert_eq!(json["user"]["nome"], "Ana");
        assert_eq!(json["user"]["email"], "ana@example.com");
    }

    #[test]
    fn typing_event_wire_format() {
        let event = ServerEvent::UserTyping {
            user: TypingUser {
                nome: "Ana".to_string(),
            },
            is_typing: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "userTyping");
        assert_eq!(json["user"]["nome"], "Ana");
        assert_eq!(json["isTyping"], true);
    }

    #[test]
    fn error_event_omits_absent_remaining_time() {
        let json = serde_json::to_value(ServerEvent::error("nope")).unwrap();
        assert_eq!(json["type"], "error");
        assert!(json.get("remainingTime").is_none());

        let json = serde_json::to_value(ServerEvent::error_with_retry("blocked", 5)).unwrap();
        assert_eq!(json["remainingTime"], 5);
    }
}
