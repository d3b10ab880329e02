//! WebSocket 连接接入。
//!
//! 每个连接两个任务：发送任务统一消费会话的出站帧，
//! 接收循环串行地把入站消息交给会话状态机。
//! 任意一侧结束都会走同一条幂等的关闭路径。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use application::{Outbound, Session};

use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (mut session, mut outbound) = Session::open(state.hub.clone());
    tracing::info!(conn_id = %session.conn_id(), "WebSocket 连接已建立");

    // ping 回应也经由发送任务，所有写操作集中在一处
    let (pong_tx, mut pong_rx) = mpsc::channel::<Vec<u8>>(8);

    // 发送任务：出站帧 → 传输层
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(Outbound::Event(event)) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(err) => {
                                tracing::warn!(error = %err, "出站事件序列化失败");
                                continue;
                            }
                        };
                        if ws_sender.send(WsMessage::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    // 驱逐路径：主动关闭对端传输
                    Some(Outbound::Close) => {
                        let _ = ws_sender.send(WsMessage::Close(None)).await;
                        break;
                    }
                    None => break,
                },
                Some(data) = pong_rx.recv() => {
                    if ws_sender.send(WsMessage::Pong(data.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // 接收循环：同一连接的入站消息严格串行处理
    let recv_loop = async {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(WsMessage::Text(text)) => session.handle_text(text.as_str()).await,
                Ok(WsMessage::Ping(data)) => {
                    if pong_tx.send(data.to_vec()).await.is_err() {
                        break;
                    }
                }
                Ok(WsMessage::Close(_)) => break,
                Ok(WsMessage::Binary(_)) | Ok(WsMessage::Pong(_)) => {}
                Err(err) => {
                    tracing::debug!(error = %err, "WebSocket 读取出错");
                    break;
                }
            }
        }
    };

    // 传输断开（读侧结束）或写侧失败，都进入同一清理路径
    tokio::select! {
        _ = &mut send_task => {}
        _ = recv_loop => {}
    }

    session.close().await;
    send_task.abort();
    tracing::info!(conn_id = %session.conn_id(), "WebSocket 连接已清理");
}
