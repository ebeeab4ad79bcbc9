//! 배송 추적 WebSocket handler.
//!
//! 연결마다 제한 버퍼 mpsc 채널을 만들어 트래커에 구독자로 등록하고,
//! 소켓 수신과 이벤트 송신을 하나의 `select!` 루프에서 처리합니다.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use soveh_tracking::TrackingEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{ClientMessage, ServerMessage};
use crate::metrics::{decrement_websocket_connections, increment_websocket_connections};
use crate::state::AppState;

/// 클라이언트 프레임 처리 결과.
#[derive(Debug, PartialEq, Eq)]
enum FrameAction {
    /// 응답 전송
    Reply(ServerMessage),
    /// 무시
    Ignore,
    /// 연결 종료
    Close,
}

/// 연결 종료 사유.
#[derive(Debug, Clone, Copy)]
enum Disconnect {
    ClientClosed,
    ReceiveError,
    SendFailed,
    SessionEnded,
}

/// WebSocket 업그레이드 핸들러.
///
/// # 엔드포인트
///
/// `GET /ws/tracking/{order_id}`
///
/// `order_id`는 검증하지 않는 불투명 문자열입니다.
pub async fn tracking_ws_handler(
    ws: WebSocketUpgrade,
    Path(order_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, order_id, state))
}

/// WebSocket 연결 처리.
async fn handle_socket(socket: WebSocket, order_id: String, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    increment_websocket_connections();

    let (tx, mut events) = mpsc::channel::<TrackingEvent>(state.websocket.channel_capacity.max(1));
    let subscriber = state.tracker.subscribe(&order_id, tx).await;
    info!(%order_id, %connection_id, %subscriber, "Tracking WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    let reason = loop {
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(msg)) => match handle_client_frame(&order_id, msg) {
                    FrameAction::Reply(reply) => {
                        if send_control(&mut sender, &reply).await.is_err() {
                            break Disconnect::SendFailed;
                        }
                    }
                    FrameAction::Ignore => {}
                    FrameAction::Close => break Disconnect::ClientClosed,
                },
                Some(Err(e)) => {
                    warn!(%order_id, %connection_id, error = %e, "WebSocket receive error");
                    break Disconnect::ReceiveError;
                }
                None => break Disconnect::ClientClosed,
            },
            event = events.recv() => match event {
                Some(event) => match event.to_json() {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break Disconnect::SendFailed;
                        }
                    }
                    Err(e) => warn!(%order_id, error = %e, "Failed to serialize tracking event"),
                },
                None => {
                    // 세션이 끝나 트래커가 채널을 놓음
                    let close = CloseFrame {
                        code: close_code::NORMAL,
                        reason: Utf8Bytes::from_static("tracking session ended"),
                    };
                    let _ = sender.send(Message::Close(Some(close))).await;
                    break Disconnect::SessionEnded;
                }
            },
        }
    };

    state.tracker.unsubscribe(&order_id, subscriber).await;
    decrement_websocket_connections();

    info!(%order_id, %connection_id, reason = ?reason, "Tracking WebSocket disconnected");
}

/// 클라이언트 프레임 처리.
fn handle_client_frame(order_id: &str, msg: Message) -> FrameAction {
    match msg {
        Message::Text(text) => match ClientMessage::parse(text.as_str()) {
            Ok(ClientMessage::Ping) => FrameAction::Reply(ServerMessage::Pong),
            Err(e) => {
                debug!(order_id, error = %e, "Ignoring unrecognized client message");
                FrameAction::Ignore
            }
        },
        Message::Binary(_) => {
            debug!(order_id, "Ignoring binary frame");
            FrameAction::Ignore
        }
        // 전송 계층 ping/pong은 axum이 처리
        Message::Ping(_) | Message::Pong(_) => FrameAction::Ignore,
        Message::Close(_) => {
            debug!(order_id, "Close message received");
            FrameAction::Close
        }
    }
}

async fn send_control(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match message.to_json() {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(error = %e, "Failed to serialize control message");
            Ok(())
        }
    }
}

/// 추적 WebSocket 라우터.
///
/// `/ws` 아래에 중첩해서 사용합니다.
pub fn websocket_router() -> Router<Arc<AppState>> {
    Router::new().route("/tracking/{order_id}", get(tracking_ws_handler))
}
