//! 실시간 배송 추적을 위한 WebSocket 서버.
//!
//! # 엔드포인트
//!
//! - `/ws/tracking/{order_id}` - 주문의 위치/상태 이벤트 스트림
//!
//! # 메시지 형식
//!
//! ## 클라이언트 → 서버
//!
//! ```text
//! ping
//! {"type": "ping"}
//! ```
//!
//! 그 외 프레임은 무시합니다.
//!
//! ## 서버 → 클라이언트
//!
//! ```json
//! {"type": "pong"}
//! {"type": "location_update", "order_id": "ORD123", "progress": 2.0, ...}
//! {"type": "delivery_complete", "order_id": "ORD123", "message": "..."}
//! ```
//!
//! 완료 이벤트 뒤에는 정상 종료(1000) close 프레임이 전송됩니다.

pub mod handler;
pub mod messages;

pub use handler::{tracking_ws_handler, websocket_router};
pub use messages::{ClientMessage, ServerMessage, WsError};
