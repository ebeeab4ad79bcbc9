//! 배송 추적 REST API 및 WebSocket 서버.
//!
//! # 모듈 구성
//!
//! - [`config`]: 서버 설정 로드 (파일 + 환경 변수)
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST 엔드포인트와 전체 라우터
//! - [`websocket`]: `/ws/tracking/{order_id}` 스트림
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod websocket;

pub use config::{AppConfig, ServerConfig, WebSocketConfig};
pub use error::{ApiErrorResponse, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::create_router;
pub use state::AppState;
pub use websocket::{tracking_ws_handler, websocket_router, ClientMessage, ServerMessage, WsError};

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;
