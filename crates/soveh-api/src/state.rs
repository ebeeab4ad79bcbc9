//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 Axum의 State extractor를 통해 핸들러에 주입됩니다.

use chrono::{DateTime, Utc};
use soveh_tracking::DeliveryTracker;

use crate::config::WebSocketConfig;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 배송 추적 허브 - 구독 등록/해제, 세션 조회
    pub tracker: DeliveryTracker,

    /// WebSocket 연결 설정
    pub websocket: WebSocketConfig,

    /// API 버전
    pub version: String,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// 새 상태 생성.
    pub fn new(tracker: DeliveryTracker, websocket: WebSocketConfig) -> Self {
        Self {
            tracker,
            websocket,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 상태 (노이즈 없는 기본 시뮬레이션).
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use soveh_tracking::TrackingConfig;

    let tracker = DeliveryTracker::new(TrackingConfig::default().with_jitter(0.0))
        .expect("default tracking config is valid");
    AppState::new(tracker, WebSocketConfig::default())
}
