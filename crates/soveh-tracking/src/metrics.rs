//! 배송 추적 메트릭.
//!
//! `metrics` 파사드에 기록만 하며, 레코더 설치와 노출은 바이너리 쪽 책임입니다.
//! 레코더가 없으면 모든 호출은 아무 일도 하지 않습니다.

use metrics::{counter, gauge};

/// 활성 추적 세션 수 설정.
pub fn set_active_sessions(count: usize) {
    gauge!("tracking_sessions_active").set(count as f64);
}

/// 전달 성공한 이벤트 수 누적.
pub fn record_events_delivered(count: usize) {
    counter!("tracking_events_delivered_total").increment(count as u64);
}

/// 전달 실패로 정리된 구독자 수 누적.
pub fn record_subscribers_pruned(count: usize) {
    counter!("tracking_subscribers_pruned_total").increment(count as u64);
}
