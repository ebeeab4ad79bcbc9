//! 배송 모션 시뮬레이션.
//!
//! 출발지와 도착지 사이를 `N` 스텝으로 선형 보간하여 위치 이벤트를 생성합니다.
//!
//! ```text
//! progress = i / N
//! lat = start_lat + (end_lat - start_lat) * progress + jitter
//! lng = start_lng + (end_lng - start_lng) * progress + jitter
//! ```
//!
//! 노이즈(jitter)는 스텝마다 위도/경도 각각 새로 뽑으며 이전 값에 누적되지 않습니다.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{GeoPoint, TrackingConfig};
use crate::events::{DeliveryComplete, DeliveryStatus, LocationUpdate, DELIVERY_COMPLETE_MESSAGE};

/// 스텝 번호에 해당하는 진행 비율 (0.0 ~ 1.0).
pub fn progress_fraction(step: u32, total: u32) -> f64 {
    f64::from(step.min(total)) / f64::from(total)
}

/// 남은 스텝 수로 ETA(분) 계산. 소수점 이하는 버리며 최소 1분.
pub fn eta_minutes(step: u32, total: u32, minutes_per_step: f64) -> u32 {
    let remaining = total.saturating_sub(step);
    let minutes = (f64::from(remaining) * minutes_per_step).floor();
    // f64 -> u32 캐스트는 포화 변환
    (minutes as u32).max(1)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// 한 주문의 배송 시뮬레이션.
///
/// 스텝 계산만 담당하며 타이밍과 전송은 [`DeliveryTracker`](crate::DeliveryTracker)가 맡습니다.
pub struct DeliverySimulation {
    order_id: String,
    config: Arc<TrackingConfig>,
    rng: StdRng,
}

impl DeliverySimulation {
    /// 새 시뮬레이션 생성.
    pub fn new(order_id: impl Into<String>, config: Arc<TrackingConfig>) -> Self {
        Self {
            order_id: order_id.into(),
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// 고정 시드로 시뮬레이션 생성 (재현 가능한 노이즈).
    pub fn with_seed(order_id: impl Into<String>, config: Arc<TrackingConfig>, seed: u64) -> Self {
        Self {
            order_id: order_id.into(),
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 주문 ID.
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// 전체 스텝 수 (N).
    pub fn total_steps(&self) -> u32 {
        self.config.steps
    }

    /// 노이즈 없는 보간 위치.
    pub fn interpolated(&self, step: u32) -> GeoPoint {
        let progress = progress_fraction(step, self.config.steps);
        let origin = self.config.origin;
        let destination = self.config.destination;
        GeoPoint::new(
            origin.lat + (destination.lat - origin.lat) * progress,
            origin.lng + (destination.lng - origin.lng) * progress,
        )
    }

    fn jitter(&mut self) -> f64 {
        let bound = self.config.jitter_degrees;
        if bound > 0.0 {
            self.rng.gen_range(-bound..=bound)
        } else {
            0.0
        }
    }

    /// `step` 번째 위치 이벤트 계산.
    ///
    /// `step`이 N을 넘으면 N으로 간주합니다.
    pub fn location_at(&mut self, step: u32) -> LocationUpdate {
        let total = self.config.steps;
        let step = step.min(total);
        let base = self.interpolated(step);
        let lat = base.lat + self.jitter();
        let lng = base.lng + self.jitter();
        let status = DeliveryStatus::for_step(step, total);

        LocationUpdate {
            order_id: self.order_id.clone(),
            timestamp: Utc::now(),
            location: GeoPoint::new(round_to(lat, 6), round_to(lng, 6)),
            progress: round_to(progress_fraction(step, total) * 100.0, 1),
            eta_minutes: eta_minutes(step, total, self.config.eta_minutes_per_step),
            status,
            status_text: status.status_text().to_string(),
            driver: self.config.driver.clone(),
        }
    }

    /// 배송 완료 이벤트.
    pub fn completion(&self) -> DeliveryComplete {
        DeliveryComplete {
            order_id: self.order_id.clone(),
            timestamp: Utc::now(),
            message: DELIVERY_COMPLETE_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config(jitter: f64) -> Arc<TrackingConfig> {
        Arc::new(TrackingConfig::default().with_jitter(jitter))
    }

    #[test]
    fn test_first_steps_without_jitter() {
        let mut sim = DeliverySimulation::new("ORD123", config(0.0));

        let first = sim.location_at(0);
        assert_eq!(first.progress, 0.0);
        assert_eq!(first.location, GeoPoint::new(19.076, 72.8777));
        assert_eq!(first.eta_minutes, 25);
        assert_eq!(first.status, DeliveryStatus::PickedUp);

        let second = sim.location_at(1);
        assert_eq!(second.progress, 2.0);
        assert_eq!(second.status, DeliveryStatus::PickedUp);
        assert_eq!(second.eta_minutes, 24); // 49 * 0.5 = 24.5 -> 24
    }

    #[test]
    fn test_last_step_reaches_destination() {
        let mut sim = DeliverySimulation::new("ORD123", config(0.0));
        let last = sim.location_at(50);

        assert_eq!(last.progress, 100.0);
        assert_eq!(last.location, GeoPoint::new(19.1136, 72.8697));
        assert_eq!(last.eta_minutes, 1);
        assert_eq!(last.status, DeliveryStatus::Arriving);
        assert_eq!(last.status_text, "Almost there!");
    }

    #[test]
    fn test_step_past_total_is_clamped() {
        let mut sim = DeliverySimulation::new("ORD123", config(0.0));
        assert_eq!(sim.location_at(80).progress, 100.0);
    }

    #[test]
    fn test_boundary_step_maps_to_in_transit() {
        let mut sim = DeliverySimulation::new("ORD123", config(0.0));
        let update = sim.location_at(5);
        assert_eq!(update.progress, 10.0);
        assert_eq!(update.status, DeliveryStatus::InTransit);
    }

    #[test]
    fn test_eta_scale_is_configurable() {
        assert_eq!(eta_minutes(0, 50, 0.5), 25);
        assert_eq!(eta_minutes(0, 50, 2.0), 100);
        assert_eq!(eta_minutes(49, 50, 0.5), 1);
        assert_eq!(eta_minutes(50, 50, 0.5), 1);
    }

    #[test]
    fn test_eta_truncates_half_minutes() {
        let etas: Vec<u32> = (0..=5).map(|step| eta_minutes(step, 50, 0.5)).collect();
        assert_eq!(etas, vec![25, 24, 24, 23, 23, 22]);
        assert_eq!(eta_minutes(1, 50, 1.5), 73);
        assert_eq!(eta_minutes(47, 50, 0.5), 1);
    }

    #[test]
    fn test_completion_event() {
        let sim = DeliverySimulation::new("ORD9", config(0.0));
        let done = sim.completion();
        assert_eq!(done.order_id, "ORD9");
        assert_eq!(done.message, "Order delivered successfully!");
    }

    proptest! {
        #[test]
        fn prop_status_matches_progress_band(total in 1u32..500, raw_step in 0u32..500) {
            let step = raw_step % (total + 1);
            let progress = f64::from(step) / f64::from(total);
            let expected = if progress < 0.1 {
                DeliveryStatus::PickedUp
            } else if progress < 0.9 {
                DeliveryStatus::InTransit
            } else {
                DeliveryStatus::Arriving
            };
            prop_assert_eq!(DeliveryStatus::for_step(step, total), expected);
        }

        #[test]
        fn prop_eta_is_at_least_one(total in 1u32..1000, step in 0u32..1000, scale in 0.01f64..10.0) {
            prop_assert!(eta_minutes(step, total, scale) >= 1);
        }

        #[test]
        fn prop_jitter_stays_within_bound(seed in any::<u64>(), step in 0u32..=50) {
            let mut sim = DeliverySimulation::with_seed("ORD", config(0.0005), seed);
            let base = sim.interpolated(step);
            let update = sim.location_at(step);
            // 0.0005 노이즈 + 소수점 6자리 반올림 오차
            let tolerance = 0.0005 + 0.000_000_5 + 1e-12;
            prop_assert!((update.location.lat - base.lat).abs() <= tolerance);
            prop_assert!((update.location.lng - base.lng).abs() <= tolerance);
        }
    }
}
