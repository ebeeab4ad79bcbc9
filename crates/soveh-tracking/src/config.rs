//! 배송 추적 설정.
//!
//! 스텝 간 지연(`step_interval_ms`)과 ETA 환산 계수(`eta_minutes_per_step`)는
//! 서로 독립적인 값입니다. 하나를 바꿔도 다른 하나는 변하지 않습니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TrackingError, TrackingResult};

/// 위경도 좌표.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoPoint {
    /// 위도
    pub lat: f64,
    /// 경도
    pub lng: f64,
}

impl GeoPoint {
    /// 새 좌표 생성.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// 배송 기사 정보.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DriverProfile {
    /// 이름
    pub name: String,
    /// 연락처
    pub phone: String,
    /// 평점
    pub rating: f64,
    /// 차량 정보
    pub vehicle: String,
}

impl Default for DriverProfile {
    fn default() -> Self {
        Self {
            name: "Rajesh Kumar".to_string(),
            phone: "+91 9876543210".to_string(),
            rating: 4.8,
            vehicle: "Bajaj Pulsar 150 - MH 02 AB 1234".to_string(),
        }
    }
}

/// 배송 시뮬레이션 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// 전체 스텝 수 (N). 스텝 0..=N 까지 N+1개의 위치 이벤트가 발생
    pub steps: u32,
    /// 스텝 간 대기 시간 (밀리초)
    pub step_interval_ms: u64,
    /// 남은 스텝 하나당 ETA(분)
    pub eta_minutes_per_step: f64,
    /// 위도/경도 각각에 더해지는 균등 분포 노이즈의 최대 크기 (도)
    pub jitter_degrees: f64,
    /// 출발지 (창고)
    pub origin: GeoPoint,
    /// 도착지
    pub destination: GeoPoint,
    /// 배송 기사
    pub driver: DriverProfile,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            steps: 50,
            step_interval_ms: 2_000,
            eta_minutes_per_step: 0.5,
            jitter_degrees: 0.0005,
            origin: GeoPoint::new(19.0760, 72.8777),
            destination: GeoPoint::new(19.1136, 72.8697),
            driver: DriverProfile::default(),
        }
    }
}

impl TrackingConfig {
    /// 스텝 간 대기 시간.
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    /// 스텝 수를 설정합니다.
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    /// 스텝 간 대기 시간을 설정합니다.
    pub fn with_step_interval(mut self, interval: Duration) -> Self {
        self.step_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// GPS 노이즈 크기를 설정합니다. 0이면 노이즈 없음.
    pub fn with_jitter(mut self, jitter_degrees: f64) -> Self {
        self.jitter_degrees = jitter_degrees;
        self
    }

    /// 설정 값 검증.
    ///
    /// # Errors
    /// 스텝 수가 0이거나, 대기 시간이 0이거나, ETA 계수가 양수가 아니거나,
    /// 노이즈 크기가 음수/비정상 값이면 `TrackingError::InvalidConfig`를 반환합니다.
    pub fn validate(&self) -> TrackingResult<()> {
        if self.steps == 0 {
            return Err(TrackingError::InvalidConfig(
                "steps must be at least 1".to_string(),
            ));
        }
        if self.step_interval_ms == 0 {
            return Err(TrackingError::InvalidConfig(
                "step_interval_ms must be positive".to_string(),
            ));
        }
        if !(self.eta_minutes_per_step.is_finite() && self.eta_minutes_per_step > 0.0) {
            return Err(TrackingError::InvalidConfig(format!(
                "eta_minutes_per_step must be positive, got {}",
                self.eta_minutes_per_step
            )));
        }
        if !(self.jitter_degrees.is_finite() && self.jitter_degrees >= 0.0) {
            return Err(TrackingError::InvalidConfig(format!(
                "jitter_degrees must be a non-negative number, got {}",
                self.jitter_degrees
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TrackingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.steps, 50);
        assert_eq!(config.step_interval(), Duration::from_secs(2));
        assert_eq!(config.eta_minutes_per_step, 0.5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TrackingConfig::default().with_steps(0).validate().is_err());
        assert!(TrackingConfig::default()
            .with_step_interval(Duration::ZERO)
            .validate()
            .is_err());
        assert!(TrackingConfig::default().with_jitter(-0.1).validate().is_err());
        assert!(TrackingConfig::default().with_jitter(f64::NAN).validate().is_err());

        let config = TrackingConfig {
            eta_minutes_per_step: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_and_eta_scale_are_independent() {
        let config = TrackingConfig::default().with_step_interval(Duration::from_millis(10));
        assert_eq!(config.step_interval_ms, 10);
        assert_eq!(config.eta_minutes_per_step, 0.5);
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: TrackingConfig =
            serde_json::from_str(r#"{"steps": 10, "origin": {"lat": 1.0, "lng": 2.0}}"#).unwrap();
        assert_eq!(config.steps, 10);
        assert_eq!(config.origin, GeoPoint::new(1.0, 2.0));
        assert_eq!(config.step_interval_ms, 2_000);
        assert_eq!(config.driver.name, "Rajesh Kumar");
    }
}
