//! 배송 추적 에러 타입.
//!
//! 채널 단위 전달 실패([`DeliveryError`])는 치명적이지 않으며 해당 채널을
//! 레지스트리에서 제거하는 신호로만 쓰입니다. 그 외 에러는 [`TrackingError`]로 표현합니다.

use thiserror::Error;

/// 개별 구독 채널로의 이벤트 전달 실패.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// 수신 측이 닫힘
    #[error("subscriber channel closed")]
    Closed,

    /// 수신 측 버퍼가 가득 참 (소비가 멈춘 클라이언트)
    #[error("subscriber channel lagging, buffer full")]
    Lagged,
}

/// 배송 추적 에러.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// 잘못된 설정
    #[error("잘못된 추적 설정: {0}")]
    InvalidConfig(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 배송 추적 작업을 위한 Result 타입.
pub type TrackingResult<T> = Result<T, TrackingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrackingError::InvalidConfig("steps must be positive".to_string());
        assert!(err.to_string().contains("steps must be positive"));

        assert_eq!(DeliveryError::Closed.to_string(), "subscriber channel closed");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err: TrackingError = json_err.into();
        assert!(matches!(err, TrackingError::Serialization(_)));
    }
}
