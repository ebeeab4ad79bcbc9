//! 배송 추적 이벤트 타입.
//!
//! 구독 채널로 전송되는 서버 → 클라이언트 메시지를 정의합니다.
//!
//! ```json
//! {"type": "location_update", "order_id": "ORD123", "progress": 2.0, "status": "picked_up", ...}
//! {"type": "delivery_complete", "order_id": "ORD123", "message": "Order delivered successfully!", ...}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DriverProfile, GeoPoint};
use crate::error::TrackingResult;

/// 배송 완료 메시지.
pub const DELIVERY_COMPLETE_MESSAGE: &str = "Order delivered successfully!";

/// 배송 진행 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// 창고에서 픽업됨 (진행률 10% 미만)
    PickedUp,
    /// 배송 중 (10% 이상 90% 미만)
    InTransit,
    /// 도착 임박 (90% 이상)
    Arriving,
}

impl DeliveryStatus {
    /// 스텝 번호로 상태 결정.
    ///
    /// `progress = step / total` 과 10%/90% 경계를 정수 연산으로 비교하므로
    /// 경계 스텝(예: 50 중 5번째 = 정확히 10%)에서 부동소수 오차가 없습니다.
    pub fn for_step(step: u32, total: u32) -> Self {
        let step = u64::from(step);
        let total = u64::from(total);
        if step * 10 < total {
            Self::PickedUp
        } else if step * 10 < total * 9 {
            Self::InTransit
        } else {
            Self::Arriving
        }
    }

    /// 사용자에게 보여줄 상태 문구.
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::PickedUp => "Order picked up from warehouse",
            Self::InTransit => "On the way to you",
            Self::Arriving => "Almost there!",
        }
    }
}

/// 위치 업데이트 이벤트 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    /// 주문 ID
    pub order_id: String,
    /// 이벤트 생성 시각
    pub timestamp: DateTime<Utc>,
    /// 현재 위치 (소수점 6자리 반올림)
    pub location: GeoPoint,
    /// 진행률 0-100 (소수점 1자리 반올림)
    pub progress: f64,
    /// 예상 도착 시간 (분, 최소 1)
    pub eta_minutes: u32,
    /// 진행 상태
    pub status: DeliveryStatus,
    /// 상태 문구
    pub status_text: String,
    /// 배송 기사
    pub driver: DriverProfile,
}

/// 배송 완료 이벤트 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryComplete {
    /// 주문 ID
    pub order_id: String,
    /// 이벤트 생성 시각
    pub timestamp: DateTime<Utc>,
    /// 완료 메시지
    pub message: String,
}

/// 구독자에게 전송되는 추적 이벤트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    /// 위치 업데이트
    LocationUpdate(LocationUpdate),
    /// 배송 완료 (세션의 마지막 이벤트)
    DeliveryComplete(DeliveryComplete),
}

impl TrackingEvent {
    /// 이벤트가 속한 주문 ID.
    pub fn order_id(&self) -> &str {
        match self {
            Self::LocationUpdate(update) => &update.order_id,
            Self::DeliveryComplete(complete) => &complete.order_id,
        }
    }

    /// 세션을 끝내는 이벤트인지 확인.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DeliveryComplete(_))
    }

    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> TrackingResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
