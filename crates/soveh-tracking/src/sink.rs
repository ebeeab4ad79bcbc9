//! 구독 채널 추상화.
//!
//! 트래커는 전송 계층(WebSocket 등)을 알지 못하고 [`EventSink`]를 통해서만
//! 이벤트를 전달합니다. 전달 실패는 해당 채널을 정리하라는 신호입니다.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::DeliveryError;
use crate::events::TrackingEvent;

/// 추적 이벤트를 받는 구독 채널.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// 이벤트 하나를 전달합니다.
    ///
    /// # Errors
    /// 채널이 닫혔거나 더 이상 받을 수 없으면 [`DeliveryError`]를 반환합니다.
    async fn deliver(&self, event: &TrackingEvent) -> Result<(), DeliveryError>;
}

/// 제한 버퍼 채널. 버퍼가 가득 차면 기다리지 않고 실패로 처리합니다.
#[async_trait]
impl EventSink for mpsc::Sender<TrackingEvent> {
    async fn deliver(&self, event: &TrackingEvent) -> Result<(), DeliveryError> {
        self.try_send(event.clone()).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Lagged,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<TrackingEvent> {
    async fn deliver(&self, event: &TrackingEvent) -> Result<(), DeliveryError> {
        self.send(event.clone()).map_err(|_| DeliveryError::Closed)
    }
}
