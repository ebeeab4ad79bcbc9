//! 구독자 팬아웃.
//!
//! 잠금 밖에서 구독자 스냅샷에 동시에 전달하고, 실패한 채널 목록만 돌려줍니다.
//! 레지스트리 정리는 호출자가 전달이 모두 끝난 뒤에 합니다.

use futures::future::join_all;
use tracing::debug;

use crate::error::DeliveryError;
use crate::events::TrackingEvent;
use crate::registry::{Subscriber, SubscriberId};

/// 한 번의 브로드캐스트 결과.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// 전달 성공 수
    pub delivered: usize,
    /// 전달 실패한 채널
    pub failed: Vec<(SubscriberId, DeliveryError)>,
}

impl BroadcastReport {
    /// 실패한 채널 ID 목록.
    pub fn failed_ids(&self) -> Vec<SubscriberId> {
        self.failed.iter().map(|(id, _)| *id).collect()
    }

    /// 버퍼가 가득 차 실패한 채널 수.
    pub fn lagged(&self) -> usize {
        self.failed
            .iter()
            .filter(|(_, e)| *e == DeliveryError::Lagged)
            .count()
    }
}

/// 이벤트를 모든 구독자에게 전달합니다. 채널 간 전달 순서는 보장하지 않습니다.
pub async fn fan_out(subscribers: &[Subscriber], event: &TrackingEvent) -> BroadcastReport {
    let results = join_all(subscribers.iter().map(|subscriber| async move {
        (subscriber.id, subscriber.sink.deliver(event).await)
    }))
    .await;

    let mut report = BroadcastReport::default();
    for (id, result) in results {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!(subscriber = %id, error = %e, "event delivery failed");
                report.failed.push((id, e));
            }
        }
    }
    report
}
