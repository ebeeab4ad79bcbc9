//! 배송 추적 허브.
//!
//! [`DeliveryTracker`]는 레지스트리, 스케줄러, 브로드캐스터를 하나로 묶습니다.
//! 레지스트리 변경과 태스크 시작/취소는 모두 같은 `Mutex` 안에서 일어나므로
//! "세션이 있으면 태스크가 있다"는 관계가 어떤 순서의 구독/해제에서도 유지됩니다.
//!
//! 세션 종료 경로는 세 가지이며 최종 제거는 항상 한 곳에서만 일어납니다:
//! - 마지막 구독자 해제/정리: 엔트리를 제거하고 태스크를 취소
//! - 관리자 강제 종료 또는 셧다운: 엔트리를 제거하고 태스크를 취소
//! - 시뮬레이션 완료: 완료 이벤트의 수신자를 확정하는 잠금 안에서 `finish`로 자기 세대의
//!   엔트리만 제거 (check-and-set)

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn, Instrument};

use crate::broadcast;
use crate::config::TrackingConfig;
use crate::error::TrackingResult;
use crate::events::TrackingEvent;
use crate::metrics;
use crate::registry::{ConnectionRegistry, Removal, SessionSnapshot, Subscriber, SubscriberId};
use crate::scheduler::{SimulationScheduler, TaskContext};
use crate::simulation::DeliverySimulation;
use crate::sink::EventSink;

/// 시뮬레이션 태스크 종료 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// 모든 스텝과 완료 이벤트 전송
    Completed,
    /// 취소 토큰에 의해 중단
    Cancelled,
    /// 스텝 시작 전 세션이 사라짐
    Abandoned,
    /// 태스크 패닉
    Panicked,
}

struct TrackerInner {
    config: Arc<TrackingConfig>,
    registry: Mutex<ConnectionRegistry>,
    scheduler: SimulationScheduler,
    next_subscriber: AtomicU64,
}

/// 주문별 실시간 배송 추적 허브.
///
/// 복제 비용이 낮은 핸들이며 프로세스 시작 시 한 번 만들어 라우터에 전달합니다.
#[derive(Clone)]
pub struct DeliveryTracker {
    inner: Arc<TrackerInner>,
}

impl DeliveryTracker {
    /// 새 트래커 생성.
    ///
    /// # Errors
    /// 설정 검증에 실패하면 `TrackingError::InvalidConfig`.
    pub fn new(config: TrackingConfig) -> TrackingResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(TrackerInner {
                config: Arc::new(config),
                registry: Mutex::new(ConnectionRegistry::new()),
                scheduler: SimulationScheduler::new(),
                next_subscriber: AtomicU64::new(1),
            }),
        })
    }

    /// 추적 설정.
    pub fn config(&self) -> &TrackingConfig {
        &self.inner.config
    }

    /// 구독 채널 등록.
    ///
    /// 주문의 첫 구독자라면 같은 임계 구역 안에서 시뮬레이션 태스크를 시작합니다.
    /// 이미 세션이 진행 중이면 새 구독자는 진행 중인 시퀀스를 이어서 받습니다.
    pub async fn subscribe<S>(&self, order_id: &str, sink: S) -> SubscriberId
    where
        S: EventSink + 'static,
    {
        let id = SubscriberId(self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber {
            id,
            sink: Arc::new(sink),
        };

        let mut registry = self.inner.registry.lock().await;
        let started = registry.subscribe(order_id, subscriber, || {
            let tracker = self.clone();
            self.inner.scheduler.start(order_id, move |ctx| {
                let span = crate::tracking_span!("delivery_simulation", ctx.order_id, ctx.generation);
                tracker.run_session(ctx).instrument(span)
            })
        });
        let subscribers = registry.subscriber_count(order_id);
        metrics::set_active_sessions(registry.len());
        drop(registry);

        if started {
            info!(order_id, subscriber = %id, "tracking session started");
        } else {
            debug!(order_id, subscriber = %id, subscribers, "subscriber joined session");
        }
        id
    }

    /// 구독 채널 해제.
    ///
    /// 등록되지 않은 채널이면 아무 일도 하지 않고 `false`를 반환합니다.
    /// 마지막 구독자가 떠나면 세션을 닫고 태스크를 취소합니다.
    pub async fn unsubscribe(&self, order_id: &str, id: SubscriberId) -> bool {
        let mut registry = self.inner.registry.lock().await;
        match registry.unsubscribe(order_id, id) {
            Removal::NotFound => {
                debug!(order_id, subscriber = %id, "unsubscribe of unknown channel ignored");
                false
            }
            Removal::Remaining(subscribers) => {
                debug!(order_id, subscriber = %id, subscribers, "subscriber left");
                true
            }
            Removal::Emptied(slot) => {
                self.inner.scheduler.stop(&slot);
                metrics::set_active_sessions(registry.len());
                info!(
                    order_id,
                    subscriber = %id,
                    generation = slot.generation(),
                    "last subscriber left, tracking session closed"
                );
                true
            }
        }
    }

    /// 주문의 모든 구독자에게 이벤트를 전달합니다.
    ///
    /// 전달 성공 수를 반환합니다. 구독자가 없으면 0. 실패한 채널은 전달이
    /// 모두 끝난 뒤 레지스트리에서 제거됩니다.
    pub async fn broadcast(&self, order_id: &str, event: &TrackingEvent) -> usize {
        self.dispatch(order_id, None, None, event)
            .await
            .unwrap_or(0)
    }

    /// 시뮬레이션이 진행 중인지 (= 구독자가 있는지) 확인.
    pub async fn is_tracking(&self, order_id: &str) -> bool {
        self.inner.registry.lock().await.contains(order_id)
    }

    /// 주문의 구독자 수.
    pub async fn subscriber_count(&self, order_id: &str) -> usize {
        self.inner.registry.lock().await.subscriber_count(order_id)
    }

    /// 활성 세션 수.
    pub async fn active_sessions(&self) -> usize {
        self.inner.registry.lock().await.len()
    }

    /// 아직 종료되지 않은 시뮬레이션 태스크 수.
    pub fn running_tasks(&self) -> usize {
        self.inner.scheduler.running()
    }

    /// 셧다운이 시작되었는지 확인.
    pub fn is_shutting_down(&self) -> bool {
        self.inner.scheduler.is_shutting_down()
    }

    /// 세션 스냅샷.
    pub async fn session(&self, order_id: &str) -> Option<SessionSnapshot> {
        self.inner
            .registry
            .lock()
            .await
            .snapshot(order_id, self.inner.config.steps)
    }

    /// 모든 세션 스냅샷.
    pub async fn sessions(&self) -> Vec<SessionSnapshot> {
        self.inner
            .registry
            .lock()
            .await
            .snapshots(self.inner.config.steps)
    }

    /// 세션 강제 종료. 태스크를 취소하고 모든 구독 채널을 해제합니다.
    pub async fn close_session(&self, order_id: &str) -> bool {
        let mut registry = self.inner.registry.lock().await;
        let Some(session) = registry.close(order_id) else {
            return false;
        };
        self.inner.scheduler.stop(session.task());
        metrics::set_active_sessions(registry.len());
        drop(registry);

        info!(
            order_id,
            generation = session.generation(),
            "tracking session closed by request"
        );
        true
    }

    /// 모든 세션을 닫고 태스크가 끝날 때까지 기다립니다.
    pub async fn shutdown(&self) {
        let sessions = self.inner.registry.lock().await.drain();
        for session in &sessions {
            self.inner.scheduler.stop(session.task());
        }
        let closed = sessions.len();
        drop(sessions);
        metrics::set_active_sessions(0);

        self.inner.scheduler.shutdown().await;
        info!(closed, "delivery tracker shut down");
    }

    /// 스냅샷 전달 후 실패 채널 정리.
    ///
    /// `generation`이 주어지면 그 세대의 세션일 때만 전달하며, 아니면 `None`.
    async fn dispatch(
        &self,
        order_id: &str,
        generation: Option<u64>,
        step: Option<u32>,
        event: &TrackingEvent,
    ) -> Option<usize> {
        let subscribers = self
            .inner
            .registry
            .lock()
            .await
            .subscribers(order_id, generation)?;

        let report = broadcast::fan_out(&subscribers, event).await;
        drop(subscribers);
        metrics::record_events_delivered(report.delivered);

        let mut registry = self.inner.registry.lock().await;
        if let (Some(generation), Some(step)) = (generation, step) {
            registry.record_step(order_id, generation, step);
        }
        if report.failed.is_empty() {
            return Some(report.delivered);
        }

        let (pruned, emptied) = registry.prune(order_id, &report.failed_ids());
        if let Some(slot) = &emptied {
            self.inner.scheduler.stop(slot);
            metrics::set_active_sessions(registry.len());
        }
        drop(registry);

        if pruned > 0 {
            metrics::record_subscribers_pruned(pruned);
            warn!(
                order_id,
                pruned,
                lagged = report.lagged(),
                "removed subscribers that failed to receive"
            );
        }
        if emptied.is_some() {
            info!(order_id, "no subscribers left after pruning, tracking session closed");
        }
        Some(report.delivered)
    }

    async fn run_session(self, ctx: TaskContext) {
        let end = match AssertUnwindSafe(self.simulate(&ctx)).catch_unwind().await {
            Ok(end) => end,
            Err(panic) => {
                error!(panic = %panic_message(panic.as_ref()), "simulation task panicked");
                SessionEnd::Panicked
            }
        };
        self.finish(&ctx, end).await;
    }

    async fn simulate(&self, ctx: &TaskContext) -> SessionEnd {
        let mut simulation =
            DeliverySimulation::new(ctx.order_id.as_str(), Arc::clone(&self.inner.config));
        let total = simulation.total_steps();
        let interval = self.inner.config.step_interval();

        for step in 0..=total {
            if ctx.cancel.is_cancelled() {
                return SessionEnd::Cancelled;
            }

            let event = TrackingEvent::LocationUpdate(simulation.location_at(step));
            let Some(delivered) = self
                .dispatch(&ctx.order_id, Some(ctx.generation), Some(step), &event)
                .await
            else {
                return SessionEnd::Abandoned;
            };
            debug!(step, delivered, "location update broadcast");

            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return SessionEnd::Cancelled,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        if ctx.cancel.is_cancelled() {
            return SessionEnd::Cancelled;
        }
        self.complete(ctx, &simulation).await
    }

    /// 완료 이벤트 전송.
    ///
    /// 세션은 완료 이벤트의 수신자를 확정하는 잠금 안에서 제거됩니다.
    /// 이후 들어오는 구독은 종료된 세대에 합류하지 않고 스텝 0부터 새로 시작합니다.
    async fn complete(&self, ctx: &TaskContext, simulation: &DeliverySimulation) -> SessionEnd {
        let mut registry = self.inner.registry.lock().await;
        let Some(session) = registry.finish(&ctx.order_id, ctx.generation) else {
            return SessionEnd::Abandoned;
        };
        metrics::set_active_sessions(registry.len());
        drop(registry);

        let event = TrackingEvent::DeliveryComplete(simulation.completion());
        let report = broadcast::fan_out(session.subscribers(), &event).await;
        metrics::record_events_delivered(report.delivered);
        info!(
            delivered = report.delivered,
            failed = report.failed.len(),
            "delivery complete, tracking session closed"
        );
        SessionEnd::Completed
    }

    /// 태스크 종료 처리. 자기 세대의 세션이 남아 있을 때만 제거합니다.
    async fn finish(&self, ctx: &TaskContext, end: SessionEnd) {
        let mut registry = self.inner.registry.lock().await;
        let finished = registry.finish(&ctx.order_id, ctx.generation);
        if finished.is_some() {
            metrics::set_active_sessions(registry.len());
        }
        drop(registry);

        match finished {
            Some(session) => {
                drop(session);
                info!(outcome = ?end, "tracking session finished");
            }
            None => debug!(outcome = ?end, "simulation task exited"),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
