//! 주문별 구독 채널 레지스트리.
//!
//! 레지스트리 자체는 잠금을 갖지 않습니다. [`DeliveryTracker`](crate::DeliveryTracker)가
//! 단일 임계 구역 안에서만 변경하므로, 세션 생성과 태스크 시작, 마지막 구독자 제거와
//! 태스크 취소가 항상 한 번에 일어납니다.
//!
//! 불변식: 엔트리가 존재하면 구독자 목록은 비어 있지 않고 태스크 슬롯을 하나 가집니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scheduler::TaskSlot;
use crate::sink::EventSink;

/// 구독 채널 식별자. 채널 자체에는 식별자가 없으므로 등록 시 트래커가 발급합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(pub(crate) u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// 등록된 구독 채널.
#[derive(Clone)]
pub struct Subscriber {
    /// 식별자
    pub id: SubscriberId,
    /// 이벤트 전달 대상
    pub sink: Arc<dyn EventSink>,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}

/// 한 주문의 추적 세션.
#[derive(Debug)]
pub struct Session {
    subscribers: Vec<Subscriber>,
    task: TaskSlot,
    last_step: Option<u32>,
    started_at: DateTime<Utc>,
}

impl Session {
    /// 세션을 구동하는 태스크의 세대 번호.
    pub fn generation(&self) -> u64 {
        self.task.generation()
    }

    /// 등록된 구독자.
    pub fn subscribers(&self) -> &[Subscriber] {
        &self.subscribers
    }

    /// 태스크 슬롯.
    pub fn task(&self) -> &TaskSlot {
        &self.task
    }

    /// 세션을 해체하고 태스크 슬롯을 돌려줍니다. 구독 채널은 여기서 해제됩니다.
    pub fn into_task(self) -> TaskSlot {
        self.task
    }
}

/// 세션 상태 조회용 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// 주문 ID
    pub order_id: String,
    /// 구독자 수
    pub subscribers: usize,
    /// 마지막으로 브로드캐스트한 스텝
    pub last_step: Option<u32>,
    /// 마지막 스텝 기준 진행률 (0-100)
    pub progress: Option<f64>,
    /// 세션 시작 시각
    pub started_at: DateTime<Utc>,
}

/// 구독 해제 결과.
#[derive(Debug)]
pub enum Removal {
    /// 등록되지 않은 채널 (중복/지연된 해제 통지)
    NotFound,
    /// 제거 후에도 구독자가 남아 있음
    Remaining(usize),
    /// 마지막 구독자가 제거되어 세션이 닫힘. 반환된 슬롯의 태스크를 멈춰야 합니다.
    Emptied(TaskSlot),
}

/// 주문 ID → 세션 매핑.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sessions: HashMap<String, Session>,
}

impl ConnectionRegistry {
    /// 빈 레지스트리 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 구독자를 추가합니다.
    ///
    /// 주문의 첫 구독자라면 `start`를 호출해 태스크를 시작하고 세션을 만든 뒤
    /// `true`를 반환합니다. 이미 세션이 있으면 `start`는 호출되지 않습니다.
    pub fn subscribe<F>(&mut self, order_id: &str, subscriber: Subscriber, start: F) -> bool
    where
        F: FnOnce() -> TaskSlot,
    {
        if let Some(session) = self.sessions.get_mut(order_id) {
            session.subscribers.push(subscriber);
            return false;
        }

        self.sessions.insert(
            order_id.to_string(),
            Session {
                subscribers: vec![subscriber],
                task: start(),
                last_step: None,
                started_at: Utc::now(),
            },
        );
        true
    }

    /// 구독자를 제거합니다. 없는 채널이면 아무 일도 하지 않습니다.
    pub fn unsubscribe(&mut self, order_id: &str, id: SubscriberId) -> Removal {
        let Some(session) = self.sessions.get_mut(order_id) else {
            return Removal::NotFound;
        };
        let Some(index) = session.subscribers.iter().position(|s| s.id == id) else {
            return Removal::NotFound;
        };

        session.subscribers.remove(index);
        if !session.subscribers.is_empty() {
            return Removal::Remaining(session.subscribers.len());
        }

        match self.sessions.remove(order_id) {
            Some(session) => Removal::Emptied(session.into_task()),
            None => Removal::NotFound,
        }
    }

    /// 전달에 실패한 구독자들을 한 번에 제거합니다.
    ///
    /// 실제로 제거된 수와, 세션이 비었다면 멈춰야 할 태스크 슬롯을 반환합니다.
    pub fn prune(&mut self, order_id: &str, ids: &[SubscriberId]) -> (usize, Option<TaskSlot>) {
        let mut removed = 0;
        for id in ids {
            match self.unsubscribe(order_id, *id) {
                Removal::NotFound => {}
                Removal::Remaining(_) => removed += 1,
                Removal::Emptied(slot) => return (removed + 1, Some(slot)),
            }
        }
        (removed, None)
    }

    /// 현재 구독자 목록의 복사본.
    ///
    /// `generation`이 주어지면 그 세대의 세션일 때만 반환합니다.
    pub fn subscribers(&self, order_id: &str, generation: Option<u64>) -> Option<Vec<Subscriber>> {
        let session = self.sessions.get(order_id)?;
        if generation.is_some_and(|g| g != session.generation()) {
            return None;
        }
        Some(session.subscribers.clone())
    }

    /// 세션이 현재 해당 세대인지 확인.
    pub fn is_current(&self, order_id: &str, generation: u64) -> bool {
        self.sessions
            .get(order_id)
            .is_some_and(|s| s.generation() == generation)
    }

    /// 마지막 브로드캐스트 스텝 기록.
    pub fn record_step(&mut self, order_id: &str, generation: u64, step: u32) {
        if let Some(session) = self.sessions.get_mut(order_id) {
            if session.generation() == generation {
                session.last_step = Some(step);
            }
        }
    }

    /// 태스크가 스스로 끝났을 때의 check-and-set 제거.
    ///
    /// 세션이 여전히 같은 세대일 때만 제거합니다. 이미 외부에서 닫혔거나
    /// 새 세션으로 바뀌었으면 `None`.
    pub fn finish(&mut self, order_id: &str, generation: u64) -> Option<Session> {
        if !self.is_current(order_id, generation) {
            return None;
        }
        self.sessions.remove(order_id)
    }

    /// 세션을 강제로 제거합니다.
    pub fn close(&mut self, order_id: &str) -> Option<Session> {
        self.sessions.remove(order_id)
    }

    /// 모든 세션을 제거합니다.
    pub fn drain(&mut self) -> Vec<Session> {
        self.sessions.drain().map(|(_, session)| session).collect()
    }

    /// 세션 존재 여부 (= 태스크 실행 중).
    pub fn contains(&self, order_id: &str) -> bool {
        self.sessions.contains_key(order_id)
    }

    /// 주문의 구독자 수.
    pub fn subscriber_count(&self, order_id: &str) -> usize {
        self.sessions
            .get(order_id)
            .map_or(0, |s| s.subscribers.len())
    }

    /// 활성 세션 수.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// 활성 세션이 없는지 확인.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 세션 스냅샷. `total_steps`는 진행률 계산에 사용합니다.
    pub fn snapshot(&self, order_id: &str, total_steps: u32) -> Option<SessionSnapshot> {
        self.sessions
            .get(order_id)
            .map(|session| Self::to_snapshot(order_id, session, total_steps))
    }

    /// 모든 세션 스냅샷 (주문 ID 순).
    pub fn snapshots(&self, total_steps: u32) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self
            .sessions
            .iter()
            .map(|(order_id, session)| Self::to_snapshot(order_id, session, total_steps))
            .collect();
        snapshots.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        snapshots
    }

    fn to_snapshot(order_id: &str, session: &Session, total_steps: u32) -> SessionSnapshot {
        SessionSnapshot {
            order_id: order_id.to_string(),
            subscribers: session.subscribers.len(),
            last_step: session.last_step,
            progress: session.last_step.map(|step| {
                let percent = f64::from(step) / f64::from(total_steps.max(1)) * 100.0;
                (percent * 10.0).round() / 10.0
            }),
            started_at: session.started_at,
        }
    }
}
