//! 주문별 시뮬레이션 태스크 스케줄러.
//!
//! 태스크마다 세대 번호와 취소 토큰을 담은 [`TaskSlot`]을 발급합니다.
//! 모든 토큰은 스케줄러 루트 토큰의 자식이므로 [`SimulationScheduler::shutdown`] 한 번으로
//! 전체 태스크가 멈춥니다.
//!
//! "주문당 태스크 하나"는 레지스트리가 보장합니다. 세션이 없을 때만
//! [`SimulationScheduler::start`]가 호출됩니다.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// 실행 중인 시뮬레이션 태스크의 핸들.
#[derive(Debug, Clone)]
pub struct TaskSlot {
    generation: u64,
    cancel: CancellationToken,
}

impl TaskSlot {
    pub(crate) fn new(generation: u64, cancel: CancellationToken) -> Self {
        Self { generation, cancel }
    }

    /// 세대 번호. 같은 주문이라도 태스크가 새로 시작될 때마다 증가합니다.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// 취소 요청 여부.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// 태스크에 전달되는 실행 컨텍스트.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// 주문 ID
    pub order_id: String,
    /// 세대 번호
    pub generation: u64,
    /// 취소 토큰
    pub cancel: CancellationToken,
}

/// 시뮬레이션 태스크 스케줄러.
#[derive(Debug)]
pub struct SimulationScheduler {
    root: CancellationToken,
    tasks: TaskTracker,
    next_generation: AtomicU64,
}

impl Default for SimulationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationScheduler {
    /// 새 스케줄러 생성.
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            tasks: TaskTracker::new(),
            next_generation: AtomicU64::new(1),
        }
    }

    /// 태스크를 시작하고 슬롯을 반환합니다.
    ///
    /// 종료 후 정리는 태스크 본문(`run`이 만든 future)의 책임입니다.
    pub fn start<F, Fut>(&self, order_id: &str, run: F) -> TaskSlot
    where
        F: FnOnce(TaskContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let cancel = self.root.child_token();
        let context = TaskContext {
            order_id: order_id.to_string(),
            generation,
            cancel: cancel.clone(),
        };

        self.tasks.spawn(run(context));
        debug!(order_id, generation, "simulation task started");

        TaskSlot::new(generation, cancel)
    }

    /// 태스크 취소. 이미 끝난 태스크에 대해서도 안전합니다.
    pub fn stop(&self, slot: &TaskSlot) {
        if !slot.cancel.is_cancelled() {
            slot.cancel.cancel();
            debug!(generation = slot.generation, "simulation task cancelled");
        }
    }

    /// 아직 종료되지 않은 태스크 수.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// 종료 진행 중인지 확인.
    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// 모든 태스크를 취소하고 종료될 때까지 기다립니다.
    pub async fn shutdown(&self) {
        self.root.cancel();
        self.tasks.close();
        self.tasks.wait().await;
    }
}
