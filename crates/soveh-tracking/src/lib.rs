//! # Soveh Tracking
//!
//! 실시간 배송 추적 허브를 제공합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 주문별 구독 채널 레지스트리 ([`registry`])
//! - 주문별 배송 시뮬레이션 태스크 스케줄러 ([`scheduler`])
//! - 위치/상태 이벤트를 생성하는 모션 시뮬레이션 ([`simulation`])
//! - 구독자 전체에 이벤트를 전달하는 브로드캐스터 ([`broadcast`])
//! - 위 구성 요소를 묶는 [`DeliveryTracker`]
//! - 설정, 에러, 로깅 인프라
//!
//! # 동작 흐름
//!
//! 구독자가 연결되면 레지스트리에 등록되고, 해당 주문의 첫 구독자라면
//! 시뮬레이션 태스크가 시작됩니다. 태스크는 매 스텝마다 이벤트를 계산해
//! 브로드캐스트하고, 마지막 구독자가 떠나면 취소됩니다.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod scheduler;
pub mod simulation;
pub mod sink;
pub mod tracker;

pub use config::{DriverProfile, GeoPoint, TrackingConfig};
pub use error::{DeliveryError, TrackingError, TrackingResult};
pub use events::{DeliveryComplete, DeliveryStatus, LocationUpdate, TrackingEvent};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use registry::{SessionSnapshot, SubscriberId};
pub use simulation::DeliverySimulation;
pub use sink::EventSink;
pub use tracker::DeliveryTracker;
