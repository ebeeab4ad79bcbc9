//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/v1/tracking` - 추적 세션 관리
//! - `/ws/tracking/{order_id}` - 배송 추적 스트림
//! - `/metrics` - Prometheus 메트릭

pub mod health;
pub mod tracking;

pub use health::{health_router, ComponentHealth, ComponentStatus, HealthResponse};
pub use tracking::{tracking_router, SessionSnapshotResponse, SessionsListResponse};

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::middleware::metrics_layer;
use crate::state::AppState;
use crate::websocket::websocket_router;

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

/// CORS 레이어.
///
/// origin 목록이 비어 있으면 모든 origin을 허용합니다 (개발 모드).
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();

    let (allow_origin, restricted) = if parsed.is_empty() {
        if !origins.is_empty() {
            warn!("CORS origins are set but none are valid, allowing any");
        } else {
            warn!("CORS origins not set, allowing any origin (development mode)");
        }
        (AllowOrigin::any(), false)
    } else {
        info!("CORS configured with {} allowed origins", parsed.len());
        (AllowOrigin::list(parsed), true)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
///
/// `metrics_handle`이 없으면 `/metrics`를 노출하지 않습니다.
pub fn create_router(
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
    cors_origins: &[String],
) -> Router {
    let api_router = Router::new()
        .nest("/health", health_router())
        .nest("/api/v1/tracking", tracking_router())
        .nest("/ws", websocket_router())
        .with_state(state);

    let mut router = Router::new().merge(api_router);
    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(handle),
        );
    }

    router
        .layer(middleware::from_fn(metrics_layer))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer(cors_origins))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::state::create_test_state;

    #[tokio::test]
    async fn test_router_serves_health() {
        let app = create_router(Arc::new(create_test_state()), None, &[]);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let app = create_router(Arc::new(create_test_state()), None, &[]);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ws/tracking/ORD123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_metrics_route_absent_without_handle() {
        let app = create_router(Arc::new(create_test_state()), None, &[]);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_cors_layer_with_origins() {
        let _ = cors_layer(&["https://admin.example.com".to_string()]);
        let _ = cors_layer(&[]);
    }
}
