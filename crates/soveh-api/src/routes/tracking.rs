//! 추적 세션 관리 endpoint.
//!
//! 관리자/배송 대시보드용 세션 조회와 강제 종료를 제공합니다.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use soveh_tracking::SessionSnapshot;
use tracing::info;

use crate::error::{ApiErrorResponse, ApiResult};
use crate::state::AppState;

/// 세션 목록 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsListResponse {
    /// 활성 세션 (주문 ID 순)
    pub sessions: Vec<SessionSnapshotResponse>,
    /// 세션 수
    pub total: usize,
}

/// 세션 상태 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSnapshotResponse {
    pub order_id: String,
    pub subscribers: usize,
    pub last_step: Option<u32>,
    pub progress: Option<f64>,
    pub started_at: String,
}

impl From<SessionSnapshot> for SessionSnapshotResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        Self {
            order_id: snapshot.order_id,
            subscribers: snapshot.subscribers,
            last_step: snapshot.last_step,
            progress: snapshot.progress,
            started_at: snapshot.started_at.to_rfc3339(),
        }
    }
}

fn session_not_found(order_id: &str) -> (StatusCode, Json<ApiErrorResponse>) {
    ApiErrorResponse::with_details(
        "SESSION_NOT_FOUND",
        format!("추적 세션을 찾을 수 없습니다: {}", order_id),
        serde_json::json!({ "order_id": order_id }),
    )
    .into_error(StatusCode::NOT_FOUND)
}

/// 활성 세션 목록.
///
/// GET /api/v1/tracking/sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<SessionsListResponse> {
    let sessions: Vec<SessionSnapshotResponse> = state
        .tracker
        .sessions()
        .await
        .into_iter()
        .map(Into::into)
        .collect();

    Json(SessionsListResponse {
        total: sessions.len(),
        sessions,
    })
}

/// 세션 조회.
///
/// GET /api/v1/tracking/sessions/{order_id}
pub async fn get_session(
    Path(order_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SessionSnapshotResponse>> {
    state
        .tracker
        .session(&order_id)
        .await
        .map(|snapshot| Json(snapshot.into()))
        .ok_or_else(|| session_not_found(&order_id))
}

/// 세션 강제 종료. 시뮬레이션을 멈추고 연결된 소켓을 닫습니다.
///
/// DELETE /api/v1/tracking/sessions/{order_id}
pub async fn close_session(
    Path(order_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    if state.tracker.close_session(&order_id).await {
        info!(%order_id, "Tracking session closed via admin API");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(&order_id))
    }
}

/// 추적 관리 라우터 생성.
pub fn tracking_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{order_id}", get(get_session).delete(close_session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use soveh_tracking::TrackingEvent;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::state::create_test_state;

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .nest("/api/v1/tracking", tracking_router())
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_list_sessions_empty() {
        let response = app(Arc::new(create_test_state()))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/tracking/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total"], 0);
        assert!(json["sessions"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_close_session() {
        let state = Arc::new(create_test_state());
        let (tx, _rx) = mpsc::unbounded_channel::<TrackingEvent>();
        state.tracker.subscribe("ORD123", tx).await;

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/tracking/sessions/ORD123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["order_id"], "ORD123");
        assert_eq!(json["subscribers"], 1);

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/tracking/sessions/ORD123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(!state.tracker.is_tracking("ORD123").await);

        state.tracker.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let state = Arc::new(create_test_state());

        for method in ["GET", "DELETE"] {
            let response = app(state.clone())
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/api/v1/tracking/sessions/NOPE")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let json = body_json(response).await;
            assert_eq!(json["code"], "SESSION_NOT_FOUND");
            assert_eq!(json["details"]["order_id"], "NOPE");
        }
    }
}
