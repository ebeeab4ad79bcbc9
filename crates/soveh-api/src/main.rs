//! 배송 추적 서버 진입점.

use std::sync::Arc;
use std::time::Duration;

use soveh_api::{create_router, setup_metrics_recorder, AppConfig, AppState};
use soveh_tracking::{init_logging, DeliveryTracker};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().map_err(|e| {
        eprintln!("설정 로드 실패: {e}");
        e
    })?;

    init_logging(&config.logging)?;
    info!("Starting Soveh tracking server...");

    let metrics_handle = setup_metrics_recorder();
    info!("Prometheus metrics recorder initialized");

    let addr = config.server.socket_addr().map_err(|e| {
        error!(
            host = %config.server.host,
            port = config.server.port,
            error = %e,
            "소켓 주소 설정이 유효하지 않습니다. SOVEH__SERVER__HOST, SOVEH__SERVER__PORT를 확인하세요."
        );
        e
    })?;

    let tracker = DeliveryTracker::new(config.tracking.clone())?;
    info!(
        steps = config.tracking.steps,
        step_interval_ms = config.tracking.step_interval_ms,
        eta_minutes_per_step = config.tracking.eta_minutes_per_step,
        "Delivery tracker initialized"
    );

    let state = Arc::new(AppState::new(tracker.clone(), config.websocket.clone()));
    let app = create_router(state, Some(metrics_handle), &config.cors_origin_list());

    info!(%addr, "API server listening");
    info!("WebSocket tracking available at ws://{}/ws/tracking/{{order_id}}", addr);
    info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_token = CancellationToken::new();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token.clone(), tracker.clone()))
        .await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    // 시그널 경로를 거치지 않고 종료된 경우를 위해 한 번 더 정리
    if tokio::time::timeout(Duration::from_secs(10), tracker.shutdown())
        .await
        .is_err()
    {
        warn!("Tracker shutdown timeout, forcing exit");
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM을 받으면 모든 추적 세션을 닫아 열린 WebSocket이
/// close 프레임을 받고 끝나도록 한 뒤 반환합니다.
async fn shutdown_signal(shutdown_token: CancellationToken, tracker: DeliveryTracker) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    tracker.shutdown().await;
    info!("Tracking sessions closed");
}
