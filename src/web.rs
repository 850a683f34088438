//! Axum-based HTTP server for health, status and diagnostic runs

use crate::controls::Period;
use crate::forecast::ForecastStore;
use crate::scheduler::Scheduler;
use crate::service::{DiagnosticService, TestRequest};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::net::{IpAddr, SocketAddr};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Scheduler,
    pub service: DiagnosticService,
    pub forecast: ForecastStore,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let mut histories = serde_json::Map::new();
    for period in Period::ALL {
        let history = state.forecast.history(period).await;
        histories.insert(
            period.to_string(),
            serde_json::json!({
                "values": history.values(),
                "mean": history.mean(),
            }),
        );
    }

    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "forecast_sensor": state.forecast.sensor(),
        "triggers": state.scheduler.triggers(),
        "retry_delay_seconds": state.scheduler.retry_delay().as_secs(),
        "requirements": {
            "morning": state.scheduler.requirement(Period::Morning),
            "evening": state.scheduler.requirement(Period::Evening),
        },
        "forecast_history": histories,
    }))
}

async fn run_test(
    State(state): State<AppState>,
    Json(body): Json<TestRequest>,
) -> impl IntoResponse {
    let report = state.service.test(body).await;
    (StatusCode::OK, Json(report))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/test", post(run_test))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(state);

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{}",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
