//! Operational HTTP surface. Notifications are not accepted over HTTP here;
//! callers use `NotificationService` directly.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    clients::health::HealthChecker,
    models::health::{EngineHealth, HealthStatus},
};

pub fn router(health_checker: Arc<HealthChecker>) -> Router {
    Router::new()
        .route("/health", get(engine_health))
        .layer(TraceLayer::new_for_http())
        .with_state(health_checker)
}

pub async fn run_api_server(server_port: u16, health_checker: HealthChecker) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind health server on {}", addr))?;

    info!(address = %addr, "Health server listening");

    axum::serve(listener, router(Arc::new(health_checker))).await?;
    Ok(())
}

async fn engine_health(
    State(health_checker): State<Arc<HealthChecker>>,
) -> (StatusCode, Json<EngineHealth>) {
    let health = health_checker.check().await;

    // Degraded still serves traffic for the covered channels.
    let code = if health.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (code, Json(health))
}
