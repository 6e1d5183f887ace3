//! HTTP API gateway for Zabbot.
//!
//! Exposes health checks, the chat endpoint, monitoring status, the daily
//! summary, and the agent settings API consumed by the dashboard.
//!
//! Built on Axum.

pub mod api;
pub mod summary;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

use zabbot_agent::ConversationLoop;
use zabbot_config::{AppConfig, SettingsStore};
use zabbot_core::monitoring::MonitoringClient;
use zabbot_providers::ProviderRouter;
use zabbot_zabbix::ZabbixClient;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<ConversationLoop>,
    pub settings: SettingsStore,
    pub monitor: Arc<dyn MonitoringClient>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Wire the production collaborators from startup configuration.
    ///
    /// Creates the agent settings file with defaults if it does not exist.
    pub fn from_config(config: &AppConfig) -> Result<Self, BoxError> {
        let monitor: Arc<dyn MonitoringClient> = Arc::new(ZabbixClient::new(&config.zabbix)?);
        let settings = SettingsStore::open(config.settings_path(), &config.agent)?;
        let tools = Arc::new(zabbot_tools::catalog(monitor.clone()));
        let agent = ConversationLoop::new(Arc::new(ProviderRouter::default()), tools)
            .with_round_trip_timeout(Duration::from_secs(config.agent.round_trip_timeout_secs));

        Ok(Self {
            agent: Arc::new(agent),
            settings,
            monitor,
        })
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS open to any origin (the dashboard is served separately)
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api", api::api_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), BoxError> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = Arc::new(GatewayState::from_config(&config)?);
    info!(
        zabbix = %config.zabbix.url,
        settings = %state.settings.path().display(),
        tools = state.agent.tools().len(),
        "Gateway state ready"
    );

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Zabbot API is running",
    })
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubMonitor, harness};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let h = harness(StubMonitor::default());
        let app = build_router(h.state.clone());

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn root_reports_running() {
        let h = harness(StubMonitor::default());
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = build_router(h.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let h = harness(StubMonitor::default());
        let message = "x".repeat(2 * 1024 * 1024);
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::json!({ "message": message }).to_string()))
            .unwrap();
        let response = build_router(h.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
