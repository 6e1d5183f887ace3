//! `/api` routes: chat, monitoring status, agent settings and the daily summary.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use zabbot_agent::SituationalContext;
use zabbot_config::{AgentSettings, SettingsUpdate};
use zabbot_core::monitoring::MonitoringClient;

use crate::SharedState;

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/status", get(status_handler))
        .route("/config", get(get_config_handler).post(update_config_handler))
        .route("/summary/daily", get(crate::summary::daily_summary_handler))
}

// ── Types ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Accepted for dashboard compatibility; not used to filter context yet.
    #[serde(default)]
    pub context_filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// Every outcome of the conversation, failures included, is a `200` reply.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatResponse> {
    info!(filter = ?payload.context_filter, "Chat request");

    let config = match state.settings.snapshot() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Agent settings unavailable");
            return Json(ChatResponse {
                reply: format!("AI Configuration Error: {e}"),
            });
        }
    };

    let context = gather_context(state.monitor.as_ref()).await;
    let reply = state
        .agent
        .chat(&payload.message, context.as_ref(), &config)
        .await;

    Json(ChatResponse { reply })
}

/// Collect problem and host counts for the system prompt.
///
/// A monitoring failure is logged and yields whatever was gathered before it.
pub async fn gather_context(monitor: &dyn MonitoringClient) -> Option<SituationalContext> {
    let mut context = SituationalContext::default();

    match monitor.get_problems().await {
        Ok(problems) => context.active_problems = Some(problems.len()),
        Err(e) => {
            error!(error = %e, "Error fetching monitoring context");
            return None;
        }
    }
    match monitor.get_hosts().await {
        Ok(hosts) => context.total_hosts = Some(hosts.len()),
        Err(e) => error!(error = %e, "Error fetching host summary"),
    }

    debug!(?context, "Situational context");
    Some(context)
}

async fn status_handler(State(state): State<SharedState>) -> Json<StatusResponse> {
    match state.monitor.get_hosts().await {
        Ok(hosts) => Json(StatusResponse {
            connected: true,
            host_count: Some(hosts.len()),
            error: None,
        }),
        Err(e) => {
            warn!(error = %e, "Monitoring backend unreachable");
            Json(StatusResponse {
                connected: false,
                host_count: None,
                error: Some(e.to_string()),
            })
        }
    }
}

async fn get_config_handler(
    State(state): State<SharedState>,
) -> Result<Json<AgentSettings>, ApiError> {
    let settings = state.settings.load().map_err(internal_error)?;
    Ok(Json(settings.masked()))
}

async fn update_config_handler(
    State(state): State<SharedState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<UpdateResponse>, ApiError> {
    state.settings.update(update).map_err(|e| {
        error!(error = %e, "Failed to save agent settings");
        internal_error(e)
    })?;
    Ok(Json(UpdateResponse {
        status: "success",
        message: "Configuration updated",
    }))
}
