use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::Config;
use crate::schedule::{Clock, ScheduledTime};
use crate::whatsapp::{GroupSender, OutboundMessage};

pub const SUCCESS_MESSAGE: &str = "Message sent successfully";

/// Shared handler dependencies, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub group_id: String,
    pub clock: Arc<dyn Clock>,
    pub sender: Arc<dyn GroupSender>,
}

impl AppState {
    pub fn new(
        group_id: impl Into<String>,
        clock: Arc<dyn Clock>,
        sender: Arc<dyn GroupSender>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            clock,
            sender,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub message: Option<String>,
}

impl SendRequest {
    /// An absent (or null) message is sent as empty text
    pub fn message_or_default(self) -> String {
        self.message.unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct StatusBody<'a> {
    status: &'a str,
    message: &'a str,
}

/// Result of a send request, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success,
    Failure { description: String },
}

impl SendOutcome {
    /// Collapse any error into a failure carrying its text
    pub fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::Failure {
                description: format!("{:#}", e),
            },
        }
    }
}

impl IntoResponse for SendOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Success => (
                StatusCode::OK,
                Json(StatusBody {
                    status: "success",
                    message: SUCCESS_MESSAGE,
                }),
            )
                .into_response(),
            Self::Failure { description } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusBody {
                    status: "error",
                    message: &description,
                }),
            )
                .into_response(),
        }
    }
}

/// POST /send-whatsapp
///
/// The body is taken raw and parsed here so that malformed or non-JSON
/// payloads are reported like any other failure.
pub async fn send_whatsapp(State(state): State<AppState>, body: Bytes) -> SendOutcome {
    let outcome = SendOutcome::from_result(handle_send(&state, &body).await);

    if let SendOutcome::Failure { description } = &outcome {
        error!("Send to group {} failed: {}", state.group_id, description);
    }

    outcome
}

async fn handle_send(state: &AppState, body: &[u8]) -> Result<()> {
    let request: SendRequest =
        serde_json::from_slice(body).context("Failed to parse request body as JSON")?;

    let now = state.clock.now();
    let outbound = OutboundMessage {
        group_id: state.group_id.clone(),
        message: request.message_or_default(),
        scheduled: ScheduledTime::one_minute_after(&now),
    };

    info!(
        "Sending message to group {} at {:02}:{:02}",
        outbound.group_id, outbound.scheduled.hour, outbound.scheduled.minute
    );

    state.sender.send_to_group(&outbound).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/send-whatsapp", post(send_whatsapp))
        // Any body size reaches the handler
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process stops
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("✓ Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("HTTP server error")?;

    Ok(())
}
