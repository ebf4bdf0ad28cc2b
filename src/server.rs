use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::config::Config;
use crate::format;
use crate::matrix::MatrixClient;

const LISTEN_ADDR: &str = "0.0.0.0:6969";

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub matrix: MatrixClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let matrix = MatrixClient::new(&config);
        Self { config, matrix }
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    message: String,
}

type RouteReply = (StatusCode, Json<StatusResponse>);

fn reply(code: StatusCode, status: &'static str, message: impl Into<String>) -> RouteReply {
    (
        code,
        Json(StatusResponse {
            status,
            message: message.into(),
        }),
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/debug", post(handle_debug))
        .route("/capture-json", get(capture_json).post(capture_json))
        .route("/webhook/alert", post(handle_alert))
        .with_state(state)
}

/// Bind the listener and serve until the process is killed.
pub async fn run(state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR)
        .await
        .with_context(|| format!("Failed to bind {LISTEN_ADDR}"))?;

    info!("Listening on {LISTEN_ADDR}");

    axum::serve(listener, router(state))
        .await
        .context("HTTP server terminated")?;
    Ok(())
}

/// One delivery attempt, mapped onto the HTTP contract shared by the debug
/// and alert routes.
async fn deliver_and_reply(state: &AppState, text: String, ok_message: &str) -> RouteReply {
    match state.matrix.deliver(&state.config.room_id, &text).await {
        Ok(event_id) => {
            info!("Message delivered as {event_id}");
            reply(StatusCode::OK, "ok", ok_message)
        }
        Err(e) => {
            error!("Delivery failed: {e}");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                "Échec de l'envoi Matrix",
            )
        }
    }
}

/// `POST /debug` — ignores the body and pushes a fixed test message.
async fn handle_debug(State(state): State<Arc<AppState>>) -> RouteReply {
    deliver_and_reply(
        &state,
        format::DEBUG_MESSAGE.to_string(),
        "Message de debug Matrix envoyé",
    )
    .await
}

/// `GET|POST /capture-json` — logs whatever shows up so unknown webhook
/// shapes can be inspected. Never contacts Matrix.
async fn capture_json(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> RouteReply {
    let rendered = match render_body(&headers, &body) {
        Ok(r) => r,
        Err(e) => {
            error!("Webhook capture failed: {e:#}");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "error",
                format!("Échec de la capture: {e:#}"),
            );
        }
    };

    info!("{}", "=".repeat(50));
    info!("Webhook captured");
    info!("URL: {uri}");
    info!("Method: {method}");
    info!("Content:\n{rendered}");
    info!("{}", "=".repeat(50));

    reply(StatusCode::OK, "captured", "Pokemon capturé")
}

fn render_body(headers: &HeaderMap, body: &Bytes) -> anyhow::Result<String> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));

    if is_json {
        let value: Value = serde_json::from_slice(body).context("Invalid JSON body")?;
        serde_json::to_string_pretty(&value).context("Failed to render JSON body")
    } else {
        Ok(std::str::from_utf8(body)
            .context("Body is not valid UTF-8")?
            .to_string())
    }
}

/// `POST /webhook/alert` — Uptime Kuma notification endpoint.
async fn handle_alert(State(state): State<Arc<AppState>>, body: Bytes) -> RouteReply {
    // Parsed by hand so malformed input maps to the 500 JSON contract
    // instead of a framework rejection
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            error!("Rejected alert with unparsable body: {e}");
            return reply(StatusCode::INTERNAL_SERVER_ERROR, "error", e.to_string());
        }
    };

    info!(
        "Webhook received:\n{}",
        serde_json::to_string_pretty(&payload).unwrap_or_default()
    );

    let text = format::format_alert(&payload);
    deliver_and_reply(&state, text, "Notification Matrix envoyée").await
}
