use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;

use crate::relay::{Relay, RelayError};

/// Shared state for the webhook routes.
#[derive(Clone)]
struct AppState {
    relay: Arc<Relay>,
    webhook_secret: Arc<str>,
}

/// Builds the webhook router.
///
/// Telegram and Vercel both retry aggressively on non-2xx answers, so a
/// failure while processing an already-parsed event is acknowledged with
/// 200 anyway; only unusable bodies are rejected.
pub fn router(relay: Arc<Relay>, webhook_secret: &str) -> Router {
    let state = AppState { relay, webhook_secret: Arc::from(webhook_secret) };

    Router::new()
        .route("/health", get(health))
        .route("/webhook/vercel", post(vercel_webhook))
        .route("/webhook/{secret}", post(telegram_webhook))
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn telegram_webhook(
    State(state): State<AppState>,
    Path(secret): Path<String>,
    Json(payload): Json<Value>,
) -> (StatusCode, &'static str) {
    if secret != *state.webhook_secret {
        return (StatusCode::NOT_FOUND, "not found");
    }

    // The relay entry points block; keep them off the server workers.
    let relay = Arc::clone(&state.relay);
    let result = tokio::task::spawn_blocking(move || relay.handle_telegram_update(payload)).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, "OK"),
        Ok(Err(e @ RelayError::MalformedUpdate(_))) => {
            tracing::warn!("rejected Telegram update: {e}");
            (StatusCode::BAD_REQUEST, "bad update")
        }
        Ok(Err(e)) => {
            tracing::error!("failed to process Telegram update: {e}");
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            tracing::error!("webhook worker task failed: {e}");
            (StatusCode::OK, "OK")
        }
    }
}

async fn vercel_webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> (StatusCode, &'static str) {
    let relay = Arc::clone(&state.relay);
    let result = tokio::task::spawn_blocking(move || relay.handle_deployment_event(payload)).await;

    match result {
        Ok(Ok(())) => (StatusCode::OK, "OK"),
        Ok(Err(e @ RelayError::MalformedPayload(_))) => {
            tracing::warn!("rejected deployment payload: {e}");
            (StatusCode::BAD_REQUEST, "bad payload")
        }
        Ok(Err(e)) => {
            tracing::error!("failed to process deployment event: {e}");
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            tracing::error!("webhook worker task failed: {e}");
            (StatusCode::OK, "OK")
        }
    }
}
