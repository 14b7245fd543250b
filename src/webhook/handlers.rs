use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use super::services;
use crate::{
    error::{json_body, LedgerError},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub message: &'static str,
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhook/payment", post(payment_webhook))
}

/// Unauthenticated: trust comes from the payload signature alone.
#[instrument(skip(state, payload))]
pub async fn payment_webhook(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookAck>, LedgerError> {
    let Value::Object(fields) = json_body(payload)? else {
        return Err(LedgerError::validation("body", "Invalid webhook data"));
    };

    services::ingest(state.store.as_ref(), &state.config.webhook_secret, &fields).await?;

    Ok(Json(WebhookAck {
        status: "success",
        message: "Payment processed",
    }))
}
