//! Gateway webhook endpoint.
//!
//! Signature verification needs the raw body exactly as sent, so the handler
//! takes the body as a `String` rather than a deserialized extractor.

use crate::state::AppState;
use crate::WebResult;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use hotdesk_core::gateway::GatewayError;
use hotdesk_reconcile::webhook::WebhookError;
use hotdesk_reconcile::WebhookOutcome;
use serde::Serialize;

/// Header the gateway sends its signature in.
pub const SIGNATURE_HEADER: &str = "gateway-signature";

/// Acknowledgment body.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always true on a 2xx
    pub received: bool,
    /// `processed`, `duplicate`, or `ignored`
    pub outcome: &'static str,
}

/// `POST /webhooks/payment`
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> WebResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebhookError::Signature(GatewayError::InvalidSignature))
        .map_err(crate::AppError::from)?;

    let outcome = state.webhooks.process(signature, &body, Utc::now()).await?;

    let outcome = match outcome {
        WebhookOutcome::Processed => "processed",
        WebhookOutcome::AlreadyProcessed => "duplicate",
        WebhookOutcome::Ignored => "ignored",
    };
    Ok(Json(WebhookAck {
        received: true,
        outcome,
    }))
}
