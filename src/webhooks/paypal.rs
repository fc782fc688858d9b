use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use crate::db::AppState;
use crate::gateways::{GatewayEvent, PayPalEvent, PayPalProof};
use crate::reconcile;

use super::{WebhookError, WebhookReply};

pub async fn handle_paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReply>, WebhookError> {
    // Missing transmission headers means the delivery cannot be verified at
    // all; same rejection as a bad signature.
    let proof = PayPalProof::from_headers(&headers).ok_or(WebhookError::Forged)?;

    // Keep the raw value for the verification callback; the signature covers
    // the payload exactly as delivered.
    let raw: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Unparseable PayPal payload: {}", e);
        WebhookError::Malformed("invalid JSON payload".to_string())
    })?;

    if !state.verifiers.paypal.verify(&proof, &raw).await {
        return Err(WebhookError::Forged);
    }

    let event: PayPalEvent = serde_json::from_value(raw).map_err(|e| {
        tracing::debug!("PayPal payload missing expected fields: {}", e);
        WebhookError::Malformed("unexpected payload shape".to_string())
    })?;

    let reply = reconcile::process_event(&state, GatewayEvent::PayPal(event)).await?;
    Ok(Json(reply))
}
