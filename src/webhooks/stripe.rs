use axum::{body::Bytes, extract::State, http::HeaderMap, Json};

use crate::db::AppState;
use crate::gateways::{GatewayEvent, StripeEvent};
use crate::reconcile;

use super::{WebhookError, WebhookReply};

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReply>, WebhookError> {
    let signature = headers
        .get("Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| WebhookError::Malformed("missing Signature header".to_string()))?;

    match state.verifiers.stripe.verify(&body, signature) {
        Ok(true) => {}
        Ok(false) => return Err(WebhookError::Forged),
        Err(e) => {
            tracing::debug!("Unusable Stripe signature header: {}", e);
            return Err(WebhookError::Malformed(
                "unparseable signature header".to_string(),
            ));
        }
    }

    let event: StripeEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Unparseable Stripe payload: {}", e);
        WebhookError::Malformed("invalid JSON payload".to_string())
    })?;

    let reply = reconcile::process_event(&state, GatewayEvent::Stripe(event)).await?;
    Ok(Json(reply))
}
