use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::db::AppState;
use crate::gateways::{GatewayEvent, PaymobEvent};
use crate::reconcile;

use super::{WebhookError, WebhookReply};

/// Paymob supplies its proof out-of-band as a query parameter.
#[derive(Debug, Deserialize)]
pub struct PaymobQuery {
    pub hmac: Option<String>,
}

pub async fn handle_paymob_webhook(
    State(state): State<AppState>,
    Query(query): Query<PaymobQuery>,
    body: Bytes,
) -> Result<Json<WebhookReply>, WebhookError> {
    let event: PaymobEvent = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Unparseable Paymob payload: {}", e);
        WebhookError::Malformed("invalid JSON payload".to_string())
    })?;

    if !state.verifiers.paymob.verify(&event, query.hmac.as_deref()) {
        return Err(WebhookError::Forged);
    }

    let reply = reconcile::process_event(&state, GatewayEvent::Paymob(event)).await?;
    Ok(Json(reply))
}
