//! HTTP surface: one POST endpoint per gateway, all behind the rate/access
//! gate. Bodies are taken as raw bytes because every proof scheme signs the
//! exact wire payload.

pub mod paymob;
pub mod paypal;
pub mod stripe;

pub use paymob::handle_paymob_webhook;
pub use paypal::handle_paypal_webhook;
pub use stripe::handle_stripe_webhook;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;
use crate::gate::gate_middleware;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/webhooks/paymob", post(handle_paymob_webhook))
        .route("/webhooks/paypal", post(handle_paypal_webhook))
        .route("/webhooks/stripe", post(handle_stripe_webhook))
        .route_layer(middleware::from_fn_with_state(state, gate_middleware))
}

/// Response body returned to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookReply {
    pub success: bool,
    pub message: String,
    #[serde(rename = "paymentId", skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<i64>,
}

impl WebhookReply {
    pub fn processed(payment_id: i64) -> Self {
        Self {
            success: true,
            message: "payment processed".to_string(),
            payment_id: Some(payment_id),
        }
    }

    /// Idempotent replay: still a success so the gateway stops redelivering.
    pub fn already_processed(payment_id: i64) -> Self {
        Self {
            success: true,
            message: "already processed".to_string(),
            payment_id: Some(payment_id),
        }
    }

    pub fn ignored() -> Self {
        Self {
            success: true,
            message: "event ignored".to_string(),
            payment_id: None,
        }
    }

    pub fn rejected(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            payment_id: None,
        }
    }
}

/// Webhook failure taxonomy. Everything here happens before (or instead of)
/// the commit, so rejecting carries no state change. `Internal` signals the
/// gateway to redeliver; the 400-class variants do not.
#[derive(Debug, PartialEq, Eq)]
pub enum WebhookError {
    /// The proof did not check out; payload is untrusted.
    Forged,
    /// Correlation key did not match a local record.
    NotFound(&'static str),
    /// Payload or proof we could not make sense of.
    Malformed(String),
    /// Storage or other unexpected failure; event treated as unprocessed.
    Internal,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookError::Forged => (StatusCode::BAD_REQUEST, "invalid signature".to_string()),
            WebhookError::NotFound(what) => (StatusCode::BAD_REQUEST, (*what).to_string()),
            WebhookError::Malformed(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            WebhookError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            ),
        };
        (status, Json(WebhookReply::rejected(&message))).into_response()
    }
}
