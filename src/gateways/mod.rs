//! Gateway-specific payload shapes and authenticity verification.
//!
//! Each gateway posts a differently shaped JSON body with a different proof
//! mechanism. The payloads are a closed tagged variant dispatched by pattern
//! matching; verification is a binary authentic/forged decision that never
//! mutates state.

pub mod paymob;
pub mod paypal;
pub mod stripe;

pub use paymob::{PaymobEvent, PaymobVerifier};
pub use paypal::{PayPalEvent, PayPalProof, PayPalVerifier};
pub use stripe::{StripeEvent, StripeVerifier};

use crate::config::Config;
use crate::models::Gateway;
use crate::reconcile::{Correlation, Outcome};
use crate::webhooks::WebhookError;

/// The three verifiers, constructed once at startup and shared via AppState.
pub struct Verifiers {
    pub paymob: PaymobVerifier,
    pub paypal: PayPalVerifier,
    pub stripe: StripeVerifier,
}

impl Verifiers {
    pub fn from_config(config: &Config, http_client: reqwest::Client) -> Self {
        Self {
            paymob: PaymobVerifier::new(&config.paymob_hmac_key),
            paypal: PayPalVerifier::new(
                http_client,
                &config.paypal_api_base,
                &config.paypal_client_id,
                &config.paypal_client_secret,
                &config.paypal_webhook_id,
            ),
            stripe: StripeVerifier::new(&config.stripe_webhook_secret),
        }
    }
}

/// A parsed inbound webhook payload. Transient; never persisted.
#[derive(Debug)]
pub enum GatewayEvent {
    Paymob(PaymobEvent),
    PayPal(PayPalEvent),
    Stripe(StripeEvent),
}

impl GatewayEvent {
    pub fn gateway(&self) -> Gateway {
        match self {
            Self::Paymob(_) => Gateway::Paymob,
            Self::PayPal(_) => Gateway::PayPal,
            Self::Stripe(_) => Gateway::Stripe,
        }
    }

    /// Extracts the correlation key locating the payment this event refers
    /// to. Each gateway embeds it differently; a missing or non-numeric key
    /// rejects the event before any state is touched.
    pub fn correlation(&self) -> Result<Correlation, WebhookError> {
        match self {
            Self::Paymob(e) => e
                .obj
                .order
                .merchant_order_id
                .as_deref()
                .and_then(|s| s.parse().ok())
                .map(Correlation::Payment)
                .ok_or_else(|| {
                    WebhookError::Malformed("missing or non-numeric merchant order id".into())
                }),
            Self::PayPal(e) => e
                .resource
                .purchase_units
                .first()
                .and_then(|u| u.reference_id.as_deref())
                .and_then(|s| s.parse().ok())
                .map(Correlation::Subscription)
                .ok_or_else(|| {
                    WebhookError::Malformed("missing or non-numeric purchase unit reference".into())
                }),
            Self::Stripe(e) => e
                .data
                .object
                .metadata
                .get("SubscriptionId")
                .and_then(|s| s.parse().ok())
                .map(Correlation::Subscription)
                .ok_or_else(|| {
                    WebhookError::Malformed("missing or non-numeric SubscriptionId metadata".into())
                }),
        }
    }

    /// Maps the gateway's event semantics onto a payment outcome.
    /// `None` means the event type is not relevant to reconciliation.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Paymob(e) => {
                if e.obj.is_refunded {
                    Some(Outcome::Refunded)
                } else if e.obj.success {
                    Some(Outcome::Succeeded {
                        gateway_txn_id: e.obj.id.to_string(),
                    })
                } else {
                    Some(Outcome::Failed {
                        reason: "payment declined by gateway".to_string(),
                    })
                }
            }
            Self::PayPal(e) => match e.event_type.as_str() {
                "CHECKOUT.ORDER.APPROVED" | "CHECKOUT.ORDER.COMPLETED" => {
                    Some(Outcome::Succeeded {
                        gateway_txn_id: e.resource.id.clone().unwrap_or_default(),
                    })
                }
                "PAYMENT.CAPTURE.DENIED" => Some(Outcome::Failed {
                    reason: "capture denied".to_string(),
                }),
                "PAYMENT.CAPTURE.REFUNDED" => Some(Outcome::Refunded),
                _ => None,
            },
            Self::Stripe(e) => match e.event_type.as_str() {
                "checkout.session.completed" => Some(Outcome::Succeeded {
                    gateway_txn_id: e
                        .data
                        .object
                        .payment_intent
                        .clone()
                        .unwrap_or_else(|| e.data.object.id.clone()),
                }),
                "checkout.session.async_payment_failed" => Some(Outcome::Failed {
                    reason: "asynchronous payment failed".to_string(),
                }),
                "charge.refunded" => Some(Outcome::Refunded),
                _ => None,
            },
        }
    }
}
