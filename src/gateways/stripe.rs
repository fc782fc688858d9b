//! Stripe webhook verification.
//!
//! The `Signature` header carries `t=<unix ts>,v1=<hmac>`; the HMAC-SHA256 is
//! computed over `"{t}.{raw body}"` with the shared webhook secret. A
//! tolerance window bounds replay and clock skew.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Checkout-session event envelope.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: StripeSessionObject,
}

/// The session (or charge, for refunds) carried in `data.object`. Only the
/// fields reconciliation needs; the correlation key rides in metadata.
#[derive(Debug, Deserialize)]
pub struct StripeSessionObject {
    pub id: String,
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

pub struct StripeVerifier {
    webhook_secret: String,
}

impl StripeVerifier {
    /// Maximum age of a webhook timestamp before it is rejected.
    /// Stripe recommends 300 seconds.
    const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Clock-skew allowance for timestamps from the future.
    const FUTURE_SKEW_SECS: i64 = 60;

    pub fn new(webhook_secret: &str) -> Self {
        Self {
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Returns Ok(true) for an authentic delivery, Ok(false) for a mismatch
    /// or out-of-tolerance timestamp, Err for a header we cannot parse.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<bool> {
        if self.webhook_secret.is_empty() {
            tracing::warn!("Stripe webhook secret not configured; rejecting webhook");
            return Ok(false);
        }

        let mut timestamp = None;
        let mut sig_v1 = None;
        for part in signature_header.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str = timestamp
            .ok_or_else(|| AppError::BadRequest("signature header missing timestamp".into()))?;
        let sig_v1 = sig_v1
            .ok_or_else(|| AppError::BadRequest("signature header missing v1 signature".into()))?;

        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::BadRequest("invalid timestamp in signature header".into()))?;

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age > Self::TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }
        if age < -Self::FUTURE_SKEW_SECS {
            tracing::warn!("Stripe webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("invalid webhook secret".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time compare; the length itself is not secret (64 hex
        // chars for SHA-256).
        if expected.len() != sig_v1.len() {
            return Ok(false);
        }
        Ok(expected.as_bytes().ct_eq(sig_v1.as_bytes()).into())
    }
}
