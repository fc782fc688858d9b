//! Paymob webhook verification.
//!
//! Paymob proves authenticity with an HMAC over a canonical concatenation of
//! payload fields, supplied out-of-band as the `hmac` query parameter.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha512;
use subtle::ConstantTimeEq;

type HmacSha512 = Hmac<Sha512>;

/// Transaction-processed callback body.
#[derive(Debug, Deserialize)]
pub struct PaymobEvent {
    pub obj: PaymobTransaction,
}

#[derive(Debug, Deserialize)]
pub struct PaymobTransaction {
    /// Gateway-side transaction id.
    pub id: i64,
    pub amount_cents: i64,
    pub created_at: String,
    pub currency: String,
    pub success: bool,
    #[serde(default)]
    pub is_refunded: bool,
    pub order: PaymobOrder,
}

#[derive(Debug, Deserialize)]
pub struct PaymobOrder {
    pub id: i64,
    /// Our payment record id, stringified, set at order creation time.
    pub merchant_order_id: Option<String>,
}

pub struct PaymobVerifier {
    hmac_key: String,
}

impl PaymobVerifier {
    pub fn new(hmac_key: &str) -> Self {
        Self {
            hmac_key: hmac_key.to_string(),
        }
    }

    /// Canonical string in the pinned field order:
    /// amount_cents, created_at, currency, transaction id, merchant order id,
    /// success flag. Changing this order breaks verification for every
    /// delivery, so it must track Paymob's published HMAC documentation.
    pub fn canonical_string(event: &PaymobEvent) -> String {
        let t = &event.obj;
        format!(
            "{}{}{}{}{}{}",
            t.amount_cents,
            t.created_at,
            t.currency,
            t.id,
            t.order.merchant_order_id.as_deref().unwrap_or_default(),
            t.success,
        )
    }

    /// Authentic iff the supplied proof matches the keyed hash of the
    /// canonical string. The comparison is case-insensitive (Paymob sends
    /// either hex casing) and constant-time.
    pub fn verify(&self, event: &PaymobEvent, supplied: Option<&str>) -> bool {
        if self.hmac_key.is_empty() {
            tracing::warn!("Paymob HMAC key not configured; rejecting webhook");
            return false;
        }
        let Some(supplied) = supplied else {
            return false;
        };

        let mut mac = match HmacSha512::new_from_slice(self.hmac_key.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(Self::canonical_string(event).as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        let provided = supplied.to_ascii_lowercase();
        // Length is not secret (always 128 hex chars for SHA-512).
        if expected.len() != provided.len() {
            return false;
        }
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }
}
