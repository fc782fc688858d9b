//! PayPal webhook verification.
//!
//! PayPal does not sign with a shared secret we can check locally; instead we
//! call its verification endpoint with the transmission headers and the raw
//! event. Any error on that path (network, auth, non-success status) is
//! treated as forged - this is a fail-closed blocking call bounded by a 5s
//! timeout, and no lock is held across it.

use std::time::Duration;

use axum::http::HeaderMap;
use reqwest::Client;
use serde::Deserialize;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Order/capture event body. Only the fields reconciliation needs.
#[derive(Debug, Deserialize)]
pub struct PayPalEvent {
    pub id: Option<String>,
    pub event_type: String,
    pub resource: PayPalResource,
}

#[derive(Debug, Deserialize)]
pub struct PayPalResource {
    /// Order or capture id, depending on event type.
    pub id: Option<String>,
    #[serde(default)]
    pub purchase_units: Vec<PayPalPurchaseUnit>,
}

#[derive(Debug, Deserialize)]
pub struct PayPalPurchaseUnit {
    /// Our subscription id, stringified, set at order creation time.
    pub reference_id: Option<String>,
}

/// The five transmission headers PayPal attaches to every delivery.
#[derive(Debug)]
pub struct PayPalProof {
    pub transmission_id: String,
    pub transmission_time: String,
    pub cert_url: String,
    pub auth_algo: String,
    pub transmission_sig: String,
}

impl PayPalProof {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        Some(Self {
            transmission_id: get("paypal-transmission-id")?,
            transmission_time: get("paypal-transmission-time")?,
            cert_url: get("paypal-cert-url")?,
            auth_algo: get("paypal-auth-algo")?,
            transmission_sig: get("paypal-transmission-sig")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    verification_status: String,
}

pub struct PayPalVerifier {
    client: Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    webhook_id: String,
}

impl PayPalVerifier {
    pub fn new(
        client: Client,
        api_base: &str,
        client_id: &str,
        client_secret: &str,
        webhook_id: &str,
    ) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            webhook_id: webhook_id.to_string(),
        }
    }

    async fn access_token(&self) -> Option<String> {
        let resp = self
            .client
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .timeout(VERIFY_TIMEOUT)
            .send()
            .await
            .map_err(|e| tracing::warn!("PayPal token request failed: {}", e))
            .ok()?;

        if !resp.status().is_success() {
            tracing::warn!("PayPal token request returned {}", resp.status());
            return None;
        }

        resp.json::<TokenResponse>()
            .await
            .map_err(|e| tracing::warn!("PayPal token response unparseable: {}", e))
            .ok()
            .map(|t| t.access_token)
    }

    /// Calls PayPal's verify-webhook-signature endpoint. `raw_event` must be
    /// the event exactly as delivered - re-serializing a typed struct would
    /// drop fields and invalidate the signature.
    pub async fn verify(&self, proof: &PayPalProof, raw_event: &serde_json::Value) -> bool {
        if self.client_id.is_empty() || self.client_secret.is_empty() || self.webhook_id.is_empty()
        {
            tracing::warn!("PayPal credentials not configured; rejecting webhook");
            return false;
        }

        let Some(token) = self.access_token().await else {
            return false;
        };

        let body = serde_json::json!({
            "transmission_id": proof.transmission_id,
            "transmission_time": proof.transmission_time,
            "cert_url": proof.cert_url,
            "auth_algo": proof.auth_algo,
            "transmission_sig": proof.transmission_sig,
            "webhook_id": self.webhook_id,
            "webhook_event": raw_event,
        });

        let resp = match self
            .client
            .post(format!(
                "{}/v1/notification/verify-webhook-signature",
                self.api_base
            ))
            .bearer_auth(token)
            .timeout(VERIFY_TIMEOUT)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("PayPal verification call failed: {}", e);
                return false;
            }
        };

        if !resp.status().is_success() {
            tracing::warn!("PayPal verification returned {}", resp.status());
            return false;
        }

        match resp.json::<VerifyResponse>().await {
            Ok(v) => v.verification_status == "SUCCESS",
            Err(e) => {
                tracing::warn!("PayPal verification response unparseable: {}", e);
                false
            }
        }
    }
}
