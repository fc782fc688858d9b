//! Email delivery for payment notifications.
//!
//! Supports three modes:
//! 1. Send via Resend API (default when API key available)
//! 2. POST to a webhook URL (for DIY email delivery)
//! 3. Disabled (no email sent, log only)

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Retry delays in seconds for transient (429/5xx) Resend responses.
const RETRY_DELAYS: &[u64] = &[1, 4];

/// Result of attempting a notification send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    Sent,
    WebhookCalled,
    Disabled,
}

#[derive(Debug)]
enum Mode {
    Resend { api_key: String },
    Webhook { url: String },
    Disabled,
}

/// Payload POSTed in webhook mode, mirroring what the Resend path renders.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'static str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

pub struct Mailer {
    mode: Mode,
    client: Client,
    from: String,
    api_url: String,
}

fn format_amount(cents: i64, currency: &str) -> String {
    format!("{}.{:02} {}", cents / 100, (cents % 100).abs(), currency.to_uppercase())
}

impl Mailer {
    pub fn from_config(config: &Config, client: Client) -> Self {
        let mode = if let Some(key) = &config.resend_api_key {
            Mode::Resend {
                api_key: key.clone(),
            }
        } else if let Some(url) = &config.email_webhook_url {
            Mode::Webhook { url: url.clone() }
        } else {
            Mode::Disabled
        };

        Self {
            mode,
            client,
            from: config.email_from.clone(),
            api_url: config.resend_api_url.clone(),
        }
    }

    pub async fn send_payment_confirmation(
        &self,
        to: &str,
        client_name: &str,
        amount_cents: i64,
        currency: &str,
        payment_id: i64,
    ) -> Result<EmailSendResult> {
        let amount = format_amount(amount_cents, currency);
        let subject = format!("Payment received - {}", amount);
        let html = format!(
            "<p>Hi {client_name},</p>\
             <p>Your payment of <strong>{amount}</strong> was received. \
             Your subscription is now active.</p>\
             <p>Reference: payment #{payment_id}</p>"
        );
        self.deliver("payment_confirmation", to, &subject, &html).await
    }

    pub async fn send_payout_notice(
        &self,
        to: &str,
        trainer_name: &str,
        payout_cents: i64,
        currency: &str,
        payment_id: i64,
    ) -> Result<EmailSendResult> {
        let amount = format_amount(payout_cents, currency);
        let subject = format!("New client payment - {} payout", amount);
        let html = format!(
            "<p>Hi {trainer_name},</p>\
             <p>A client payment settled. Your payout share is \
             <strong>{amount}</strong>.</p>\
             <p>Reference: payment #{payment_id}</p>"
        );
        self.deliver("trainer_payout", to, &subject, &html).await
    }

    pub async fn send_payment_failure(
        &self,
        to: &str,
        client_name: &str,
        reason: &str,
    ) -> Result<EmailSendResult> {
        let subject = "Payment failed".to_string();
        let html = format!(
            "<p>Hi {client_name},</p>\
             <p>Your payment could not be completed: {reason}.</p>\
             <p>No charge was made. You can retry from your subscription page.</p>"
        );
        self.deliver("payment_failure", to, &subject, &html).await
    }

    pub async fn send_refund_notice(
        &self,
        to: &str,
        client_name: &str,
        amount_cents: i64,
        currency: &str,
    ) -> Result<EmailSendResult> {
        let amount = format_amount(amount_cents, currency);
        let subject = format!("Refund issued - {}", amount);
        let html = format!(
            "<p>Hi {client_name},</p>\
             <p>Your payment of <strong>{amount}</strong> was refunded and the \
             subscription canceled.</p>"
        );
        self.deliver("payment_refund", to, &subject, &html).await
    }

    async fn deliver(
        &self,
        event: &'static str,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<EmailSendResult> {
        match &self.mode {
            Mode::Disabled => {
                tracing::debug!(event, to, "email delivery disabled; skipping send");
                Ok(EmailSendResult::Disabled)
            }
            Mode::Webhook { url } => {
                let payload = WebhookPayload {
                    event,
                    to,
                    subject,
                    html,
                };
                let resp = self
                    .client
                    .post(url)
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| AppError::Internal(format!("email webhook error: {}", e)))?;
                if !resp.status().is_success() {
                    return Err(AppError::Internal(format!(
                        "email webhook returned {}",
                        resp.status()
                    )));
                }
                Ok(EmailSendResult::WebhookCalled)
            }
            Mode::Resend { api_key } => {
                self.send_via_resend(api_key, to, subject, html).await?;
                Ok(EmailSendResult::Sent)
            }
        }
    }

    async fn send_via_resend(
        &self,
        api_key: &str,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<()> {
        let body = serde_json::json!({
            "from": self.from,
            "to": [to],
            "subject": subject,
            "html": html,
        });

        // Retry only on transient statuses; a connect failure or 4xx is final.
        let mut attempt = 0;
        loop {
            let resp = self
                .client
                .post(&self.api_url)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| AppError::Internal(format!("Resend API error: {}", e)))?;

            let status = resp.status();
            if status.is_success() {
                return Ok(());
            }

            let transient = status.as_u16() == 429 || status.is_server_error();
            if transient && attempt < RETRY_DELAYS.len() {
                let delay = RETRY_DELAYS[attempt];
                tracing::warn!(
                    "Resend returned {}, retrying in {}s (attempt {})",
                    status,
                    delay,
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
                attempt += 1;
                continue;
            }

            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Resend returned {}: {}",
                status, text
            )));
        }
    }
}
