//! Notification fan-out for committed payment outcomes.
//!
//! Runs after the reconciliation transaction has committed and after the
//! webhook response is decided. Every email send and event publish is wrapped
//! individually: a failure in one path is logged and never blocks the others,
//! and nothing here can undo the financial transition or change the HTTP
//! response the gateway already received.

use std::sync::Arc;

use crate::db::AppState;
use crate::email::Mailer;
use crate::events::{AdminEvent, EventBus};
use crate::models::{PaymentRecord, PaymentStatus, Subscription};

/// Fire-and-forget dispatch; the caller does not await delivery.
pub fn spawn_dispatch(state: &AppState, payment: PaymentRecord, subscription: Subscription) {
    let mailer: Arc<Mailer> = state.mailer.clone();
    let bus = state.bus.clone();
    tokio::spawn(async move {
        dispatch(&mailer, &bus, &payment, &subscription).await;
    });
}

pub async fn dispatch(
    mailer: &Mailer,
    bus: &EventBus,
    payment: &PaymentRecord,
    subscription: &Subscription,
) {
    match payment.status {
        PaymentStatus::Completed => {
            if let Some(to) = &subscription.client_email {
                if let Err(e) = mailer
                    .send_payment_confirmation(
                        to,
                        &subscription.client_name,
                        payment.amount_cents,
                        &payment.currency,
                        payment.id,
                    )
                    .await
                {
                    tracing::warn!("Failed to send payment confirmation: {}", e);
                }
            }
            if let Some(to) = &subscription.trainer_email {
                if let Err(e) = mailer
                    .send_payout_notice(
                        to,
                        &subscription.trainer_name,
                        payment.trainer_payout_cents.unwrap_or(0),
                        &payment.currency,
                        payment.id,
                    )
                    .await
                {
                    tracing::warn!("Failed to send payout notice: {}", e);
                }
            }
            bus.publish(AdminEvent::NewPayment {
                payment_id: payment.id,
                amount_cents: payment.amount_cents,
                currency: payment.currency.clone(),
                client_name: subscription.client_name.clone(),
                trainer_name: subscription.trainer_name.clone(),
            });
        }
        PaymentStatus::Failed => {
            let reason = payment
                .failure_reason
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            if let Some(to) = &subscription.client_email {
                if let Err(e) = mailer
                    .send_payment_failure(to, &subscription.client_name, &reason)
                    .await
                {
                    tracing::warn!("Failed to send payment failure notice: {}", e);
                }
            }
            bus.publish(AdminEvent::PaymentFailure {
                payment_id: payment.id,
                amount_cents: payment.amount_cents,
                currency: payment.currency.clone(),
                client_name: subscription.client_name.clone(),
                reason,
            });
        }
        PaymentStatus::Refunded => {
            if let Some(to) = &subscription.client_email {
                if let Err(e) = mailer
                    .send_refund_notice(
                        to,
                        &subscription.client_name,
                        payment.amount_cents,
                        &payment.currency,
                    )
                    .await
                {
                    tracing::warn!("Failed to send refund notice: {}", e);
                }
            }
            bus.publish(AdminEvent::PaymentRefunded {
                payment_id: payment.id,
                amount_cents: payment.amount_cents,
                currency: payment.currency.clone(),
                client_name: subscription.client_name.clone(),
            });
        }
        PaymentStatus::Pending => {
            tracing::error!(
                "Dispatch called for pending payment {}; nothing to notify",
                payment.id
            );
        }
    }
}
