//! Reconciliation orchestrator - the idempotent state machine behind every
//! verified webhook.
//!
//! Gateways deliver at least once; this module guarantees at most one effect.
//! The locate / idempotency-check / transition sequence runs inside a single
//! database transaction scoped to one payment, so redeliveries and concurrent
//! duplicates collapse to a no-op while events for unrelated payments never
//! contend. Fan-out happens only after commit, and only for transitions that
//! actually applied.

use chrono::Utc;
use rusqlite::Connection;

use crate::db::{queries, AppState};
use crate::fanout;
use crate::gateways::GatewayEvent;
use crate::models::{PaymentRecord, PaymentStatus, Subscription, SubscriptionStatus};
use crate::webhooks::{WebhookError, WebhookReply};

/// Where a gateway's correlation key points: Paymob names the payment row
/// directly; PayPal and Stripe name the subscription, resolved to its most
/// recent payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    Payment(i64),
    Subscription(i64),
}

/// The payment outcome a verified event implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded { gateway_txn_id: String },
    Failed { reason: String },
    Refunded,
}

/// Result of a reconciliation pass. `replay` means the record was already in
/// a terminal state for this outcome (or the transition was not valid) and
/// nothing changed - the caller must not fan out.
#[derive(Debug)]
pub struct Settled {
    pub payment: PaymentRecord,
    pub subscription: Subscription,
    pub replay: bool,
}

/// Packages bill monthly; a settled payment covers the next 30 days and the
/// renewal checkout issues the following pending payment.
pub const BILLING_PERIOD_SECS: i64 = 30 * 24 * 60 * 60;

/// Trainer's share of a settled payment after platform commission.
pub fn trainer_payout(amount_cents: i64, commission_percent: u32) -> i64 {
    amount_cents - (amount_cents * commission_percent as i64 / 100)
}

fn internal(e: crate::error::AppError) -> WebhookError {
    tracing::error!("Reconciliation storage error: {}", e);
    WebhookError::Internal
}

/// Applies one verified event to the payment/subscription pair, atomically.
///
/// Valid transitions: Pending->Completed (subscription -> Active),
/// Pending->Failed, Completed->Refunded (subscription -> Canceled). Any other
/// combination is an idempotent no-op. If the commit fails the event is
/// unprocessed and the gateway's redelivery will retry it.
pub fn reconcile(
    conn: &mut Connection,
    commission_percent: u32,
    correlation: &Correlation,
    outcome: &Outcome,
) -> Result<Settled, WebhookError> {
    let tx = conn.transaction().map_err(|e| {
        tracing::error!("Failed to start transaction: {}", e);
        WebhookError::Internal
    })?;

    let payment = match correlation {
        Correlation::Payment(id) => queries::get_payment_by_id(&tx, *id)
            .map_err(internal)?
            .ok_or(WebhookError::NotFound("payment record not found"))?,
        Correlation::Subscription(id) => queries::get_latest_payment_for_subscription(&tx, *id)
            .map_err(internal)?
            .ok_or(WebhookError::NotFound("no payment found for subscription"))?,
    };

    let subscription = queries::get_subscription_by_id(&tx, payment.subscription_id)
        .map_err(internal)?
        .ok_or(WebhookError::NotFound("subscription not found"))?;

    let applies = matches!(
        (payment.status, outcome),
        (PaymentStatus::Pending, Outcome::Succeeded { .. })
            | (PaymentStatus::Pending, Outcome::Failed { .. })
            | (PaymentStatus::Completed, Outcome::Refunded)
    );

    if !applies {
        // Redelivery or an out-of-order event; the state already reflects a
        // terminal decision for this payment. Succeed without touching it.
        tracing::debug!(
            payment_id = payment.id,
            status = %payment.status,
            ?outcome,
            "Ignoring non-applicable transition"
        );
        return Ok(Settled {
            payment,
            subscription,
            replay: true,
        });
    }

    let now = Utc::now().timestamp();
    let mut payment = payment;
    let mut subscription = subscription;

    match outcome {
        Outcome::Succeeded { gateway_txn_id } => {
            let payout = trainer_payout(payment.amount_cents, commission_percent);
            let period_end = now + BILLING_PERIOD_SECS;
            queries::mark_payment_completed(&tx, payment.id, gateway_txn_id, now, payout)
                .map_err(internal)?;
            queries::activate_subscription(
                &tx,
                subscription.id,
                payment.amount_cents,
                now,
                period_end,
            )
            .map_err(internal)?;

            payment.status = PaymentStatus::Completed;
            payment.gateway_txn_id = Some(gateway_txn_id.clone());
            payment.paid_at = Some(now);
            payment.trainer_payout_cents = Some(payout);
            subscription.status = SubscriptionStatus::Active;
            subscription.amount_paid_cents = payment.amount_cents;
            subscription.start_date.get_or_insert(now);
            subscription.current_period_end = Some(period_end);
        }
        Outcome::Failed { reason } => {
            queries::mark_payment_failed(&tx, payment.id, reason, now).map_err(internal)?;

            payment.status = PaymentStatus::Failed;
            payment.failure_reason = Some(reason.clone());
            payment.failed_at = Some(now);
        }
        Outcome::Refunded => {
            queries::mark_payment_refunded(&tx, payment.id, now).map_err(internal)?;
            queries::cancel_subscription(&tx, subscription.id).map_err(internal)?;

            payment.status = PaymentStatus::Refunded;
            payment.refunded_at = Some(now);
            subscription.status = SubscriptionStatus::Canceled;
        }
    }

    tx.commit().map_err(|e| {
        tracing::error!("Failed to commit payment transition: {}", e);
        WebhookError::Internal
    })?;

    tracing::info!(
        payment_id = payment.id,
        subscription_id = subscription.id,
        status = %payment.status,
        "Payment transition applied"
    );

    // The in-hand aggregates mirror exactly what was committed; callers use
    // them for fan-out instead of re-querying after the fact.
    Ok(Settled {
        payment,
        subscription,
        replay: false,
    })
}

/// Full post-verification pipeline for one parsed event: outcome mapping,
/// correlation, atomic transition, then fire-and-forget fan-out.
pub async fn process_event(
    state: &AppState,
    event: GatewayEvent,
) -> Result<WebhookReply, WebhookError> {
    let Some(outcome) = event.outcome() else {
        return Ok(WebhookReply::ignored());
    };
    let correlation = event.correlation()?;

    let mut conn = state.db.get().map_err(|e| {
        tracing::error!("DB connection error: {}", e);
        WebhookError::Internal
    })?;

    let settled = reconcile(&mut conn, state.commission_percent, &correlation, &outcome)?;

    if settled.replay {
        return Ok(WebhookReply::already_processed(settled.payment.id));
    }

    let payment_id = settled.payment.id;
    fanout::spawn_dispatch(state, settled.payment, settled.subscription);

    Ok(WebhookReply::processed(payment_id))
}
