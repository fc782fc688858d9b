use chrono::Utc;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{NewPayment, NewSubscription, PaymentRecord, Subscription};

use super::from_row::{query_one, PAYMENT_COLS, SUBSCRIPTION_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

pub fn get_payment_by_id(conn: &Connection, id: i64) -> Result<Option<PaymentRecord>> {
    query_one(
        conn,
        &format!("SELECT {PAYMENT_COLS} FROM payments WHERE id = ?"),
        params![id],
    )
}

/// The most recent payment for a subscription. PayPal and Stripe correlate by
/// subscription, not payment id, so their events resolve through here.
pub fn get_latest_payment_for_subscription(
    conn: &Connection,
    subscription_id: i64,
) -> Result<Option<PaymentRecord>> {
    query_one(
        conn,
        &format!(
            "SELECT {PAYMENT_COLS} FROM payments WHERE subscription_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ),
        params![subscription_id],
    )
}

pub fn get_subscription_by_id(conn: &Connection, id: i64) -> Result<Option<Subscription>> {
    query_one(
        conn,
        &format!("SELECT {SUBSCRIPTION_COLS} FROM subscriptions WHERE id = ?"),
        params![id],
    )
}

pub fn mark_payment_completed(
    conn: &Connection,
    id: i64,
    gateway_txn_id: &str,
    paid_at: i64,
    trainer_payout_cents: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE payments SET status = 'completed', gateway_txn_id = ?, paid_at = ?, \
         trainer_payout_cents = ? WHERE id = ?",
        params![gateway_txn_id, paid_at, trainer_payout_cents, id],
    )?;
    Ok(())
}

pub fn mark_payment_failed(
    conn: &Connection,
    id: i64,
    reason: &str,
    failed_at: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE payments SET status = 'failed', failure_reason = ?, failed_at = ? WHERE id = ?",
        params![reason, failed_at, id],
    )?;
    Ok(())
}

pub fn mark_payment_refunded(conn: &Connection, id: i64, refunded_at: i64) -> Result<()> {
    conn.execute(
        "UPDATE payments SET status = 'refunded', refunded_at = ? WHERE id = ?",
        params![refunded_at, id],
    )?;
    Ok(())
}

/// Marks a subscription active. `start_date` is only set on first activation;
/// `current_period_end` always moves forward so a renewal payment extends the
/// running period.
pub fn activate_subscription(
    conn: &Connection,
    id: i64,
    amount_paid_cents: i64,
    start_date: i64,
    period_end: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE subscriptions SET status = 'active', amount_paid_cents = ?, \
         start_date = COALESCE(start_date, ?), current_period_end = ?, \
         updated_at = ? WHERE id = ?",
        params![amount_paid_cents, start_date, period_end, now(), id],
    )?;
    Ok(())
}

pub fn cancel_subscription(conn: &Connection, id: i64) -> Result<()> {
    conn.execute(
        "UPDATE subscriptions SET status = 'canceled', updated_at = ? WHERE id = ?",
        params![now(), id],
    )?;
    Ok(())
}

pub fn create_subscription(conn: &Connection, input: &NewSubscription) -> Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO subscriptions (client_name, client_email, trainer_name, trainer_email, \
         package_id, status, amount_paid_cents, currency, gateway_order_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 'unpaid', 0, ?, ?, ?, ?)",
        params![
            input.client_name,
            input.client_email,
            input.trainer_name,
            input.trainer_email,
            input.package_id,
            input.currency,
            input.gateway_order_id,
            ts,
            ts,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn create_payment(conn: &Connection, input: &NewPayment) -> Result<i64> {
    conn.execute(
        "INSERT INTO payments (subscription_id, amount_cents, currency, gateway, status, created_at) \
         VALUES (?, ?, ?, ?, 'pending', ?)",
        params![
            input.subscription_id,
            input.amount_cents,
            input.currency,
            input.gateway.as_str(),
            now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Seeding/tests only: create a payment with a caller-chosen id so gateway
/// payloads referencing a known merchant order id can be replayed against it.
pub fn create_payment_with_id(conn: &Connection, id: i64, input: &NewPayment) -> Result<i64> {
    conn.execute(
        "INSERT INTO payments (id, subscription_id, amount_cents, currency, gateway, status, created_at) \
         VALUES (?, ?, ?, ?, ?, 'pending', ?)",
        params![
            id,
            input.subscription_id,
            input.amount_cents,
            input.currency,
            input.gateway.as_str(),
            now(),
        ],
    )?;
    Ok(id)
}

pub fn count_subscriptions(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))
        .map_err(Into::into)
}
