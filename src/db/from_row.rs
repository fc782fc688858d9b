//! Row-mapping helpers. Column lists are kept next to the mapping code so a
//! schema change fails loudly in one place.

use rusqlite::{Connection, Params, Row};

use crate::error::Result;
use crate::models::{Gateway, PaymentRecord, PaymentStatus, Subscription, SubscriptionStatus};

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

pub const PAYMENT_COLS: &str = "id, subscription_id, amount_cents, currency, gateway, \
     gateway_txn_id, status, failure_reason, trainer_payout_cents, \
     created_at, paid_at, failed_at, refunded_at";

pub const SUBSCRIPTION_COLS: &str = "id, client_name, client_email, trainer_name, trainer_email, \
     package_id, status, start_date, current_period_end, amount_paid_cents, \
     currency, gateway_order_id, created_at, updated_at";

fn bad_column(idx: usize, what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unknown {what}").into(),
    )
}

impl FromRow for PaymentRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let gateway: String = row.get(4)?;
        let status: String = row.get(6)?;
        Ok(Self {
            id: row.get(0)?,
            subscription_id: row.get(1)?,
            amount_cents: row.get(2)?,
            currency: row.get(3)?,
            gateway: Gateway::from_str(&gateway).ok_or_else(|| bad_column(4, "gateway"))?,
            gateway_txn_id: row.get(5)?,
            status: PaymentStatus::from_str(&status).ok_or_else(|| bad_column(6, "status"))?,
            failure_reason: row.get(7)?,
            trainer_payout_cents: row.get(8)?,
            created_at: row.get(9)?,
            paid_at: row.get(10)?,
            failed_at: row.get(11)?,
            refunded_at: row.get(12)?,
        })
    }
}

impl FromRow for Subscription {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get(6)?;
        Ok(Self {
            id: row.get(0)?,
            client_name: row.get(1)?,
            client_email: row.get(2)?,
            trainer_name: row.get(3)?,
            trainer_email: row.get(4)?,
            package_id: row.get(5)?,
            status: SubscriptionStatus::from_str(&status)
                .ok_or_else(|| bad_column(6, "status"))?,
            start_date: row.get(7)?,
            current_period_end: row.get(8)?,
            amount_paid_cents: row.get(9)?,
            currency: row.get(10)?,
            gateway_order_id: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

pub fn query_one<T: FromRow, P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    use rusqlite::OptionalExtension;
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}
