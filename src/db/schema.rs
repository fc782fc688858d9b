use rusqlite::Connection;

use crate::error::Result;

/// Initializes the schema. Idempotent; runs at startup.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_name TEXT NOT NULL,
            client_email TEXT,
            trainer_name TEXT NOT NULL,
            trainer_email TEXT,
            package_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'unpaid',
            start_date INTEGER,
            current_period_end INTEGER,
            amount_paid_cents INTEGER NOT NULL DEFAULT 0,
            currency TEXT NOT NULL DEFAULT 'usd',
            gateway_order_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subscription_id INTEGER NOT NULL REFERENCES subscriptions(id),
            amount_cents INTEGER NOT NULL,
            currency TEXT NOT NULL,
            gateway TEXT NOT NULL,
            gateway_txn_id TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            failure_reason TEXT,
            trainer_payout_cents INTEGER,
            created_at INTEGER NOT NULL,
            paid_at INTEGER,
            failed_at INTEGER,
            refunded_at INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_payments_subscription
            ON payments(subscription_id, created_at);
        "#,
    )?;

    Ok(())
}
