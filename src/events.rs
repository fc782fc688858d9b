//! Typed domain events for admin notification.
//!
//! The fan-out dispatcher publishes these after a payment transition commits;
//! the admin bridge (external, real-time delivery) subscribes at this
//! boundary. Zero subscribers is a valid state, not an error.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdminEvent {
    NewPayment {
        payment_id: i64,
        amount_cents: i64,
        currency: String,
        client_name: String,
        trainer_name: String,
    },
    PaymentFailure {
        payment_id: i64,
        amount_cents: i64,
        currency: String,
        client_name: String,
        reason: String,
    },
    PaymentRefunded {
        payment_id: i64,
        amount_cents: i64,
        currency: String,
        client_name: String,
    },
}

/// Broadcast channel wrapper for admin events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AdminEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdminEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: AdminEvent) {
        match self.tx.send(event) {
            Ok(subscribers) => {
                tracing::debug!(subscribers, "admin event published");
            }
            Err(broadcast::error::SendError(event)) => {
                tracing::warn!(?event, "admin event dropped: no subscribers");
            }
        }
    }
}
