use serde::{Deserialize, Serialize};

/// A single payment attempt against a subscription.
///
/// Created in `Pending` by the checkout flow (outside this service) and
/// mutated exclusively by the reconciliation orchestrator. Rows are never
/// deleted, only terminally marked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub subscription_id: i64,
    pub amount_cents: i64,
    pub currency: String,
    pub gateway: Gateway,
    /// Gateway-side transaction/capture identifier, set on completion.
    pub gateway_txn_id: Option<String>,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    /// Trainer's share of a completed payment (amount minus platform
    /// commission), computed at completion time.
    pub trainer_payout_cents: Option<i64>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
    pub failed_at: Option<i64>,
    pub refunded_at: Option<i64>,
}

/// Data required to create a payment row (seeding and tests; production rows
/// come from the checkout flow).
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub subscription_id: i64,
    pub amount_cents: i64,
    pub currency: String,
    pub gateway: Gateway,
}

/// Payment lifecycle. Valid transitions are Pending->Completed,
/// Pending->Failed and Completed->Refunded; anything else is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three integrated payment gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    Paymob,
    PayPal,
    Stripe,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paymob => "paymob",
            Self::PayPal => "paypal",
            Self::Stripe => "stripe",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "paymob" => Some(Self::Paymob),
            "paypal" => Some(Self::PayPal),
            "stripe" => Some(Self::Stripe),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
