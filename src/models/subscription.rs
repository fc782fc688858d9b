use serde::{Deserialize, Serialize};

/// A client's subscription to a trainer's package.
///
/// Created `Unpaid` at subscribe time (outside this service) and mutated only
/// as a side effect of a payment transition inside the orchestrator. Names and
/// emails are denormalized contact snapshots used by the fan-out; the
/// marketplace user service owns the real profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub client_name: String,
    pub client_email: Option<String>,
    pub trainer_name: String,
    pub trainer_email: Option<String>,
    pub package_id: i64,
    pub status: SubscriptionStatus,
    pub start_date: Option<i64>,
    pub current_period_end: Option<i64>,
    pub amount_paid_cents: i64,
    pub currency: String,
    /// Gateway-side order correlation id (PayPal order id).
    pub gateway_order_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Data required to create a subscription row (seeding and tests).
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub client_name: String,
    pub client_email: Option<String>,
    pub trainer_name: String,
    pub trainer_email: Option<String>,
    pub package_id: i64,
    pub currency: String,
    pub gateway_order_id: Option<String>,
}

/// Subscription lifecycle. Active iff the most recent payment is Completed;
/// Canceled when that payment is Refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Unpaid,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Unpaid => "unpaid",
            Self::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "unpaid" => Some(Self::Unpaid),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
