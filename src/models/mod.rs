mod payment;
mod subscription;

pub use payment::{Gateway, NewPayment, PaymentRecord, PaymentStatus};
pub use subscription::{NewSubscription, Subscription, SubscriptionStatus};
