//! Coachpay - payment webhook reconciliation for the trainer/client marketplace
//!
//! This library implements the inbound side of payment processing: gateway
//! webhook endpoints, per-gateway authenticity verification, idempotent
//! payment/subscription state transitions, and the notification fan-out that
//! follows a settled payment.

pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod events;
pub mod fanout;
pub mod gate;
pub mod gateways;
pub mod models;
pub mod reconcile;
pub mod webhooks;
