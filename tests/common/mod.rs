#![allow(dead_code)]

use std::sync::Arc;

use coachpay::config::{Config, DEFAULT_RESEND_API_URL};
use coachpay::db::{create_memory_pool, init_db, queries, AppState};
use coachpay::email::Mailer;
use coachpay::events::EventBus;
use coachpay::gate::RateGate;
use coachpay::gateways::Verifiers;
use coachpay::models::{Gateway, NewPayment, NewSubscription};

/// Config with all secrets blank and email disabled. Individual tests
/// override fields before building state from it.
pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_path: ":memory:".to_string(),
        dev_mode: true,

        paymob_hmac_key: String::new(),
        paypal_client_id: String::new(),
        paypal_client_secret: String::new(),
        paypal_webhook_id: String::new(),
        paypal_api_base: "http://127.0.0.1:9".to_string(),
        stripe_webhook_secret: String::new(),

        rate_limit_rpm: 60,
        allow_list_enabled: false,
        allow_list: Vec::new(),

        commission_percent: 20,

        resend_api_key: None,
        resend_api_url: DEFAULT_RESEND_API_URL.to_string(),
        email_webhook_url: None,
        email_from: "Coachpay <no-reply@coachpay.test>".to_string(),
    }
}

/// Fresh in-memory state: single-connection pool, initialized schema,
/// disabled mailer.
pub fn test_state() -> AppState {
    test_state_with(test_config())
}

pub fn test_state_with(config: Config) -> AppState {
    let pool = create_memory_pool().expect("memory pool");
    {
        let conn = pool.get().expect("connection");
        init_db(&conn).expect("schema");
    }

    let client = reqwest::Client::new();

    AppState {
        db: pool,
        gate: Arc::new(RateGate::new(
            config.rate_limit_rpm,
            config.allow_list_enabled,
            &config.allow_list,
        )),
        bus: EventBus::new(16),
        mailer: Arc::new(Mailer::from_config(&config, client.clone())),
        verifiers: Arc::new(Verifiers::from_config(&config, client)),
        commission_percent: config.commission_percent,
    }
}

pub fn seed_subscription(state: &AppState) -> i64 {
    let conn = state.db.get().expect("connection");
    queries::create_subscription(
        &conn,
        &NewSubscription {
            client_name: "Mona Client".to_string(),
            client_email: Some("mona@example.com".to_string()),
            trainer_name: "Tarek Trainer".to_string(),
            trainer_email: Some("tarek@example.com".to_string()),
            package_id: 7,
            currency: "egp".to_string(),
            gateway_order_id: None,
        },
    )
    .expect("seed subscription")
}

pub fn seed_payment(state: &AppState, subscription_id: i64, gateway: Gateway) -> i64 {
    let conn = state.db.get().expect("connection");
    queries::create_payment(
        &conn,
        &NewPayment {
            subscription_id,
            amount_cents: 50_000,
            currency: "egp".to_string(),
            gateway,
        },
    )
    .expect("seed payment")
}

/// Seed a payment with a caller-chosen id, matching what a gateway payload
/// will reference as its merchant order id.
pub fn seed_payment_with_id(
    state: &AppState,
    id: i64,
    subscription_id: i64,
    gateway: Gateway,
) -> i64 {
    let conn = state.db.get().expect("connection");
    queries::create_payment_with_id(
        &conn,
        id,
        &NewPayment {
            subscription_id,
            amount_cents: 50_000,
            currency: "egp".to_string(),
            gateway,
        },
    )
    .expect("seed payment with id")
}
