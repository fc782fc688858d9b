use std::sync::Arc;

use axum::{routing::get, Router};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coachpay::config::Config;
use coachpay::db::{create_pool, init_db, queries, AppState};
use coachpay::email::Mailer;
use coachpay::events::EventBus;
use coachpay::gate::RateGate;
use coachpay::gateways::Verifiers;
use coachpay::models::{Gateway, NewPayment, NewSubscription};
use coachpay::webhooks;

#[derive(Parser, Debug)]
#[command(name = "coachpay")]
#[command(about = "Payment webhook reconciliation service for the trainer marketplace")]
struct Cli {
    /// Seed the database with a dev subscription and pending payment
    #[arg(long)]
    seed: bool,
}

/// Seeds one Unpaid subscription with a Pending payment so gateway webhooks
/// can be exercised against a known pair. Dev mode only, skipped when data
/// already exists.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    let count = queries::count_subscriptions(&conn).expect("Failed to count subscriptions");
    if count > 0 {
        tracing::info!("Database already has data, skipping seed");
        return;
    }

    let subscription_id = queries::create_subscription(
        &conn,
        &NewSubscription {
            client_name: "Dev Client".to_string(),
            client_email: Some("client@coachpay.local".to_string()),
            trainer_name: "Dev Trainer".to_string(),
            trainer_email: Some("trainer@coachpay.local".to_string()),
            package_id: 1,
            currency: "usd".to_string(),
            gateway_order_id: None,
        },
    )
    .expect("Failed to create dev subscription");

    let payment_id = queries::create_payment(
        &conn,
        &NewPayment {
            subscription_id,
            amount_cents: 15_000,
            currency: "usd".to_string(),
            gateway: Gateway::Paymob,
        },
    )
    .expect("Failed to create dev payment");

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED");
    tracing::info!("Subscription id: {}", subscription_id);
    tracing::info!("Pending payment id: {}", payment_id);
    tracing::info!("============================================");
}

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coachpay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let http_client = reqwest::Client::new();

    let state = AppState {
        db: db_pool,
        gate: Arc::new(RateGate::new(
            config.rate_limit_rpm,
            config.allow_list_enabled,
            &config.allow_list,
        )),
        bus: EventBus::new(256),
        mailer: Arc::new(Mailer::from_config(&config, http_client.clone())),
        verifiers: Arc::new(Verifiers::from_config(&config, http_client)),
        commission_percent: config.commission_percent,
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set COACHPAY_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    // Log-only subscriber standing in for the real-time admin bridge; the
    // production bridge attaches through EventBus::subscribe with the same
    // event contract.
    let mut admin_rx = state.bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = admin_rx.recv().await {
            tracing::info!(?event, "admin event");
        }
    });

    let app = Router::new()
        .route("/health", get(health))
        .merge(webhooks::router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Coachpay webhook service listening on {}", addr);

    // Connect info is required so the gate sees real source addresses.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
