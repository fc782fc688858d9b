use std::env;
use std::net::IpAddr;

/// Default Resend API endpoint. Overridable for tests via RESEND_API_URL.
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,

    // Gateway secrets
    pub paymob_hmac_key: String,
    pub paypal_client_id: String,
    pub paypal_client_secret: String,
    pub paypal_webhook_id: String,
    pub paypal_api_base: String,
    pub stripe_webhook_secret: String,

    // Rate/access gate
    pub rate_limit_rpm: u32,
    pub allow_list_enabled: bool,
    pub allow_list: Vec<IpAddr>,

    // Platform commission taken from each settled payment, in percent
    pub commission_percent: u32,

    // Email delivery
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
    pub email_webhook_url: Option<String>,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COACHPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let allow_list_enabled = env::var("WEBHOOK_ALLOW_LIST_ENABLED")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);

        // Invalid entries are dropped with a warning. An enabled allow list
        // that ends up empty rejects everything (the gate fails closed).
        let allow_list: Vec<IpAddr> = env::var("WEBHOOK_ALLOW_LIST")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|s| match s.trim().parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!("Ignoring unparseable allow-list entry: {}", s.trim());
                    None
                }
            })
            .collect();

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "coachpay.db".to_string()),
            dev_mode,

            paymob_hmac_key: env::var("PAYMOB_HMAC_KEY").unwrap_or_default(),
            paypal_client_id: env::var("PAYPAL_CLIENT_ID").unwrap_or_default(),
            paypal_client_secret: env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default(),
            paypal_webhook_id: env::var("PAYPAL_WEBHOOK_ID").unwrap_or_default(),
            paypal_api_base: env::var("PAYPAL_API_BASE")
                .unwrap_or_else(|_| "https://api-m.paypal.com".to_string()),
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),

            rate_limit_rpm: env::var("RATE_LIMIT_RPM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            allow_list_enabled,
            allow_list,

            commission_percent: env::var("COMMISSION_PERCENT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),

            resend_api_key: env::var("RESEND_API_KEY").ok(),
            resend_api_url: env::var("RESEND_API_URL")
                .unwrap_or_else(|_| DEFAULT_RESEND_API_URL.to_string()),
            email_webhook_url: env::var("EMAIL_WEBHOOK_URL").ok(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Coachpay <no-reply@coachpay.local>".to_string()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
