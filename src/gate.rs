//! Rate/access gate for the webhook endpoints.
//!
//! Every inbound webhook request passes through here before any parsing or
//! verification. Two checks, in order:
//! 1. optional allow list (403 when enabled and the source is not listed)
//! 2. per-address sliding window (429 beyond the configured requests/minute)
//!
//! The window state is sharded by address hash so unrelated senders never
//! contend on the same lock. Stale entries are evicted lazily on each check.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::db::AppState;
use crate::webhooks::WebhookReply;

const SHARD_COUNT: usize = 16;
const WINDOW: Duration = Duration::from_secs(60);

/// Once a shard map grows past this, stale windows for other addresses are
/// swept during the check instead of waiting for their next request.
const SWEEP_THRESHOLD: usize = 1024;

/// Gate decision for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admit {
    Allowed,
    RateLimited,
    NotAllowListed,
}

impl Admit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allow",
            Self::RateLimited => "rate_limited",
            Self::NotAllowListed => "not_allow_listed",
        }
    }
}

pub struct RateGate {
    max_per_window: u32,
    allow_list_enabled: bool,
    allow_list: HashSet<IpAddr>,
    shards: Vec<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
}

impl RateGate {
    pub fn new(max_per_window: u32, allow_list_enabled: bool, allow_list: &[IpAddr]) -> Self {
        if allow_list_enabled && allow_list.is_empty() {
            tracing::warn!(
                "Webhook allow list enabled with an empty address set; all requests will be rejected"
            );
        }
        Self {
            max_per_window,
            allow_list_enabled,
            allow_list: allow_list.iter().copied().collect(),
            shards: (0..SHARD_COUNT)
                .map(|_| Mutex::new(HashMap::new()))
                .collect(),
        }
    }

    pub fn admit(&self, addr: IpAddr) -> Admit {
        self.admit_at(addr, Instant::now())
    }

    /// Same as [`admit`](Self::admit) with an injectable clock for tests.
    pub fn admit_at(&self, addr: IpAddr, now: Instant) -> Admit {
        if self.allow_list_enabled && !self.allow_list.contains(&addr) {
            return Admit::NotAllowListed;
        }

        // A zero limit is a misconfiguration; reject rather than disable.
        if self.max_per_window == 0 {
            return Admit::RateLimited;
        }

        let shard = &self.shards[self.shard_for(addr)];
        // A poisoned shard only means another request panicked mid-check;
        // the window data is still usable.
        let mut map = shard.lock().unwrap_or_else(|e| e.into_inner());

        if map.len() > SWEEP_THRESHOLD {
            map.retain(|_, w| w.back().is_some_and(|t| now.duration_since(*t) < WINDOW));
        }

        let window = map.entry(addr).or_default();
        while let Some(front) = window.front() {
            if now.duration_since(*front) >= WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() as u32 >= self.max_per_window {
            Admit::RateLimited
        } else {
            window.push_back(now);
            Admit::Allowed
        }
    }

    fn shard_for(&self, addr: IpAddr) -> usize {
        let mut hasher = DefaultHasher::new();
        addr.hash(&mut hasher);
        hasher.finish() as usize % SHARD_COUNT
    }
}

/// Axum middleware applying the gate to every webhook route, with one audit
/// log line per decision.
pub async fn gate_middleware(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let decision = state.gate.admit(peer.ip());

    tracing::info!(
        method = %method,
        path = %path,
        source = %peer.ip(),
        outcome = decision.as_str(),
        "webhook gate decision"
    );

    match decision {
        Admit::Allowed => next.run(req).await,
        Admit::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(WebhookReply::rejected("rate limit exceeded")),
        )
            .into_response(),
        Admit::NotAllowListed => (
            StatusCode::FORBIDDEN,
            Json(WebhookReply::rejected("source address not allowed")),
        )
            .into_response(),
    }
}
