mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::email::Mailer;
use crate::events::EventBus;
use crate::gate::RateGate;
use crate::gateways::Verifiers;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Sliding-window throttle + optional allow list, applied before handlers.
    pub gate: Arc<RateGate>,
    /// Admin notification bus (typed domain events, broadcast).
    pub bus: EventBus,
    pub mailer: Arc<Mailer>,
    /// Per-gateway authenticity checks.
    pub verifiers: Arc<Verifiers>,
    /// Platform commission percentage used for trainer payout computation.
    pub commission_percent: u32,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}

/// Single-connection in-memory pool for tests. Every `get()` returns the same
/// underlying database.
pub fn create_memory_pool() -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::memory();
    Pool::builder().max_size(1).build(manager)
}
