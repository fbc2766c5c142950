//! Persistence layer: current per-site status plus the append-only check
//! log.

pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{LibsqlStore, StatusStore};

use anyhow::Result;

/// Initialize database with schema.
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
