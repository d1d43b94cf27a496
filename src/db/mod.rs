// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent storage supporting both PostgreSQL and SQLite databases.
//!
//! The main interface is [`SqlStore`] which offers access to the system
//! tables (forms, fields, canonical submissions, translation cache, backups)
//! as well as the dynamically generated per-form tables.
use std::str::FromStr;

use anyhow::{anyhow, Error, Result};
use sqlx::any::{Any, AnyPool, AnyPoolOptions};
use sqlx::migrate;
use sqlx::migrate::MigrateDatabase;

pub mod errors;
pub mod models;
pub mod stores;

/// Re-export of generic connection pool type.
pub type Pool = AnyPool;

/// The flavour of relational engine behind the pool.
///
/// Needed where the two engines expose structure differently, most notably
/// catalog introspection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DatabaseKind {
    Postgres,
    Sqlite,
}

impl FromStr for DatabaseKind {
    type Err = Error;

    fn from_str(url: &str) -> Result<Self> {
        if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(DatabaseKind::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(DatabaseKind::Sqlite)
        } else {
            Err(anyhow!("Unsupported database url: {}", url))
        }
    }
}

/// SQL based persistent storage for form metadata, canonical records and the
/// materialized per-form tables.
#[derive(Clone, Debug)]
pub struct SqlStore {
    pub(crate) pool: Pool,
    pub(crate) kind: DatabaseKind,
}

impl SqlStore {
    /// Create a new `SqlStore` using the provided db `Pool`.
    pub fn new(pool: Pool, kind: DatabaseKind) -> Self {
        Self { pool, kind }
    }
}

/// Create database when not existing.
pub async fn create_database(url: &str) -> Result<()> {
    if !Any::database_exists(url).await? {
        Any::create_database(url).await?;
    }

    Ok(())
}

/// Create a database agnostic connection pool.
pub async fn connection_pool(url: &str, max_connections: u32) -> Result<Pool, Error> {
    let pool: Pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;

    Ok(pool)
}

/// Run any pending database migrations from inside the application.
pub async fn run_pending_migrations(pool: &Pool) -> Result<()> {
    migrate!().run(pool).await?;
    Ok(())
}

/// Random 128 bit hex identifier for engine-generated rows (backups).
pub(crate) fn random_id() -> String {
    use rand::Rng;

    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Seconds since the Unix epoch, used for all system-table timestamps.
pub(crate) fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}
