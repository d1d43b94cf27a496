// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::{connection_pool, run_pending_migrations, Pool};

/// Returns a pool connected to a fresh in-memory database with all
/// migrations applied.
///
/// The pool is limited to one connection, every connection to
/// `sqlite::memory:` opens its own separate database.
pub async fn initialize_db() -> Pool {
    let _ = env_logger::builder().is_test(true).try_init();

    let pool = connection_pool("sqlite::memory:", 1)
        .await
        .expect("Connect to in-memory database");
    run_pending_migrations(&pool)
        .await
        .expect("Apply database migrations");

    pool
}
