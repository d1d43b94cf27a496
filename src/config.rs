// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

/// Configuration object holding all important variables throughout the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// URL / connection string to PostgreSQL or SQLite database.
    pub database_url: String,

    /// Maximum number of connections that the database pool should maintain.
    ///
    /// Be mindful of the connection limits for the database as well as other
    /// applications which may want to connect to the same database.
    pub database_max_connections: u32,

    /// Number of concurrent workers which defines the maximum of
    /// reconciliation tasks which can be worked on simultaneously.
    pub worker_pool_size: u32,

    /// Translation service configuration.
    pub translation: TranslationConfiguration,

    /// Number of days a pre-migration column backup is retained before the
    /// cleanup job may purge it.
    pub backup_retention_days: u32,

    /// Number of backup rows deleted per committed batch by the cleanup job.
    ///
    /// Small batches keep the job from holding long-lived locks.
    pub backup_purge_batch_size: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            database_max_connections: 32,
            worker_pool_size: 16,
            translation: TranslationConfiguration::default(),
            backup_retention_days: 90,
            backup_purge_batch_size: 100,
        }
    }
}

/// Settings for the external machine-translation service.
///
/// The service is optional. When disabled (or unreachable) identifier
/// resolution falls back to the static dictionary, the persistent cache and
/// finally deterministic transliteration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfiguration {
    /// Base URL of the translation service, for example
    /// `http://localhost:5000`. Unset means the external tier is skipped.
    pub service_url: Option<String>,

    /// Timeout in seconds for one translation call. Kept in the single-digit
    /// range, definition-time resolution must never stall for long.
    pub timeout_seconds: u64,

    /// Maximum number of external calls per calendar day (UTC). Above the
    /// ceiling the translator goes straight to transliteration.
    pub daily_call_limit: u32,

    /// Source language code sent to the service.
    pub source_language: String,
}

impl Default for TranslationConfiguration {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout_seconds: 5,
            daily_call_limit: 1000,
            source_language: "th".into(),
        }
    }
}
