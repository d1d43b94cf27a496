// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::FromRow;

/// A struct representing one persistent translation cache row.
#[derive(FromRow, Debug, Clone)]
pub struct TranslationCacheRow {
    /// Normalized source phrase, primary key of the cache.
    pub source_phrase: String,

    /// Resolved ASCII/English phrase.
    pub resolved_phrase: String,

    /// Which tier produced the resolution ("dictionary", "service",
    /// "fallback").
    pub origin: String,

    /// Quality class of the resolution ("exact", "machine",
    /// "transliterated").
    pub quality: String,

    /// Number of times this entry has been served.
    pub usage_count: i64,

    /// Timestamp of the last hit in Unix seconds.
    pub last_used_at: i64,

    /// Creation timestamp in Unix seconds.
    pub created_at: i64,
}
