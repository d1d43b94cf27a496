// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::{query, query_as, query_scalar};

use crate::db::errors::TranslationStorageError;
use crate::db::models::TranslationCacheRow;
use crate::db::{now, SqlStore};

/// Persistent translation cache and the per-day external call counter.
///
/// All writes are idempotent upserts keyed by the source phrase so that
/// many concurrent resolutions of the same phrase converge on one row.
impl SqlStore {
    /// Looks up a cached translation, bumping the usage counters on a hit.
    pub async fn get_cached_translation(
        &self,
        source_phrase: &str,
    ) -> Result<Option<TranslationCacheRow>, TranslationStorageError> {
        let row = query_as::<_, TranslationCacheRow>(
            "
            SELECT
                source_phrase,
                resolved_phrase,
                origin,
                quality,
                usage_count,
                last_used_at,
                created_at
            FROM
                translation_cache
            WHERE
                source_phrase = $1
            ",
        )
        .bind(source_phrase)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            query(
                "
                UPDATE
                    translation_cache
                SET
                    usage_count = usage_count + 1,
                    last_used_at = $2
                WHERE
                    source_phrase = $1
                ",
            )
            .bind(source_phrase)
            .bind(now())
            .execute(&self.pool)
            .await?;
        }

        Ok(row)
    }

    /// Inserts or refreshes a cache entry for `source_phrase`.
    pub async fn upsert_translation(
        &self,
        source_phrase: &str,
        resolved_phrase: &str,
        origin: &str,
        quality: &str,
    ) -> Result<(), TranslationStorageError> {
        let timestamp = now();

        query(
            "
            INSERT INTO
                translation_cache (
                    source_phrase,
                    resolved_phrase,
                    origin,
                    quality,
                    usage_count,
                    last_used_at,
                    created_at
                )
            VALUES
                ($1, $2, $3, $4, 1, $5, $5)
            ON CONFLICT (source_phrase) DO UPDATE SET
                resolved_phrase = excluded.resolved_phrase,
                origin = excluded.origin,
                quality = excluded.quality,
                last_used_at = excluded.last_used_at
            ",
        )
        .bind(source_phrase)
        .bind(resolved_phrase)
        .bind(origin)
        .bind(quality)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically reserves one external translation call for the current
    /// UTC day. Returns `false` once `limit` calls have been reserved.
    pub async fn try_reserve_translation_call(
        &self,
        limit: u32,
    ) -> Result<bool, TranslationStorageError> {
        if limit == 0 {
            return Ok(false);
        }

        // Day number since the Unix epoch.
        let day = now() / 86_400;

        let result = query(
            "
            INSERT INTO
                translation_usage (day, api_calls)
            VALUES
                ($1, 1)
            ON CONFLICT (day) DO UPDATE SET
                api_calls = translation_usage.api_calls + 1
            WHERE
                translation_usage.api_calls < $2
            ",
        )
        .bind(day)
        .bind(i64::from(limit))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of external calls reserved today, used by tests and
    /// observability hooks.
    pub async fn translation_calls_today(&self) -> Result<i64, TranslationStorageError> {
        let day = now() / 86_400;

        let count: Option<i64> = query_scalar(
            "
            SELECT
                api_calls
            FROM
                translation_usage
            WHERE
                day = $1
            ",
        )
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(count.unwrap_or(0))
    }
}
