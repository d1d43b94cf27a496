// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::{query, query_as};

use crate::db::errors::SubmissionStorageError;
use crate::db::models::{SubmissionRow, SubmissionValueRow};
use crate::db::SqlStore;

/// Canonical submission storage.
///
/// The generic `(submission, field, value)` representation written here is
/// the source of truth. It commits in one transaction before any
/// materialized row is touched and is never rolled back because of a
/// failure in the physical table.
impl SqlStore {
    /// Writes the submission head and all field value rows in one
    /// transaction. Idempotent, re-running refreshes the same rows.
    pub async fn insert_canonical(
        &self,
        submission: &SubmissionRow,
        values: &[SubmissionValueRow],
    ) -> Result<(), SubmissionStorageError> {
        let mut tx = self.pool.begin().await?;

        query(
            "
            INSERT INTO
                submissions (
                    id,
                    form_id,
                    parent_submission_id,
                    root_submission_id,
                    submitted_by,
                    created_at,
                    updated_at
                )
            VALUES
                ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                parent_submission_id = excluded.parent_submission_id,
                root_submission_id = excluded.root_submission_id,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&submission.id)
        .bind(&submission.form_id)
        .bind(&submission.parent_submission_id)
        .bind(&submission.root_submission_id)
        .bind(&submission.submitted_by)
        .bind(submission.created_at)
        .bind(submission.updated_at)
        .execute(&mut tx)
        .await?;

        for value in values {
            query(
                "
                INSERT INTO
                    submission_values (
                        submission_id,
                        field_id,
                        value,
                        value_kind,
                        is_encrypted
                    )
                VALUES
                    ($1, $2, $3, $4, $5)
                ON CONFLICT (submission_id, field_id) DO UPDATE SET
                    value = excluded.value,
                    value_kind = excluded.value_kind,
                    is_encrypted = excluded.is_encrypted
                ",
            )
            .bind(&value.submission_id)
            .bind(&value.field_id)
            .bind(&value.value)
            .bind(&value.value_kind)
            .bind(value.is_encrypted)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Returns a submission head row by id.
    pub async fn get_submission(
        &self,
        submission_id: &str,
    ) -> Result<Option<SubmissionRow>, SubmissionStorageError> {
        let row = query_as::<_, SubmissionRow>(
            "
            SELECT
                id,
                form_id,
                parent_submission_id,
                root_submission_id,
                submitted_by,
                created_at,
                updated_at
            FROM
                submissions
            WHERE
                id = $1
            ",
        )
        .bind(submission_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns all canonical field values of a submission.
    pub async fn get_submission_values(
        &self,
        submission_id: &str,
    ) -> Result<Vec<SubmissionValueRow>, SubmissionStorageError> {
        let rows = query_as::<_, SubmissionValueRow>(
            "
            SELECT
                submission_id,
                field_id,
                value,
                value_kind,
                is_encrypted
            FROM
                submission_values
            WHERE
                submission_id = $1
            ",
        )
        .bind(submission_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
