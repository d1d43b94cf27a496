// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::{query, query_as};

use crate::db::errors::BackupStorageError;
use crate::db::models::FieldDataBackupRow;
use crate::db::{now, SqlStore};

/// Storage of pre-migration column backups.
impl SqlStore {
    /// Inserts one backup row.
    pub async fn insert_backup(
        &self,
        backup: &FieldDataBackupRow,
    ) -> Result<(), BackupStorageError> {
        query(
            "
            INSERT INTO
                field_data_backups (
                    id,
                    form_id,
                    field_id,
                    table_name,
                    column_name,
                    reason,
                    row_count,
                    data,
                    retain_until,
                    created_at
                )
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(&backup.id)
        .bind(&backup.form_id)
        .bind(&backup.field_id)
        .bind(&backup.table_name)
        .bind(&backup.column_name)
        .bind(&backup.reason)
        .bind(backup.row_count)
        .bind(&backup.data)
        .bind(backup.retain_until)
        .bind(backup.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns all backups taken for a field, newest first. Consumed by the
    /// administrative rollback tooling.
    pub async fn get_backups_for_field(
        &self,
        field_id: &str,
    ) -> Result<Vec<FieldDataBackupRow>, BackupStorageError> {
        let rows = query_as::<_, FieldDataBackupRow>(
            "
            SELECT
                id,
                form_id,
                field_id,
                table_name,
                column_name,
                reason,
                row_count,
                data,
                retain_until,
                created_at
            FROM
                field_data_backups
            WHERE
                field_id = $1
            ORDER BY
                created_at DESC
            ",
        )
        .bind(field_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deletes one batch of expired backups, returning the number of rows
    /// removed. Callers loop until this returns zero, each batch commits on
    /// its own so no long-lived locks are held.
    pub async fn purge_expired_backups(
        &self,
        batch_size: u32,
    ) -> Result<u64, BackupStorageError> {
        let result = query(
            "
            DELETE FROM
                field_data_backups
            WHERE
                id IN (
                    SELECT
                        id
                    FROM
                        field_data_backups
                    WHERE
                        retain_until < $1
                    LIMIT $2
                )
            ",
        )
        .bind(now())
        .bind(i64::from(batch_size))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
