// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::FromRow;

/// A struct representing one pre-migration column backup row.
#[derive(FromRow, Debug, Clone)]
pub struct FieldDataBackupRow {
    /// Id of this backup.
    pub id: String,

    /// Id of the form whose table was changed.
    pub form_id: String,

    /// Id of the field whose column was backed up.
    pub field_id: String,

    /// Identifier of the physical table the data was copied from.
    pub table_name: String,

    /// Identifier of the backed up column.
    pub column_name: String,

    /// Why the backup was taken ("drop_column", "alter_type").
    pub reason: String,

    /// Number of row snapshots contained in `data`.
    pub row_count: i64,

    /// JSON array of `{ "row_id": .., "value": .. }` snapshots.
    pub data: String,

    /// Deadline in Unix seconds after which the retention job may purge
    /// this backup.
    pub retain_until: i64,

    /// Creation timestamp in Unix seconds.
    pub created_at: i64,
}
