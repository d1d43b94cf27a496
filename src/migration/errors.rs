// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::errors::{BackupStorageError, FormStorageError, MaterializedStorageError};
use crate::schema::SchemaError;

/// Errors surfaced by a reconciliation run.
///
/// The canonical record store is never touched by migrations, whatever
/// fails here leaves it authoritative and unaffected.
#[derive(thiserror::Error, Debug)]
pub enum MigrationError {
    /// The form to reconcile does not exist.
    #[error("Form with id {0} not found in storage")]
    FormNotFound(String),

    /// The form definition could not be mapped to a table design.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A structural statement was rejected because existing column data is
    /// incompatible with the requested change. Names the offending field so
    /// the form author can act on it.
    #[error("Cannot change column '{column}' of field '{field}': {reason}")]
    IncompatibleData {
        /// Human-language title of the offending field.
        field: String,

        /// Column identifier the change was attempted on.
        column: String,

        /// Engine-reported reason.
        reason: String,
    },

    /// Error while reading form metadata.
    #[error(transparent)]
    Metadata(#[from] FormStorageError),

    /// Error while executing structural statements or introspecting.
    #[error(transparent)]
    Materialized(#[from] MaterializedStorageError),

    /// Error while writing the pre-change data backup.
    #[error(transparent)]
    Backup(#[from] BackupStorageError),
}
