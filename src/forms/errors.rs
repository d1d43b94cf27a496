// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::errors::{FormStorageError, MaterializedStorageError};
use crate::migration::MigrationError;

/// `FormService` errors.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// Form with this id does not exist.
    #[error("Form {0} not found")]
    FormNotFound(String),

    /// Field with this id does not exist.
    #[error("Field {0} not found")]
    FieldNotFound(String),

    /// Error from the metadata storage layer.
    #[error(transparent)]
    Metadata(#[from] FormStorageError),

    /// Error while reconciling the materialized table.
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Error from the materialized storage layer.
    #[error(transparent)]
    Materialized(#[from] MaterializedStorageError),
}
