// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::errors::{FormStorageError, SubmissionStorageError};

/// Errors of the dual-write path.
#[derive(thiserror::Error, Debug)]
pub enum SubmissionError {
    /// The form being submitted to does not exist.
    #[error("Form with id {0} not found in storage")]
    FormNotFound(String),

    /// The submission to rematerialize does not exist.
    #[error("Submission with id {0} not found in storage")]
    SubmissionNotFound(String),

    /// The payload references a field id the form does not have.
    #[error("Form has no field with id {0}")]
    UnknownField(String),

    /// A required field is missing from the payload.
    #[error("Required field '{field}' has no value")]
    MissingRequiredValue {
        /// Human-language title of the missing field.
        field: String,
    },

    /// The canonical write succeeded but the materialized row could not be
    /// written. The canonical record stands, callers retry the physical
    /// side only via `rematerialize`.
    #[error("Submission {submission_id} is persisted canonically but needs rematerialization")]
    ReconciliationNeeded {
        /// Id of the affected submission.
        submission_id: String,
    },

    /// Error while writing or reading canonical records.
    #[error(transparent)]
    Storage(#[from] SubmissionStorageError),

    /// Error while reading form metadata.
    #[error(transparent)]
    Metadata(#[from] FormStorageError),

    /// Error while querying the materialized table.
    #[error(transparent)]
    Materialized(#[from] crate::db::errors::MaterializedStorageError),
}
