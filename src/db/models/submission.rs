// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::FromRow;

/// A struct representing a canonical submission head row in the database.
#[derive(FromRow, Debug, Clone)]
pub struct SubmissionRow {
    /// Stable id of this submission, doubles as the primary key of the
    /// materialized row.
    pub id: String,

    /// Id of the form this submission belongs to.
    pub form_id: String,

    /// Id of the immediate parent submission for sub-form rows.
    pub parent_submission_id: Option<String>,

    /// Id of the top-level submission for sub-form rows, equal to
    /// `parent_submission_id` for directly nested sub-forms.
    pub root_submission_id: Option<String>,

    /// Id of the submitting user.
    pub submitted_by: String,

    /// Creation timestamp in Unix seconds.
    pub created_at: i64,

    /// Last update timestamp in Unix seconds.
    pub updated_at: i64,
}

/// A struct representing one generic field value row in the database.
#[derive(FromRow, Debug, Clone)]
pub struct SubmissionValueRow {
    /// Id of the owning submission.
    pub submission_id: String,

    /// Id of the field this value belongs to.
    pub field_id: String,

    /// Value serialized to text, `NULL` for explicit null values.
    pub value: Option<String>,

    /// Kind tag of the value ("text", "integer", "number", "bool", "null").
    pub value_kind: String,

    /// Whether the value-store layer holds this value encrypted.
    pub is_encrypted: i64,
}
