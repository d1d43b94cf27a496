// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::FromRow;

/// A struct representing a single form row in the database.
///
/// Sub-forms are stored in the same table with `parent_form_id` set.
#[derive(FromRow, Debug, Clone)]
pub struct FormRow {
    /// Id of this form.
    pub id: String,

    /// Human-language title of this form, unique system-wide.
    pub title: String,

    /// Resolved identifier of the materialized table, set once the form has
    /// been activated.
    pub table_name: Option<String>,

    /// Id of the owning parent form when this row is a sub-form.
    pub parent_form_id: Option<String>,

    /// Id of the user owning this form.
    pub owner_id: String,

    /// Ordering position among the parent's sub-forms.
    pub position: i64,

    /// Whether the form has been activated and materialized.
    pub is_active: i64,

    /// Creation timestamp in Unix seconds.
    pub created_at: i64,

    /// Last update timestamp in Unix seconds.
    pub updated_at: i64,
}

/// A struct representing a single form field row in the database.
#[derive(FromRow, Debug, Clone)]
pub struct FieldRow {
    /// Stable id of this field.
    pub id: String,

    /// Id of the form this field belongs to.
    pub form_id: String,

    /// Human-language title of this field.
    pub title: String,

    /// Declared field type as its canonical string representation.
    pub field_type: String,

    /// Resolved column identifier, persisted once at definition time.
    pub column_name: Option<String>,

    /// Whether a value is required on submission.
    pub required: i64,

    /// Ordering position within the form.
    pub position: i64,

    /// Per-type options as a JSON document.
    pub options: Option<String>,

    /// Creation timestamp in Unix seconds.
    pub created_at: i64,

    /// Last update timestamp in Unix seconds.
    pub updated_at: i64,
}

/// A struct representing one materialized table registry row.
#[derive(FromRow, Debug, Clone)]
pub struct MaterializedTableRow {
    /// Id of the form this table belongs to.
    pub form_id: String,

    /// Identifier of the physical table.
    pub table_name: String,

    /// Creation timestamp in Unix seconds.
    pub created_at: i64,

    /// Last update timestamp in Unix seconds.
    pub updated_at: i64,
}
