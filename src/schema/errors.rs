// SPDX-License-Identifier: AGPL-3.0-or-later

/// Errors which can occur when mapping a form definition to a table design.
#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    /// The form has not been assigned a table identifier yet.
    #[error("Form {0} has no resolved table name")]
    MissingTableName(String),

    /// A field is missing its persisted column identifier.
    #[error("Field '{title}' ({field_id}) has no resolved column name")]
    UnresolvedColumn {
        /// Id of the offending field.
        field_id: String,

        /// Human-language title of the offending field.
        title: String,
    },

    /// A field row carries a type string outside the closed set.
    #[error("Field '{title}' ({field_id}) has unknown type '{field_type}'")]
    UnknownFieldType {
        /// Id of the offending field.
        field_id: String,

        /// Human-language title of the offending field.
        title: String,

        /// The unrecognized type tag.
        field_type: String,
    },
}
