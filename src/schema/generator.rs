// SPDX-License-Identifier: AGPL-3.0-or-later

use std::str::FromStr;

use crate::db::models::{FieldRow, FormRow};
use crate::definition::FieldType;
use crate::identifier::MAX_IDENTIFIER_LENGTH;
use crate::schema::{ColumnSpec, IndexSpec, SchemaError, TableDesign};

/// Columns every materialized table carries besides the field columns.
///
/// The migration engine skips these when diffing live structure against the
/// field set.
pub const SYSTEM_COLUMNS: &[&str] = &[
    "id",
    "form_id",
    "submitted_by",
    "parent_id",
    "root_id",
    "created_at",
    "updated_at",
];

/// Maps a form and its fields to a complete table design.
///
/// For sub-forms `parent_table` names the parent's materialized table, the
/// design then carries the immediate-parent foreign key and the duplicated
/// root reference used for fast filtering. Duplicate field titles are fine,
/// column identifiers were disambiguated at definition time.
pub fn design(
    form: &FormRow,
    fields: &[FieldRow],
    parent_table: Option<&str>,
) -> Result<TableDesign, SchemaError> {
    let table_name = form
        .table_name
        .clone()
        .ok_or_else(|| SchemaError::MissingTableName(form.id.clone()))?;

    let mut columns = vec![
        ColumnSpec::new("id", "TEXT").primary_key(),
        ColumnSpec::new("form_id", "TEXT").not_null(),
        ColumnSpec::new("submitted_by", "TEXT").not_null(),
    ];

    if let Some(parent) = parent_table {
        columns.push(ColumnSpec::new("parent_id", "TEXT").references(parent, "id"));
        // Root reference duplicates the parent link on purpose, queries over
        // deep nestings filter on it without joining through every level.
        columns.push(ColumnSpec::new("root_id", "TEXT").references(parent, "id"));
    }

    for field in fields {
        let column_name = field
            .column_name
            .clone()
            .ok_or_else(|| SchemaError::UnresolvedColumn {
                field_id: field.id.clone(),
                title: field.title.clone(),
            })?;

        let field_type = FieldType::from_str(&field.field_type).map_err(|_| {
            SchemaError::UnknownFieldType {
                field_id: field.id.clone(),
                title: field.title.clone(),
                field_type: field.field_type.clone(),
            }
        })?;

        columns.push(ColumnSpec::new(&column_name, field_type.sql_type()));
    }

    // Metadata columns come last.
    columns.push(ColumnSpec::new("created_at", "INTEGER").not_null());
    columns.push(ColumnSpec::new("updated_at", "INTEGER").not_null());

    let mut indexes = vec![
        index_spec(&table_name, "form_id"),
        index_spec(&table_name, "submitted_by"),
    ];

    if parent_table.is_some() {
        indexes.push(index_spec(&table_name, "parent_id"));
        indexes.push(index_spec(&table_name, "root_id"));
    }

    Ok(TableDesign {
        table_name,
        columns,
        indexes,
    })
}

/// Builds the index identifier for a column, bounded like any other
/// identifier.
fn index_spec(table_name: &str, column: &str) -> IndexSpec {
    let mut name = format!("idx_{}_{}", table_name, column);
    name.truncate(MAX_IDENTIFIER_LENGTH);

    IndexSpec {
        name,
        column: column.to_owned(),
    }
}
