// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::models::{FieldRow, FormRow};
use crate::db::{now, SqlStore};

/// Compact description of a field fixture with a pre-resolved column
/// identifier.
pub struct TestField {
    pub id: String,
    pub column_name: String,
    pub field_type: String,
}

impl TestField {
    pub fn new(id: &str, column_name: &str, field_type: &str) -> Self {
        Self {
            id: id.to_owned(),
            column_name: column_name.to_owned(),
            field_type: field_type.to_owned(),
        }
    }

    /// Appends this field to an existing form's metadata.
    pub async fn insert(&self, store: &SqlStore, form_id: &str) {
        let position = store
            .get_fields(form_id)
            .await
            .expect("Read fields of test form")
            .len() as i64;

        store
            .insert_field(&self.row(form_id, position))
            .await
            .expect("Insert test field");
    }

    fn row(&self, form_id: &str, position: i64) -> FieldRow {
        FieldRow {
            id: self.id.clone(),
            form_id: form_id.to_owned(),
            title: self.column_name.clone(),
            field_type: self.field_type.clone(),
            column_name: Some(self.column_name.clone()),
            required: 0,
            position,
            options: None,
            created_at: now(),
            updated_at: now(),
        }
    }
}

/// Inserts a bare form without fields or a resolved table identifier.
pub async fn insert_test_form(store: &SqlStore, form_id: &str) {
    let form = form_row(form_id, None);
    store
        .insert_form_with_fields(&form, &[])
        .await
        .expect("Insert test form");
}

/// Inserts an active form with a resolved table identifier and field rows.
///
/// Metadata only, the materialized table is created by reconciliation.
pub async fn insert_test_form_with_fields(
    store: &SqlStore,
    form_id: &str,
    table_name: &str,
    fields: &[TestField],
) {
    let form = form_row(form_id, Some(table_name));
    let rows: Vec<FieldRow> = fields
        .iter()
        .enumerate()
        .map(|(position, field)| field.row(form_id, position as i64))
        .collect();

    store
        .insert_form_with_fields(&form, &rows)
        .await
        .expect("Insert test form with fields");
}

fn form_row(form_id: &str, table_name: Option<&str>) -> FormRow {
    FormRow {
        id: form_id.to_owned(),
        title: format!("Test form {}", form_id),
        table_name: table_name.map(|table_name| table_name.to_owned()),
        parent_form_id: None,
        owner_id: "user-test".to_owned(),
        position: 0,
        is_active: i64::from(table_name.is_some()),
        created_at: now(),
        updated_at: now(),
    }
}
