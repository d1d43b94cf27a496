// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::VecDeque;

use log::{debug, info};

use crate::context::Context;
use crate::db::models::{FieldRow, FormRow};
use crate::db::now;
use crate::definition::{FieldDefinition, FieldType, FormDefinition};
use crate::forms::FormError;
use crate::identifier::{to_identifier, IdentifierKind};
use crate::migration::reconcile;
use crate::translation::Translator;

/// Entry point for form lifecycle operations.
///
/// Creation stores metadata only, `activate` resolves the table identifier
/// and materializes the physical table. Field operations commit their
/// metadata change first and reconcile the live table afterwards, holding
/// the form's advisory lock across both steps so concurrent structural
/// changes to one form serialize while distinct forms proceed in
/// parallel. The form row is always read under the lock, an edit racing
/// an activation sees the assigned table name.
#[derive(Clone, Debug)]
pub struct FormService {
    context: Context,
    translator: Translator,
}

impl FormService {
    pub fn new(context: Context) -> Self {
        let translator = Translator::new(
            context.store.clone(),
            context.config.translation.clone(),
        );

        Self { context, translator }
    }

    /// Stores a form definition and all nested sub-forms as metadata.
    ///
    /// Column identifiers are resolved here, once, and never change
    /// afterwards. No physical table exists until the form is activated.
    pub async fn create_form(&self, definition: &FormDefinition) -> Result<(), FormError> {
        let mut pending: Vec<(FormDefinition, Option<String>, i64)> =
            vec![(definition.clone(), None, 0)];

        while let Some((form, parent_form_id, position)) = pending.pop() {
            let mut fields = Vec::with_capacity(form.fields.len());
            let mut taken: Vec<String> = Vec::new();

            for (index, field) in form.fields.iter().enumerate() {
                let column_name = self.resolve_column_name(field, &taken).await;
                taken.push(column_name.clone());
                fields.push(field_row(field, &form.id, &column_name, index as i64));
            }

            let row = FormRow {
                id: form.id.clone(),
                title: form.title.clone(),
                table_name: None,
                parent_form_id: parent_form_id.clone(),
                owner_id: form.owner_id.clone(),
                position,
                is_active: 0,
                created_at: now(),
                updated_at: now(),
            };

            self.context.store.insert_form_with_fields(&row, &fields).await?;
            info!("Created form {} '{}'", form.id, form.title);

            for (index, sub_form) in form.sub_forms.iter().enumerate() {
                pending.push((sub_form.clone(), Some(form.id.clone()), index as i64));
            }
        }

        Ok(())
    }

    /// Activates a form and all of its sub-forms.
    ///
    /// Resolves the table identifier from the form title, commits it to the
    /// metadata and creates the materialized table. Parents come before
    /// their sub-forms so the cascading foreign keys always find their
    /// target.
    pub async fn activate(&self, form_id: &str) -> Result<(), FormError> {
        let mut queue = VecDeque::from(vec![form_id.to_owned()]);

        while let Some(current_id) = queue.pop_front() {
            let _guard = self.context.locks.acquire(&current_id).await;

            let form = self
                .context
                .store
                .get_form(&current_id)
                .await?
                .ok_or_else(|| FormError::FormNotFound(current_id.clone()))?;

            let table_name = match form.table_name {
                Some(table_name) => table_name,
                None => {
                    let resolution = self.translator.resolve(&form.title).await;
                    let existing = self.context.store.existing_table_names().await?;
                    let table_name = to_identifier(
                        &resolution.english,
                        &form.id,
                        IdentifierKind::Table,
                        &existing,
                    );

                    // Committed before any DDL runs, an interrupted
                    // activation resumes with the same identifier.
                    self.context
                        .store
                        .update_form_table_name(&current_id, &table_name)
                        .await?;
                    table_name
                }
            };

            reconcile(
                &self.context.store,
                &current_id,
                self.context.config.backup_retention_days,
            )
            .await?;
            drop(_guard);
            info!("Activated form {} as table '{}'", current_id, table_name);

            for sub_form in self.context.store.get_sub_forms(&current_id).await? {
                queue.push_back(sub_form.id);
            }
        }

        Ok(())
    }

    /// Appends a field to a form, returning the resolved column identifier.
    ///
    /// For active forms the live table gains the column within this call.
    pub async fn add_field(
        &self,
        form_id: &str,
        definition: &FieldDefinition,
    ) -> Result<String, FormError> {
        // Identifier resolution reads the taken names and the insert writes
        // a new one, both under the lock so concurrent adds to the same
        // form cannot race into one identifier. The form row is read after
        // the lock is held, an activation finishing just before this call
        // already shows its table name here.
        let _guard = self.context.locks.acquire(form_id).await;

        let form = self
            .context
            .store
            .get_form(form_id)
            .await?
            .ok_or_else(|| FormError::FormNotFound(form_id.to_owned()))?;

        let taken = self.context.store.existing_column_names(form_id).await?;
        let column_name = self.resolve_column_name(definition, &taken).await;

        let position = self.context.store.get_fields(form_id).await?.len() as i64;
        let row = field_row(definition, form_id, &column_name, position);
        self.context.store.insert_field(&row).await?;
        debug!(
            "Added field {} '{}' to form {} as column '{}'",
            definition.id, definition.title, form_id, column_name
        );

        if form.table_name.is_some() {
            reconcile(
                &self.context.store,
                form_id,
                self.context.config.backup_retention_days,
            )
            .await?;
        }

        Ok(column_name)
    }

    /// Changes a field's declared type.
    ///
    /// On an active form the existing column data is backed up and the
    /// column retyped in place, the column identifier stays stable.
    pub async fn update_field_type(
        &self,
        field_id: &str,
        field_type: FieldType,
    ) -> Result<(), FormError> {
        let field = self
            .context
            .store
            .get_field(field_id)
            .await?
            .ok_or_else(|| FormError::FieldNotFound(field_id.to_owned()))?;

        let _guard = self.context.locks.acquire(&field.form_id).await;

        let form = self
            .context
            .store
            .get_form(&field.form_id)
            .await?
            .ok_or_else(|| FormError::FormNotFound(field.form_id.clone()))?;

        self.context
            .store
            .update_field_type(field_id, &field_type.to_string())
            .await?;

        if form.table_name.is_some() {
            reconcile(
                &self.context.store,
                &form.id,
                self.context.config.backup_retention_days,
            )
            .await?;
        }

        Ok(())
    }

    /// Removes a field from a form.
    ///
    /// On an active form the column's data is backed up before the column
    /// is dropped.
    pub async fn remove_field(&self, field_id: &str) -> Result<(), FormError> {
        let field = self
            .context
            .store
            .get_field(field_id)
            .await?
            .ok_or_else(|| FormError::FieldNotFound(field_id.to_owned()))?;

        let _guard = self.context.locks.acquire(&field.form_id).await;

        let form = self
            .context
            .store
            .get_form(&field.form_id)
            .await?
            .ok_or_else(|| FormError::FormNotFound(field.form_id.clone()))?;

        self.context.store.delete_field(field_id).await?;

        if form.table_name.is_some() {
            reconcile(
                &self.context.store,
                &form.id,
                self.context.config.backup_retention_days,
            )
            .await?;
        }

        Ok(())
    }

    /// Deletes a form, its sub-forms, all metadata and all materialized
    /// tables.
    ///
    /// Sub-form tables reference their parent's table, they are dropped
    /// first. The metadata rows go last, in one cascading delete.
    pub async fn delete_form(&self, form_id: &str) -> Result<(), FormError> {
        let root = self
            .context
            .store
            .get_form(form_id)
            .await?
            .ok_or_else(|| FormError::FormNotFound(form_id.to_owned()))?;

        // Collect the whole tree, then walk it children-first.
        let mut tree = vec![root];
        let mut index = 0;
        while index < tree.len() {
            let sub_forms = self.context.store.get_sub_forms(&tree[index].id).await?;
            tree.extend(sub_forms);
            index += 1;
        }

        for form in tree.iter().rev() {
            if let Some(table_name) = &form.table_name {
                let _guard = self.context.locks.acquire(&form.id).await;
                self.context
                    .store
                    .execute_ddl(&format!("DROP TABLE IF EXISTS {}", table_name))
                    .await?;
                self.context.store.remove_materialized_table(&form.id).await?;
                info!("Dropped table '{}' of form {}", table_name, form.id);
            }
        }

        self.context.store.delete_form(form_id).await?;
        info!("Deleted form {}", form_id);

        Ok(())
    }

    async fn resolve_column_name(&self, field: &FieldDefinition, taken: &[String]) -> String {
        let resolution = self.translator.resolve(&field.title).await;
        to_identifier(
            &resolution.english,
            &field.id,
            IdentifierKind::Column,
            taken,
        )
    }
}

fn field_row(
    definition: &FieldDefinition,
    form_id: &str,
    column_name: &str,
    position: i64,
) -> FieldRow {
    FieldRow {
        id: definition.id.clone(),
        form_id: form_id.to_owned(),
        title: definition.title.clone(),
        field_type: definition.field_type.to_string(),
        column_name: Some(column_name.to_owned()),
        required: i64::from(definition.required),
        position,
        options: definition.options.as_ref().map(|options| options.to_string()),
        created_at: now(),
        updated_at: now(),
    }
}
