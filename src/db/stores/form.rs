// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::{query, query_as, query_scalar};

use crate::db::errors::FormStorageError;
use crate::db::models::{FieldRow, FormRow};
use crate::db::{now, SqlStore};

/// Form and field metadata storage.
///
/// All writes here touch metadata rows only. Structural (DDL) work against
/// the materialized tables always runs in separate transactions, committed
/// apart from these, so metadata row locks and table locks are never held
/// at the same time.
impl SqlStore {
    /// Inserts a form together with its field rows in one transaction.
    pub async fn insert_form_with_fields(
        &self,
        form: &FormRow,
        fields: &[FieldRow],
    ) -> Result<(), FormStorageError> {
        let duplicate: Option<String> = query_scalar(
            "
            SELECT
                id
            FROM
                forms
            WHERE
                title = $1
            ",
        )
        .bind(&form.title)
        .fetch_optional(&self.pool)
        .await?;

        if duplicate.is_some() {
            return Err(FormStorageError::DuplicateTitle(form.title.clone()));
        }

        let mut tx = self.pool.begin().await?;

        query(
            "
            INSERT INTO
                forms (
                    id,
                    title,
                    table_name,
                    parent_form_id,
                    owner_id,
                    position,
                    is_active,
                    created_at,
                    updated_at
                )
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(&form.id)
        .bind(&form.title)
        .bind(&form.table_name)
        .bind(&form.parent_form_id)
        .bind(&form.owner_id)
        .bind(form.position)
        .bind(form.is_active)
        .bind(form.created_at)
        .bind(form.updated_at)
        .execute(&mut tx)
        .await?;

        for field in fields {
            query(
                "
                INSERT INTO
                    form_fields (
                        id,
                        form_id,
                        title,
                        field_type,
                        column_name,
                        required,
                        position,
                        options,
                        created_at,
                        updated_at
                    )
                VALUES
                    ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(&field.id)
            .bind(&field.form_id)
            .bind(&field.title)
            .bind(&field.field_type)
            .bind(&field.column_name)
            .bind(field.required)
            .bind(field.position)
            .bind(&field.options)
            .bind(field.created_at)
            .bind(field.updated_at)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Returns a form row by id.
    pub async fn get_form(&self, form_id: &str) -> Result<Option<FormRow>, FormStorageError> {
        let form = query_as::<_, FormRow>(
            "
            SELECT
                id,
                title,
                table_name,
                parent_form_id,
                owner_id,
                position,
                is_active,
                created_at,
                updated_at
            FROM
                forms
            WHERE
                id = $1
            ",
        )
        .bind(form_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(form)
    }

    /// Returns the sub-forms of a form, ordered by position.
    pub async fn get_sub_forms(&self, form_id: &str) -> Result<Vec<FormRow>, FormStorageError> {
        let forms = query_as::<_, FormRow>(
            "
            SELECT
                id,
                title,
                table_name,
                parent_form_id,
                owner_id,
                position,
                is_active,
                created_at,
                updated_at
            FROM
                forms
            WHERE
                parent_form_id = $1
            ORDER BY
                position ASC
            ",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(forms)
    }

    /// Persists the resolved table identifier and activates the form.
    pub async fn update_form_table_name(
        &self,
        form_id: &str,
        table_name: &str,
    ) -> Result<(), FormStorageError> {
        query(
            "
            UPDATE
                forms
            SET
                table_name = $2,
                is_active = 1,
                updated_at = $3
            WHERE
                id = $1
            ",
        )
        .bind(form_id)
        .bind(table_name)
        .bind(now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a form row, field rows and sub-form rows cascade away.
    pub async fn delete_form(&self, form_id: &str) -> Result<(), FormStorageError> {
        query(
            "
            DELETE FROM
                forms
            WHERE
                id = $1
            ",
        )
        .bind(form_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts one field row.
    pub async fn insert_field(&self, field: &FieldRow) -> Result<(), FormStorageError> {
        query(
            "
            INSERT INTO
                form_fields (
                    id,
                    form_id,
                    title,
                    field_type,
                    column_name,
                    required,
                    position,
                    options,
                    created_at,
                    updated_at
                )
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(&field.id)
        .bind(&field.form_id)
        .bind(&field.title)
        .bind(&field.field_type)
        .bind(&field.column_name)
        .bind(field.required)
        .bind(field.position)
        .bind(&field.options)
        .bind(field.created_at)
        .bind(field.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns a field row by id.
    pub async fn get_field(&self, field_id: &str) -> Result<Option<FieldRow>, FormStorageError> {
        let field = query_as::<_, FieldRow>(
            "
            SELECT
                id,
                form_id,
                title,
                field_type,
                column_name,
                required,
                position,
                options,
                created_at,
                updated_at
            FROM
                form_fields
            WHERE
                id = $1
            ",
        )
        .bind(field_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(field)
    }

    /// Returns the fields of a form, ordered by position.
    pub async fn get_fields(&self, form_id: &str) -> Result<Vec<FieldRow>, FormStorageError> {
        let fields = query_as::<_, FieldRow>(
            "
            SELECT
                id,
                form_id,
                title,
                field_type,
                column_name,
                required,
                position,
                options,
                created_at,
                updated_at
            FROM
                form_fields
            WHERE
                form_id = $1
            ORDER BY
                position ASC
            ",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fields)
    }

    /// Updates the declared type of a field.
    pub async fn update_field_type(
        &self,
        field_id: &str,
        field_type: &str,
    ) -> Result<(), FormStorageError> {
        query(
            "
            UPDATE
                form_fields
            SET
                field_type = $2,
                updated_at = $3
            WHERE
                id = $1
            ",
        )
        .bind(field_id)
        .bind(field_type)
        .bind(now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes one field row.
    pub async fn delete_field(&self, field_id: &str) -> Result<(), FormStorageError> {
        query(
            "
            DELETE FROM
                form_fields
            WHERE
                id = $1
            ",
        )
        .bind(field_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Column identifiers already taken within a form, the collision scope
    /// for new column names.
    pub async fn existing_column_names(
        &self,
        form_id: &str,
    ) -> Result<Vec<String>, FormStorageError> {
        let names: Vec<Option<String>> = query_scalar(
            "
            SELECT
                column_name
            FROM
                form_fields
            WHERE
                form_id = $1
            ",
        )
        .bind(form_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().flatten().collect())
    }

    /// Table identifiers already taken across the whole schema, the
    /// collision scope for new table names.
    pub async fn existing_table_names(&self) -> Result<Vec<String>, FormStorageError> {
        let names: Vec<Option<String>> = query_scalar(
            "
            SELECT
                table_name
            FROM
                forms
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(names.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::errors::FormStorageError;
    use crate::db::models::{FieldRow, FormRow};
    use crate::db::{now, DatabaseKind, SqlStore};
    use crate::test_utils::initialize_db;

    fn form_row(id: &str, title: &str) -> FormRow {
        FormRow {
            id: id.into(),
            title: title.into(),
            table_name: None,
            parent_form_id: None,
            owner_id: "user-1".into(),
            position: 0,
            is_active: 0,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn field_row(id: &str, form_id: &str, column_name: &str) -> FieldRow {
        FieldRow {
            id: id.into(),
            form_id: form_id.into(),
            title: "Field".into(),
            field_type: "short_answer".into(),
            column_name: Some(column_name.into()),
            required: 0,
            position: 0,
            options: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[tokio::test]
    async fn inserts_and_reads_forms_with_fields() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        let form = form_row("form-1", "Patients");
        let fields = vec![
            field_row("field-1", "form-1", "name_ab12"),
            field_row("field-2", "form-1", "age_cd34"),
        ];

        store.insert_form_with_fields(&form, &fields).await.unwrap();

        let loaded = store.get_form("form-1").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Patients");

        let loaded_fields = store.get_fields("form-1").await.unwrap();
        assert_eq!(loaded_fields.len(), 2);

        let columns = store.existing_column_names("form-1").await.unwrap();
        assert_eq!(columns.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_titles_are_rejected() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        store
            .insert_form_with_fields(&form_row("form-1", "Patients"), &[])
            .await
            .unwrap();

        let result = store
            .insert_form_with_fields(&form_row("form-2", "Patients"), &[])
            .await;

        assert!(matches!(result, Err(FormStorageError::DuplicateTitle(_))));
    }

    #[tokio::test]
    async fn deleting_a_form_cascades_to_fields() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        let form = form_row("form-1", "Patients");
        let fields = vec![field_row("field-1", "form-1", "name_ab12")];
        store.insert_form_with_fields(&form, &fields).await.unwrap();

        store.delete_form("form-1").await.unwrap();

        assert!(store.get_form("form-1").await.unwrap().is_none());
        assert!(store.get_fields("form-1").await.unwrap().is_empty());
    }
}
