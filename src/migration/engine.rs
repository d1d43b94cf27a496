// SPDX-License-Identifier: AGPL-3.0-or-later

use log::{debug, info, warn};

use crate::db::models::{FieldDataBackupRow, FormRow};
use crate::db::{now, random_id, SqlStore};
use crate::identifier::MAX_IDENTIFIER_LENGTH;
use crate::migration::{plan, MigrationError, MigrationOp};
use crate::schema::{design, TableDesign};

/// Outcome of one reconciliation run.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    /// Whether the table was created from scratch in this run.
    pub created: bool,

    /// Structural operations applied, in order.
    pub operations: Vec<MigrationOp>,
}

/// Reconciles a form's materialized table with its current field
/// definitions.
///
/// Reads the committed metadata state, introspects the live table from the
/// engine catalog, applies the minimal set of structural changes and
/// refreshes the registry. Every statement runs in its own transaction and
/// re-checks the live state first, an interrupted run converges when
/// retried. Callers are expected to hold the form's advisory lock, this
/// function itself takes no locks.
pub async fn reconcile(
    store: &SqlStore,
    form_id: &str,
    backup_retention_days: u32,
) -> Result<AppliedMigration, MigrationError> {
    let form = store
        .get_form(form_id)
        .await?
        .ok_or_else(|| MigrationError::FormNotFound(form_id.to_owned()))?;

    let fields = store.get_fields(form_id).await?;

    let parent_table = match &form.parent_form_id {
        Some(parent_id) => {
            let parent = store
                .get_form(parent_id)
                .await?
                .ok_or_else(|| MigrationError::FormNotFound(parent_id.clone()))?;
            parent.table_name
        }
        None => None,
    };

    let table_design = design(&form, &fields, parent_table.as_deref())?;
    let table_name = table_design.table_name.clone();

    if !store.table_exists(&table_name).await? {
        info!("Creating table '{}' for form {}", table_name, form_id);

        store.execute_ddl(&table_design.create_table_sql()).await?;
        for statement in table_design.create_index_sql() {
            store.execute_ddl(&statement).await?;
        }
        store
            .register_materialized_table(form_id, &table_name)
            .await?;

        return Ok(AppliedMigration {
            created: true,
            operations: Vec::new(),
        });
    }

    let mut live = store.live_columns(&table_name).await?;

    // Finish any retype a previous run left hanging between its drop and
    // rename statements before diffing.
    let mut resumed = false;
    for spec in &table_design.columns {
        if live.iter().any(|column| column.name == spec.name) {
            continue;
        }
        let interim = interim_name(&spec.name);
        if live.iter().any(|column| column.name == interim) {
            warn!(
                "Resuming interrupted retype of '{}.{}'",
                table_name, spec.name
            );
            store
                .execute_ddl(&format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    table_name, interim, spec.name
                ))
                .await?;
            resumed = true;
        }
    }
    if resumed {
        live = store.live_columns(&table_name).await?;
    }

    let operations = plan(&table_design, &live);

    if operations.is_empty() {
        debug!("Table '{}' already matches definition of form {}", table_name, form_id);
    }

    for operation in &operations {
        apply(
            store,
            &form,
            &table_design,
            operation,
            backup_retention_days,
        )
        .await?;
    }

    store
        .register_materialized_table(form_id, &table_name)
        .await?;

    Ok(AppliedMigration {
        created: false,
        operations,
    })
}

/// Applies one structural operation, skipping it when the live state shows
/// it has already been applied.
async fn apply(
    store: &SqlStore,
    form: &FormRow,
    table_design: &TableDesign,
    operation: &MigrationOp,
    backup_retention_days: u32,
) -> Result<(), MigrationError> {
    let table_name = &table_design.table_name;
    let live = store.live_columns(table_name).await?;
    let live_column = |name: &str| live.iter().find(|column| column.name == name);

    match operation {
        MigrationOp::AddColumn { column, sql_type } => {
            if live_column(column).is_some() {
                debug!("Column '{}' already exists on '{}'", column, table_name);
                return Ok(());
            }

            store
                .execute_ddl(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    table_name, column, sql_type
                ))
                .await?;
            info!("Added column '{}' to '{}'", column, table_name);
        }

        MigrationOp::AlterColumnType {
            column, to_type, ..
        } => {
            backup_column(store, form, table_name, column, "alter_type", backup_retention_days)
                .await?;
            retype_column(store, form, table_name, column, to_type).await?;
            info!("Changed type of column '{}' on '{}' to {}", column, table_name, to_type);
        }

        MigrationOp::DropColumn { column } => {
            if live_column(column).is_none() {
                debug!("Column '{}' already gone from '{}'", column, table_name);
                return Ok(());
            }

            backup_column(store, form, table_name, column, "drop_column", backup_retention_days)
                .await?;
            store
                .execute_ddl(&format!("ALTER TABLE {} DROP COLUMN {}", table_name, column))
                .await?;
            info!("Dropped column '{}' from '{}'", column, table_name);
        }
    }

    Ok(())
}

const INTERIM_SUFFIX: &str = "_retyped";

/// Returns the interim column name used while retyping `column`.
///
/// The base is truncated first so the full suffix always survives the
/// identifier length limit. Column identifiers at the limit would otherwise
/// truncate back to themselves.
fn interim_name(column: &str) -> String {
    let mut interim = column.to_owned();
    interim.truncate(MAX_IDENTIFIER_LENGTH - INTERIM_SUFFIX.len());
    interim.push_str(INTERIM_SUFFIX);
    interim
}

/// Changes a column's type via an interim column, portable across the
/// supported engines.
///
/// Add interim, copy with `CAST`, drop the original, rename. Each step
/// checks the live state first so a run interrupted between statements
/// resumes where it stopped.
async fn retype_column(
    store: &SqlStore,
    form: &FormRow,
    table_name: &str,
    column: &str,
    to_type: &str,
) -> Result<(), MigrationError> {
    let interim = interim_name(column);

    let live = store.live_columns(table_name).await?;
    let exists = |name: &str| live.iter().any(|live_column| live_column.name == name);

    let original_present = exists(column);
    let interim_present = exists(&interim);

    if original_present && !interim_present {
        store
            .execute_ddl(&format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                table_name, interim, to_type
            ))
            .await?;
    }

    if original_present {
        let copy = format!(
            "UPDATE {} SET {} = CAST({} AS {})",
            table_name, interim, column, to_type
        );
        if let Err(err) = store.execute_ddl(&copy).await {
            // The engine rejected the conversion, existing data does not fit
            // the new type. Roll the interim column back out and surface the
            // offending field.
            warn!("Type conversion failed on '{}.{}': {}", table_name, column, err);
            store
                .execute_ddl(&format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    table_name, interim
                ))
                .await?;

            let field = field_title_for_column(store, &form.id, column).await;
            return Err(MigrationError::IncompatibleData {
                field,
                column: column.to_owned(),
                reason: err.to_string(),
            });
        }

        store
            .execute_ddl(&format!("ALTER TABLE {} DROP COLUMN {}", table_name, column))
            .await?;
    }

    store
        .execute_ddl(&format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {}",
            table_name, interim, column
        ))
        .await?;

    Ok(())
}

/// Copies a column's current values into a retained backup record before a
/// destructive change.
///
/// Runs outside any surrounding metadata transaction on purpose, the backup
/// must be durable even if later statements of the same reconciliation
/// fail.
async fn backup_column(
    store: &SqlStore,
    form: &FormRow,
    table_name: &str,
    column: &str,
    reason: &str,
    backup_retention_days: u32,
) -> Result<(), MigrationError> {
    let snapshot = store.snapshot_column(table_name, column).await?;
    let row_count = snapshot.len() as i64;

    let payload: Vec<serde_json::Value> = snapshot
        .into_iter()
        .map(|(row_id, value)| {
            serde_json::json!({
                "row_id": row_id,
                "value": value,
            })
        })
        .collect();

    let data = serde_json::to_string(&payload)
        .map_err(crate::db::errors::BackupStorageError::Encoding)?;

    // Field rows for dropped columns are already gone from the metadata, in
    // that case the column identifier itself is recorded as the reference.
    let field_id = match field_id_for_column(store, &form.id, column).await {
        Some(id) => id,
        None => column.to_owned(),
    };

    let backup = FieldDataBackupRow {
        id: random_id(),
        form_id: form.id.clone(),
        field_id,
        table_name: table_name.to_owned(),
        column_name: column.to_owned(),
        reason: reason.to_owned(),
        row_count,
        data,
        retain_until: now() + i64::from(backup_retention_days) * 86_400,
        created_at: now(),
    };

    store.insert_backup(&backup).await?;
    info!(
        "Backed up {} values of '{}.{}' ({})",
        row_count, table_name, column, reason
    );

    Ok(())
}

async fn field_id_for_column(store: &SqlStore, form_id: &str, column: &str) -> Option<String> {
    let fields = store.get_fields(form_id).await.ok()?;
    fields
        .into_iter()
        .find(|field| field.column_name.as_deref() == Some(column))
        .map(|field| field.id)
}

async fn field_title_for_column(store: &SqlStore, form_id: &str, column: &str) -> String {
    match store.get_fields(form_id).await {
        Ok(fields) => fields
            .into_iter()
            .find(|field| field.column_name.as_deref() == Some(column))
            .map(|field| field.title)
            .unwrap_or_else(|| column.to_owned()),
        Err(_) => column.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{DatabaseKind, SqlStore};
    use crate::test_utils::{initialize_db, insert_test_form_with_fields, TestField};

    use super::reconcile;

    #[tokio::test]
    async fn creates_table_on_first_run() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[
                TestField::new("field-1", "full_name_cd34", "short_answer"),
                TestField::new("field-2", "age_ef56", "number"),
            ],
        )
        .await;

        let applied = reconcile(&store, "form-1", 90).await.unwrap();
        assert!(applied.created);

        assert!(store.table_exists("patients_ab12").await.unwrap());
        let columns = store.live_columns("patients_ab12").await.unwrap();
        assert!(columns.iter().any(|column| column.name == "full_name_cd34"));
        assert!(columns.iter().any(|column| column.name == "age_ef56"));
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[TestField::new("field-1", "full_name_cd34", "short_answer")],
        )
        .await;

        reconcile(&store, "form-1", 90).await.unwrap();
        let second = reconcile(&store, "form-1", 90).await.unwrap();

        assert!(!second.created);
        assert!(second.operations.is_empty());
    }

    #[tokio::test]
    async fn adds_column_for_new_field() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[TestField::new("field-1", "full_name_cd34", "short_answer")],
        )
        .await;
        reconcile(&store, "form-1", 90).await.unwrap();

        // A new field appears in the metadata.
        let field = TestField::new("field-2", "note_9900", "paragraph");
        field.insert(&store, "form-1").await;

        let applied = reconcile(&store, "form-1", 90).await.unwrap();
        assert_eq!(applied.operations.len(), 1);

        let columns = store.live_columns("patients_ab12").await.unwrap();
        assert!(columns.iter().any(|column| column.name == "note_9900"));
    }

    #[tokio::test]
    async fn drops_column_with_backup_for_removed_field() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[
                TestField::new("field-1", "full_name_cd34", "short_answer"),
                TestField::new("field-2", "note_9900", "paragraph"),
            ],
        )
        .await;
        reconcile(&store, "form-1", 90).await.unwrap();

        store.delete_field("field-2").await.unwrap();
        let applied = reconcile(&store, "form-1", 90).await.unwrap();
        assert_eq!(applied.operations.len(), 1);

        let columns = store.live_columns("patients_ab12").await.unwrap();
        assert!(!columns.iter().any(|column| column.name == "note_9900"));

        // The dropped column's data was backed up, keyed by the column name
        // since the field row is gone.
        let backups = store.get_backups_for_field("note_9900").await.unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].reason, "drop_column");
    }

    #[tokio::test]
    async fn type_change_backs_up_existing_rows() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[TestField::new("field-1", "age_ef56", "short_answer")],
        )
        .await;
        reconcile(&store, "form-1", 90).await.unwrap();

        // 100 rows of text data before the type change.
        for index in 0..100 {
            store
                .execute_ddl(&format!(
                    "INSERT INTO patients_ab12 (id, form_id, submitted_by, age_ef56, \
                     created_at, updated_at) VALUES ('row-{}', 'form-1', 'user-1', '{}', 0, 0)",
                    index, index
                ))
                .await
                .unwrap();
        }

        store
            .update_field_type("field-1", "number")
            .await
            .unwrap();

        let applied = reconcile(&store, "form-1", 90).await.unwrap();
        assert_eq!(applied.operations.len(), 1);

        let backups = store.get_backups_for_field("field-1").await.unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].row_count, 100);
        assert_eq!(backups[0].reason, "alter_type");

        let columns = store.live_columns("patients_ab12").await.unwrap();
        let age = columns
            .iter()
            .find(|column| column.name == "age_ef56")
            .unwrap();
        assert_eq!(age.sql_type, "REAL");

        // No rows lost by the retype.
        assert_eq!(
            store.count_materialized_rows("patients_ab12").await.unwrap(),
            100
        );
    }

    #[tokio::test]
    async fn retypes_column_at_identifier_length_limit() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        // 58 byte body plus hash suffix, exactly the 63 byte limit.
        let column = format!("{}_cd34", "x".repeat(58));
        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[TestField::new("field-1", &column, "short_answer")],
        )
        .await;
        reconcile(&store, "form-1", 90).await.unwrap();

        store
            .execute_ddl(&format!(
                "INSERT INTO patients_ab12 (id, form_id, submitted_by, {}, \
                 created_at, updated_at) VALUES ('row-1', 'form-1', 'user-1', '42', 0, 0)",
                column
            ))
            .await
            .unwrap();

        store.update_field_type("field-1", "number").await.unwrap();
        let applied = reconcile(&store, "form-1", 90).await.unwrap();
        assert_eq!(applied.operations.len(), 1);

        let columns = store.live_columns("patients_ab12").await.unwrap();
        let retyped = columns
            .iter()
            .find(|live_column| live_column.name == column)
            .unwrap();
        assert_eq!(retyped.sql_type, "REAL");
        assert_eq!(
            store.count_materialized_rows("patients_ab12").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn resumes_interrupted_retype_of_long_column() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        // Long enough that the interim name truncates part of the base away.
        let column = format!("{}_cd34", "x".repeat(58));
        insert_test_form_with_fields(
            &store,
            "form-1",
            "patients_ab12",
            &[TestField::new("field-1", &column, "number")],
        )
        .await;
        reconcile(&store, "form-1", 90).await.unwrap();

        // Replay a retype that stopped between its drop and rename
        // statements, only the interim column is left on the table.
        let interim = super::interim_name(&column);
        store
            .execute_ddl(&format!(
                "ALTER TABLE patients_ab12 ADD COLUMN {} REAL",
                interim
            ))
            .await
            .unwrap();
        store
            .execute_ddl(&format!(
                "INSERT INTO patients_ab12 (id, form_id, submitted_by, {}, \
                 created_at, updated_at) VALUES ('row-1', 'form-1', 'user-1', 42, 0, 0)",
                interim
            ))
            .await
            .unwrap();
        store
            .execute_ddl(&format!(
                "ALTER TABLE patients_ab12 DROP COLUMN {}",
                column
            ))
            .await
            .unwrap();

        let applied = reconcile(&store, "form-1", 90).await.unwrap();
        assert!(applied.operations.is_empty());

        let columns = store.live_columns("patients_ab12").await.unwrap();
        assert!(columns.iter().any(|live_column| live_column.name == column));
        assert!(!columns.iter().any(|live_column| live_column.name == interim));
        assert_eq!(
            store.count_materialized_rows("patients_ab12").await.unwrap(),
            1
        );
    }

    #[test]
    fn interim_name_keeps_full_suffix_at_limit() {
        let column = format!("{}_cd34", "x".repeat(58));
        let interim = super::interim_name(&column);

        assert!(interim.ends_with("_retyped"));
        assert_ne!(interim, column);
        assert!(interim.len() <= super::MAX_IDENTIFIER_LENGTH);
    }
}
