// SPDX-License-Identifier: AGPL-3.0-or-later

use sqlx::{query, query_as, query_scalar};

use crate::db::errors::MaterializedStorageError;
use crate::db::models::MaterializedTableRow;
use crate::db::{now, DatabaseKind, SqlStore};
use crate::submission::FieldValue;

/// One live column as reported by the engine catalog.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LiveColumn {
    /// Column identifier.
    pub name: String,

    /// Normalized relational type.
    pub sql_type: String,
}

/// Storage of the materialized per-form tables.
///
/// Table and column identifiers interpolated into SQL strings here are
/// always engine-generated (`[a-z][a-z0-9_]*`, bounded), never raw user
/// input. Structural statements run on their own connections so they commit
/// independently of any metadata transaction.
impl SqlStore {
    /// Registers (or refreshes) the materialized table of a form.
    pub async fn register_materialized_table(
        &self,
        form_id: &str,
        table_name: &str,
    ) -> Result<(), MaterializedStorageError> {
        let timestamp = now();

        query(
            "
            INSERT INTO
                materialized_tables (form_id, table_name, created_at, updated_at)
            VALUES
                ($1, $2, $3, $3)
            ON CONFLICT (form_id) DO UPDATE SET
                table_name = excluded.table_name,
                updated_at = excluded.updated_at
            ",
        )
        .bind(form_id)
        .bind(table_name)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the registry row of a form's materialized table.
    pub async fn get_materialized_table(
        &self,
        form_id: &str,
    ) -> Result<Option<MaterializedTableRow>, MaterializedStorageError> {
        let row = query_as::<_, MaterializedTableRow>(
            "
            SELECT
                form_id,
                table_name,
                created_at,
                updated_at
            FROM
                materialized_tables
            WHERE
                form_id = $1
            ",
        )
        .bind(form_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Removes the registry row of a form's materialized table.
    pub async fn remove_materialized_table(
        &self,
        form_id: &str,
    ) -> Result<(), MaterializedStorageError> {
        query(
            "
            DELETE FROM
                materialized_tables
            WHERE
                form_id = $1
            ",
        )
        .bind(form_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Executes one structural statement in its own implicit transaction.
    pub async fn execute_ddl(&self, sql: &str) -> Result<(), MaterializedStorageError> {
        log::debug!("Executing DDL: {}", sql.trim());
        query(sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Whether a table with this identifier exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool, MaterializedStorageError> {
        let sql = match self.kind {
            DatabaseKind::Sqlite => {
                "
                SELECT
                    name
                FROM
                    sqlite_master
                WHERE
                    type = 'table' AND name = $1
                "
            }
            DatabaseKind::Postgres => {
                "
                SELECT
                    table_name
                FROM
                    information_schema.tables
                WHERE
                    table_schema = 'public' AND table_name = $1
                "
            }
        };

        let found: Option<String> = query_scalar(sql)
            .bind(table_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    /// Introspects the live columns of a table from the engine catalog.
    ///
    /// The migration engine treats this as the single source of "current
    /// materialized state", no cached copy is consulted.
    pub async fn live_columns(
        &self,
        table_name: &str,
    ) -> Result<Vec<LiveColumn>, MaterializedStorageError> {
        let rows: Vec<(String, String)> = match self.kind {
            DatabaseKind::Sqlite => {
                let sql = format!(
                    "SELECT name, type FROM pragma_table_info('{}')",
                    table_name
                );
                query_as(&sql).fetch_all(&self.pool).await?
            }
            DatabaseKind::Postgres => {
                query_as(
                    "
                    SELECT
                        column_name,
                        data_type
                    FROM
                        information_schema.columns
                    WHERE
                        table_name = $1
                    ORDER BY
                        ordinal_position ASC
                    ",
                )
                .bind(table_name)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|(name, sql_type)| LiveColumn {
                name,
                sql_type: normalize_sql_type(&sql_type),
            })
            .collect())
    }

    /// Inserts or updates one row in a materialized table, keyed by the
    /// submission id.
    pub async fn upsert_materialized_row(
        &self,
        table_name: &str,
        submission_id: &str,
        form_id: &str,
        submitted_by: &str,
        parent_links: Option<(&str, &str)>,
        values: &[(String, FieldValue)],
    ) -> Result<(), MaterializedStorageError> {
        let mut columns = vec!["id", "form_id", "submitted_by"];
        if parent_links.is_some() {
            columns.push("parent_id");
            columns.push("root_id");
        }
        for (name, _) in values {
            columns.push(name.as_str());
        }
        columns.push("created_at");
        columns.push("updated_at");

        let placeholders: Vec<String> = (1..=columns.len())
            .map(|index| format!("${}", index))
            .collect();

        // Everything except the primary key and creation timestamp gets
        // refreshed on conflict.
        let updates: Vec<String> = columns
            .iter()
            .filter(|name| **name != "id" && **name != "created_at")
            .map(|name| format!("{} = excluded.{}", name, name))
            .collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {}",
            table_name,
            columns.join(", "),
            placeholders.join(", "),
            updates.join(", ")
        );

        let timestamp = now();
        let mut statement = query(&sql)
            .bind(submission_id)
            .bind(form_id)
            .bind(submitted_by);

        if let Some((parent_id, root_id)) = parent_links {
            statement = statement.bind(parent_id).bind(root_id);
        }

        for (_, value) in values {
            statement = match value {
                FieldValue::Text(text) => statement.bind(text.clone()),
                FieldValue::Number(number) => statement.bind(*number),
                FieldValue::Integer(integer) => statement.bind(*integer),
                FieldValue::Bool(boolean) => statement.bind(i64::from(*boolean)),
                FieldValue::Null => statement.bind(Option::<String>::None),
            };
        }

        statement = statement.bind(timestamp).bind(timestamp);
        statement.execute(&self.pool).await?;

        Ok(())
    }

    /// Deletes one row from a materialized table.
    pub async fn delete_materialized_row(
        &self,
        table_name: &str,
        submission_id: &str,
    ) -> Result<(), MaterializedStorageError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table_name);
        query(&sql).bind(submission_id).execute(&self.pool).await?;
        Ok(())
    }

    /// Number of rows in a materialized table.
    pub async fn count_materialized_rows(
        &self,
        table_name: &str,
    ) -> Result<i64, MaterializedStorageError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table_name);
        let count: i64 = query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Snapshots one column as `(row id, value as text)` pairs, used for
    /// pre-migration backups.
    pub async fn snapshot_column(
        &self,
        table_name: &str,
        column_name: &str,
    ) -> Result<Vec<(String, Option<String>)>, MaterializedStorageError> {
        let sql = format!(
            "SELECT id, CAST({} AS TEXT) FROM {}",
            column_name, table_name
        );
        let rows: Vec<(String, Option<String>)> = query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Ids of rows violating the parent/root link invariant.
    ///
    /// For every sub-form row the immediate parent reference and the root
    /// reference must be equal, this query is the active guard against
    /// divergence.
    pub async fn find_divergent_parent_links(
        &self,
        table_name: &str,
    ) -> Result<Vec<String>, MaterializedStorageError> {
        let sql = format!(
            "
            SELECT
                id
            FROM
                {}
            WHERE
                (parent_id IS NOT NULL OR root_id IS NOT NULL)
            AND
                (parent_id IS NULL OR root_id IS NULL OR parent_id <> root_id)
            ",
            table_name
        );

        let rows: Vec<String> = query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

/// Collapses engine-specific catalog type names onto the closed set the
/// schema generator emits.
fn normalize_sql_type(raw: &str) -> String {
    let lowered = raw.to_lowercase();

    if lowered.starts_with("timestamp") {
        "TIMESTAMP".into()
    } else if lowered.starts_with("time") {
        "TIME".into()
    } else if lowered == "date" {
        "DATE".into()
    } else if lowered.contains("int") {
        "INTEGER".into()
    } else if lowered == "real" || lowered.contains("double") || lowered.contains("float") {
        "REAL".into()
    } else if lowered == "text" || lowered.contains("char") {
        "TEXT".into()
    } else {
        raw.to_uppercase()
    }
}
