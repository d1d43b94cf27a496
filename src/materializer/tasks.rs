// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::Display;

use log::debug;

use crate::context::Context;
use crate::materializer::worker::{TaskError, TaskResult};
use crate::migration::reconcile;

/// Input of a reconciliation task.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TaskInput {
    /// Form whose materialized table should be brought up to date.
    pub form_id: String,
}

impl TaskInput {
    pub fn new(form_id: &str) -> Self {
        Self {
            form_id: form_id.to_owned(),
        }
    }
}

impl Display for TaskInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<Task reconcile form {}>", self.form_id)
    }
}

/// Worker function reconciling one form's materialized table with its field
/// definitions.
///
/// Holds the form's advisory lock for the duration of the pass, the
/// metadata read included, and dispatches follow-up tasks for every active
/// sub-form, so structural changes propagate through the whole form tree.
pub async fn reconcile_task(context: Context, input: TaskInput) -> TaskResult<TaskInput> {
    debug!("Working on {}", input);

    {
        let _guard = context.locks.acquire(&input.form_id).await;

        let form = context
            .store
            .get_form(&input.form_id)
            .await
            .map_err(|err| TaskError::Critical(err.to_string()))?
            .ok_or_else(|| TaskError::Failure(format!("Form {} not found", input.form_id)))?;

        if form.table_name.is_none() {
            // Forms without an assigned table have never been activated,
            // there is nothing physical to reconcile yet.
            return Ok(None);
        }

        reconcile(
            &context.store,
            &input.form_id,
            context.config.backup_retention_days,
        )
        .await
        .map_err(|err| TaskError::Failure(err.to_string()))?;
    }

    let sub_forms = context
        .store
        .get_sub_forms(&input.form_id)
        .await
        .map_err(|err| TaskError::Critical(err.to_string()))?;

    let next: Vec<TaskInput> = sub_forms
        .iter()
        .filter(|sub_form| sub_form.table_name.is_some())
        .map(|sub_form| TaskInput::new(&sub_form.id))
        .collect();

    if next.is_empty() {
        Ok(None)
    } else {
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Configuration;
    use crate::context::Context;
    use crate::db::{DatabaseKind, SqlStore};
    use crate::test_utils::{initialize_db, insert_test_form_with_fields, TestField};

    use super::{reconcile_task, TaskInput};

    #[tokio::test]
    async fn creates_missing_table() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        insert_test_form_with_fields(
            &store,
            "form-1",
            "visits_ab12",
            &[TestField::new("field-1", "reason_cd34", "short_answer")],
        )
        .await;

        let context = Context::new(store, Configuration::default());
        let next = reconcile_task(context.clone(), TaskInput::new("form-1"))
            .await
            .unwrap();

        assert!(next.is_none());
        assert!(context.store.table_exists("visits_ab12").await.unwrap());
    }

    #[tokio::test]
    async fn skips_forms_without_table() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);
        crate::test_utils::insert_test_form(&store, "form-1").await;

        let context = Context::new(store, Configuration::default());
        let next = reconcile_task(context, TaskInput::new("form-1"))
            .await
            .unwrap();
        assert!(next.is_none());
    }
}
