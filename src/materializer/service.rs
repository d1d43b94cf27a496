// SPDX-License-Identifier: AGPL-3.0-or-later

use tokio::sync::broadcast::Receiver;
use triggered::Listener;

use crate::context::Context;
use crate::db::errors::BackupStorageError;
use crate::materializer::retention::purge_expired_backups;
use crate::materializer::tasks::{reconcile_task, TaskInput};
use crate::materializer::worker::{Factory, TaskStatus};

/// Capacity of the status broadcast channel.
const CHANNEL_CAPACITY: usize = 512;

/// Background service keeping materialized tables in sync with form
/// definitions.
///
/// Owns one "reconcile" worker pool. Queueing the same form twice while a
/// pass is still pending collapses into a single announcement, and every
/// pass dispatches follow-up passes for active sub-forms.
pub struct Materializer {
    context: Context,
    factory: Factory<TaskInput>,
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("context", &self.context)
            .finish()
    }
}

impl Materializer {
    pub fn new(context: Context) -> Self {
        let pool_size = context.config.worker_pool_size as usize;
        let factory = Factory::new(
            context.clone(),
            "reconcile",
            pool_size,
            CHANNEL_CAPACITY,
            reconcile_task,
        );

        Self { context, factory }
    }

    /// Schedules a reconciliation pass for one form.
    pub fn queue_reconcile(&self, form_id: &str) {
        self.factory.queue(TaskInput::new(form_id));
    }

    /// Returns true if no reconciliation work is queued.
    pub fn is_empty(&self) -> bool {
        self.factory.is_empty()
    }

    /// Subscribe to status changes of reconciliation tasks.
    pub fn on_task_status_change(&self) -> Receiver<TaskStatus<TaskInput>> {
        self.factory.on_task_status_change()
    }

    /// Future which resolves as soon as a worker hit a critical error.
    pub fn on_error(&self) -> Listener {
        self.factory.on_error()
    }

    /// Runs one retention sweep, deleting field data backups whose retention
    /// window has passed.
    pub async fn purge_expired_backups(&self) -> Result<u64, BackupStorageError> {
        purge_expired_backups(&self.context).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use crate::config::Configuration;
    use crate::context::Context;
    use crate::db::{DatabaseKind, SqlStore};
    use crate::materializer::worker::TaskStatus;
    use crate::test_utils::{initialize_db, insert_test_form_with_fields, TestField};

    use super::Materializer;

    #[tokio::test]
    async fn materializes_queued_form() {
        let pool = initialize_db().await;
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);

        insert_test_form_with_fields(
            &store,
            "form-1",
            "visits_ab12",
            &[TestField::new("field-1", "reason_cd34", "short_answer")],
        )
        .await;

        let mut config = Configuration::default();
        // One pool connection in tests, keep the workers from racing for it.
        config.worker_pool_size = 1;
        let context = Context::new(store, config);

        let materializer = Materializer::new(context.clone());
        let mut status = materializer.on_task_status_change();

        materializer.queue_reconcile("form-1");

        loop {
            let next = timeout(Duration::from_secs(10), status.recv())
                .await
                .unwrap()
                .unwrap();
            match next {
                TaskStatus::Completed(input) => {
                    assert_eq!(input.form_id, "form-1");
                    break;
                }
                TaskStatus::Failed(input) => panic!("reconcile failed for {}", input),
                TaskStatus::Pending(_) => continue,
            }
        }

        assert!(context.store.table_exists("visits_ab12").await.unwrap());
    }
}
