// SPDX-License-Identifier: AGPL-3.0-or-later

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use deadqueue::unlimited::Queue;
use log::{debug, error, info};
use tokio::sync::broadcast::{channel, Receiver, Sender};
use tokio::task;
use triggered::{Listener, Trigger};

use crate::context::Context;

/// Return value of every processed task indicating if it succeeded or failed.
///
/// When a task succeeds it has the option to dispatch subsequent tasks.
pub type TaskResult<IN> = Result<Option<Vec<IN>>, TaskError>;

/// Possible return values of a failed task.
#[derive(Debug)]
pub enum TaskError {
    /// This task failed critically and will signal the factory to shut down.
    Critical(String),

    /// This task failed silently without any further effects.
    Failure(String),
}

/// Enum representing status of a task.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TaskStatus<IN> {
    /// Task just got scheduled and is waiting to be processed.
    Pending(IN),

    /// Task completed successfully.
    Completed(IN),

    /// Task gave up without completing.
    Failed(IN),
}

/// This trait defines a generic async worker function receiving the task input and shared context
/// and returning a task result.
///
/// It is using the `async_trait` macro as a trick to avoid a more ugly trait signature as working
/// with generic, static, pinned and boxed async functions can look quite messy.
#[async_trait::async_trait]
pub trait Workable<IN>
where
    IN: Send + Sync + Clone + 'static,
{
    async fn call(&self, context: Context, input: IN) -> TaskResult<IN>;
}

/// Implements our `Workable` trait for a generic async function.
#[async_trait::async_trait]
impl<FN, F, IN> Workable<IN> for FN
where
    FN: Fn(Context, IN) -> F + Sync,
    F: Future<Output = TaskResult<IN>> + Send + 'static,
    IN: Send + Sync + Clone + 'static,
{
    async fn call(&self, context: Context, input: IN) -> TaskResult<IN> {
        (self)(context, input).await
    }
}

/// A handle into the task queue shared by the dispatching side and every worker.
///
/// Next to the FIFO queue itself it carries an index counting how many queued tasks share the
/// same input. The index lets us reject announcing a task as "pending" twice and tells us when
/// the last task for one input finished, which is the moment subscribers get informed.
struct Task<IN>
where
    IN: Send + Sync + Clone + Hash + Eq + Display + 'static,
{
    queue: Arc<Queue<IN>>,
    input_index: Arc<Mutex<HashMap<IN, u64>>>,
}

// Derived `Clone` would demand `IN: Clone` on top of the `Arc` fields, write it out instead.
impl<IN> Clone for Task<IN>
where
    IN: Send + Sync + Clone + Hash + Eq + Display + 'static,
{
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            input_index: self.input_index.clone(),
        }
    }
}

impl<IN> Task<IN>
where
    IN: Send + Sync + Clone + Hash + Eq + Display + 'static,
{
    fn new() -> Self {
        Self {
            queue: Arc::new(Queue::new()),
            input_index: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Pushes a new task input into the queue.
    ///
    /// Returns true when no other task with the same input was queued before, meaning the task
    /// should be announced as pending.
    fn push(&self, input: IN) -> bool {
        let mut index = self
            .input_index
            .lock()
            .unwrap_or_else(|error| error.into_inner());

        let first = !index.contains_key(&input);
        *index.entry(input.clone()).or_insert(0) += 1;
        self.queue.push(input);
        first
    }

    /// Takes the next task input from the queue, waiting until one arrives.
    async fn pop(&self) -> IN {
        self.queue.pop().await
    }

    /// Decrements the duplicate counter for this input after a worker processed it.
    ///
    /// Returns true when this was the last queued task for the input.
    fn settle(&self, input: &IN) -> bool {
        let mut index = self
            .input_index
            .lock()
            .unwrap_or_else(|error| error.into_inner());

        match index.get_mut(input) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    index.remove(input);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// This factory serves as the main entry interface to dispatch, schedule and process tasks.
///
/// All workers of the pool share one worker function. Worker functions should be idempotent:
/// calling one multiple times with the same input must not cause unintended effects.
pub struct Factory<IN>
where
    IN: Send + Sync + Clone + Hash + Eq + Debug + Display + 'static,
{
    /// Shared context passed into every worker function call.
    context: Context,

    /// Queue handle shared with all spawned workers.
    task: Task<IN>,

    /// Broadcast channel to inform callbacks about pending, completed or failed tasks.
    tx_status: Sender<TaskStatus<IN>>,

    /// Sender of error signal.
    error_signal: Trigger,

    /// Receiver of error signal.
    ///
    /// This can be used to react to factory errors, for example by quitting the program.
    error_handle: Listener,
}

impl<IN> Factory<IN>
where
    IN: Send + Sync + Clone + Hash + Eq + Debug + Display + 'static,
{
    /// Initialises a new factory and spawns its worker pool.
    ///
    /// The capacity argument bounds the status broadcast channel. Use a higher value if many
    /// tasks are expected within a short time while a subscriber is listening slowly.
    pub fn new<W: Workable<IN> + Send + Sync + Copy + 'static>(
        context: Context,
        name: &str,
        pool_size: usize,
        capacity: usize,
        work: W,
    ) -> Self {
        let (tx_status, _) = channel(capacity);
        let (error_signal, error_handle) = triggered::trigger();

        let factory = Self {
            context,
            task: Task::new(),
            tx_status,
            error_signal,
            error_handle,
        };

        info!("Register {} worker with pool size {}", name, pool_size);
        factory.spawn_workers(name, pool_size, work);

        factory
    }

    /// Queues up a new task.
    ///
    /// Tasks with duplicate input values which already exist in the queue will be queued as well
    /// but only announced once, status subscribers observe one pending and one final status per
    /// distinct input.
    pub fn queue(&self, input: IN) {
        if self.task.push(input.clone()) {
            // Silently ignore send errors, they only occur without any subscribers around.
            let _ = self.tx_status.send(TaskStatus::Pending(input));
        }
    }

    /// Returns true if there are no more queued tasks.
    pub fn is_empty(&self) -> bool {
        self.task.is_empty()
    }

    /// Future which resolves as soon as the factory returned a critical error.
    pub fn on_error(&self) -> Listener {
        self.error_handle.clone()
    }

    /// Subscribe to status changes of tasks.
    pub fn on_task_status_change(&self) -> Receiver<TaskStatus<IN>> {
        self.tx_status.subscribe()
    }

    /// Spawns a pool of workers all waiting on the shared queue.
    fn spawn_workers<W: Workable<IN> + Send + Sync + Copy + 'static>(
        &self,
        name: &str,
        pool_size: usize,
        work: W,
    ) {
        for _ in 0..pool_size {
            let context = self.context.clone();
            let task = self.task.clone();
            let tx_status = self.tx_status.clone();
            let error_signal = self.error_signal.clone();
            let name = name.to_string();

            task::spawn(async move {
                loop {
                    // Wait until there is a new task arriving in the queue
                    let input = task.pop().await;

                    // Take this task and do work ..
                    let result = work.call(context.clone(), input.clone()).await;

                    let last = task.settle(&input);

                    match result {
                        Ok(Some(next_inputs)) => {
                            // Task succeeded and dispatches new, subsequent tasks. They go
                            // through the same announce logic as externally queued ones.
                            for next in next_inputs {
                                if task.push(next.clone()) {
                                    let _ = tx_status.send(TaskStatus::Pending(next));
                                }
                            }

                            if last {
                                let _ = tx_status.send(TaskStatus::Completed(input));
                            }
                        }
                        Ok(None) => {
                            if last {
                                let _ = tx_status.send(TaskStatus::Completed(input));
                            }
                        }
                        Err(TaskError::Critical(err)) => {
                            // Something really horrible happened, signal shutdown
                            error!(
                                "Critical error in worker {} with task {}: {}",
                                name, input, err
                            );

                            error_signal.trigger();

                            if last {
                                let _ = tx_status.send(TaskStatus::Failed(input));
                            }
                        }
                        Err(TaskError::Failure(err)) => {
                            debug!(
                                "Silently failing worker {} with task {}: {}",
                                name, input, err
                            );

                            if last {
                                let _ = tx_status.send(TaskStatus::Failed(input));
                            }
                        }
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use once_cell::sync::Lazy;
    use tokio::time::timeout;

    use crate::config::Configuration;
    use crate::context::Context;
    use crate::db::{connection_pool, run_pending_migrations, DatabaseKind, SqlStore};

    use super::{Factory, TaskError, TaskResult, TaskStatus};

    static COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

    async fn test_context() -> Context {
        let pool = connection_pool("sqlite::memory:", 1).await.unwrap();
        run_pending_migrations(&pool).await.unwrap();
        let store = SqlStore::new(pool, DatabaseKind::Sqlite);
        Context::new(store, Configuration::default())
    }

    async fn count_task(_context: Context, _input: String) -> TaskResult<String> {
        COUNTER.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    async fn failing_task(_context: Context, _input: String) -> TaskResult<String> {
        Err(TaskError::Failure("nope".into()))
    }

    async fn chaining_task(_context: Context, input: String) -> TaskResult<String> {
        if input == "first" {
            Ok(Some(vec!["second".to_string()]))
        } else {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn processes_queued_tasks() {
        let context = test_context().await;
        let factory = Factory::new(context, "count", 2, 64, count_task);
        let mut status = factory.on_task_status_change();

        COUNTER.store(0, Ordering::SeqCst);
        factory.queue("a".to_string());
        factory.queue("b".to_string());

        let mut completed = 0;
        while completed < 2 {
            let next = timeout(Duration::from_secs(5), status.recv())
                .await
                .unwrap()
                .unwrap();
            if matches!(next, TaskStatus::Completed(_)) {
                completed += 1;
            }
        }

        assert!(COUNTER.load(Ordering::SeqCst) >= 2);
        assert!(factory.is_empty());
    }

    #[tokio::test]
    async fn duplicate_inputs_announced_once() {
        let context = test_context().await;
        let factory = Factory::new(context, "count", 1, 64, count_task);
        let mut status = factory.on_task_status_change();

        factory.queue("same".to_string());
        factory.queue("same".to_string());
        factory.queue("same".to_string());

        // Exactly one pending status for the shared input.
        let first = timeout(Duration::from_secs(5), status.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, TaskStatus::Pending("same".to_string()));

        // Followed by exactly one final status once the last duplicate settled.
        let second = timeout(Duration::from_secs(5), status.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, TaskStatus::Completed("same".to_string()));
    }

    #[tokio::test]
    async fn dispatched_follow_ups_are_announced() {
        let context = test_context().await;
        let factory = Factory::new(context, "chain", 1, 64, chaining_task);
        let mut status = factory.on_task_status_change();

        factory.queue("first".to_string());

        // Pending and completed for the queued task, pending and completed
        // for the follow-up it dispatched.
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(
                timeout(Duration::from_secs(5), status.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }

        assert!(seen.contains(&TaskStatus::Pending("second".to_string())));
        assert!(seen.contains(&TaskStatus::Completed("second".to_string())));
    }

    #[tokio::test]
    async fn failures_are_reported() {
        let context = test_context().await;
        let factory = Factory::new(context, "failing", 1, 64, failing_task);
        let mut status = factory.on_task_status_change();

        factory.queue("doomed".to_string());

        let mut last = None;
        for _ in 0..2 {
            last = Some(
                timeout(Duration::from_secs(5), status.recv())
                    .await
                    .unwrap()
                    .unwrap(),
            );
        }

        assert_eq!(last, Some(TaskStatus::Failed("doomed".to_string())));
    }
}
