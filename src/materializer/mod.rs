// SPDX-License-Identifier: AGPL-3.0-or-later

//! Background processing and lock orchestration for structural work.
//!
//! Reconciliation tasks are queued per form and deduplicated, one worker
//! pool processes them. Structural work on the same form is serialized
//! through per-form advisory locks while distinct forms proceed in
//! parallel.
mod locks;
mod retention;
mod service;
mod tasks;
mod worker;

pub use locks::LockRegistry;
pub use retention::purge_expired_backups;
pub use service::Materializer;
pub use tasks::{reconcile_task, TaskInput};
pub use worker::{Factory, TaskError, TaskResult, TaskStatus, Workable};
