// SPDX-License-Identifier: AGPL-3.0-or-later

//! Reconciliation of a form's live table structure against its current
//! field definitions.
//!
//! The live column set always comes from the engine catalog, diffing happens
//! in [`plan`] as a pure function and [`reconcile`] applies the resulting
//! operations one statement at a time, each in its own transaction and each
//! idempotent, so that an interrupted run converges when retried.
mod diff;
mod engine;
mod errors;

pub use diff::{plan, MigrationOp};
pub use engine::{reconcile, AppliedMigration};
pub use errors::MigrationError;
