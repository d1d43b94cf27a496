// SPDX-License-Identifier: AGPL-3.0-or-later

//! # formata
//!
//! Embeddable engine which turns human-language form definitions into live
//! relational tables and keeps them in sync with a canonical generic value
//! store.
//!
//! Form and field titles arrive in any language (predominantly Thai) and are
//! resolved into safe, collision-free relational identifiers. Every form
//! (and every sub-form) is materialized as one physical table which follows
//! the field set through structural migrations, while each submission is
//! always written to the generic canonical store first.
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

mod config;
mod context;
mod db;
mod definition;
mod forms;
mod identifier;
mod materializer;
mod migration;
mod schema;
mod submission;
mod translation;

#[cfg(test)]
mod test_utils;

pub use crate::config::{Configuration, TranslationConfiguration};
pub use crate::context::Context;
pub use crate::db::errors::{
    BackupStorageError, FormStorageError, MaterializedStorageError, SubmissionStorageError,
    TranslationStorageError,
};
pub use crate::db::models::{
    FieldDataBackupRow, FieldRow, FormRow, MaterializedTableRow, SubmissionRow,
    SubmissionValueRow, TranslationCacheRow,
};
pub use crate::db::stores::LiveColumn;
pub use crate::db::{
    connection_pool, create_database, run_pending_migrations, DatabaseKind, Pool, SqlStore,
};
pub use crate::definition::{FieldDefinition, FieldType, FormDefinition};
pub use crate::forms::{FormError, FormService};
pub use crate::materializer::{Materializer, TaskInput, TaskStatus};
pub use crate::migration::{reconcile, AppliedMigration, MigrationError, MigrationOp};
pub use crate::schema::SchemaError;
pub use crate::submission::{
    persist, rematerialize, verify_parent_links, FieldValue, PersistReceipt, Submission,
    SubmissionError,
};
pub use crate::translation::{Origin, Quality, Resolution, Translator};
