// SPDX-License-Identifier: AGPL-3.0-or-later

//! Implementations of the storage interfaces on top of [`crate::db::SqlStore`].
mod backup;
mod form;
mod materialized;
mod submission;
mod translation;

pub use materialized::LiveColumn;
