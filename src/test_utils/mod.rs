// SPDX-License-Identifier: AGPL-3.0-or-later

//! Helper methods for working with databases and metadata fixtures in
//! tests.
mod db;
mod fixtures;

pub use db::initialize_db;
pub use fixtures::{insert_test_form, insert_test_form_with_fields, TestField};
