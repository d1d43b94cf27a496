// SPDX-License-Identifier: AGPL-3.0-or-later

//! Mapping of form definitions to complete table designs and their SQL
//! rendering.
mod design;
mod errors;
mod generator;

pub use design::{ColumnSpec, IndexSpec, Reference, TableDesign};
pub use errors::SchemaError;
pub use generator::{design, SYSTEM_COLUMNS};
