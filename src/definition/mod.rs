// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory representation of form and field definitions as supplied by the
//! form-authoring layer.
mod field_type;
mod form;

pub use field_type::FieldType;
pub use form::{FieldDefinition, FormDefinition};
