// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};

use crate::definition::FieldType;

/// Definition of one form as supplied by the form-authoring layer.
///
/// Sub-forms are full `FormDefinition` values nested under their parent,
/// each materialized as its own table with a cascading foreign key back to
/// the parent's table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Stable id of this form.
    pub id: String,

    /// Human-language title, unique system-wide.
    pub title: String,

    /// Id of the user owning this form.
    pub owner_id: String,

    /// Ordered list of fields.
    pub fields: Vec<FieldDefinition>,

    /// Ordered list of sub-forms.
    #[serde(default)]
    pub sub_forms: Vec<FormDefinition>,
}

impl FormDefinition {
    /// Returns a new form definition without fields or sub-forms.
    pub fn new(id: &str, title: &str, owner_id: &str) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            owner_id: owner_id.to_owned(),
            fields: Vec::new(),
            sub_forms: Vec::new(),
        }
    }

    /// Appends a field, returning the definition for chained construction.
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Appends a sub-form, returning the definition for chained
    /// construction.
    pub fn sub_form(mut self, sub_form: FormDefinition) -> Self {
        self.sub_forms.push(sub_form);
        self
    }
}

/// Definition of one field inside a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Stable, immutable id of this field.
    pub id: String,

    /// Human-language title. Duplicate titles within one form are allowed,
    /// identifier resolution disambiguates them.
    pub title: String,

    /// Declared type.
    pub field_type: FieldType,

    /// Whether a value is required on submission.
    #[serde(default)]
    pub required: bool,

    /// Per-type options (choice lists, slider ranges, ..) as free-form JSON.
    #[serde(default)]
    pub options: Option<serde_json::Value>,
}

impl FieldDefinition {
    /// Returns a new field definition.
    pub fn new(id: &str, title: &str, field_type: FieldType) -> Self {
        Self {
            id: id.to_owned(),
            title: title.to_owned(),
            field_type,
            required: false,
            options: None,
        }
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
