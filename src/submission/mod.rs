// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dual-write of submissions: canonical generic rows first, then the row in
//! the form's materialized table.
mod coordinator;
mod errors;

pub use coordinator::{persist, rematerialize, verify_parent_links, PersistReceipt};
pub use errors::SubmissionError;

/// One incoming submission, optionally nested under a parent submission
/// when it belongs to a sub-form.
#[derive(Debug, Clone)]
pub struct Submission {
    /// Stable id, doubles as the primary key of the materialized row.
    pub id: String,

    /// Id of the form being submitted to.
    pub form_id: String,

    /// Id of the parent submission for sub-form rows.
    pub parent_submission_id: Option<String>,

    /// Id of the submitting user.
    pub submitted_by: String,
}

/// One field value of a submission payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Null,
}

impl FieldValue {
    /// Kind tag stored next to the canonical value.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Integer(_) => "integer",
            FieldValue::Bool(_) => "bool",
            FieldValue::Null => "null",
        }
    }

    /// Canonical text representation, `None` for explicit nulls.
    pub fn as_canonical_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Number(number) => Some(number.to_string()),
            FieldValue::Integer(integer) => Some(integer.to_string()),
            FieldValue::Bool(boolean) => Some(boolean.to_string()),
            FieldValue::Null => None,
        }
    }

    /// Rebuilds a value from its canonical representation.
    pub fn from_canonical(kind: &str, value: Option<&str>) -> Self {
        match (kind, value) {
            ("text", Some(text)) => FieldValue::Text(text.to_owned()),
            ("number", Some(number)) => number
                .parse()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Null),
            ("integer", Some(integer)) => integer
                .parse()
                .map(FieldValue::Integer)
                .unwrap_or(FieldValue::Null),
            ("bool", Some(boolean)) => FieldValue::Bool(boolean == "true"),
            _ => FieldValue::Null,
        }
    }
}
