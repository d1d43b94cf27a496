// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of field types a form author can choose from.
///
/// Every dynamic behaviour attached to a type (relational column type,
/// sensitivity flag) lives in a match on this enum, there is no open
/// extension point.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Single line of text.
    ShortAnswer,

    /// Multi-line text.
    Paragraph,

    /// Email address, held encrypted in the canonical value store.
    Email,

    /// Phone number, held encrypted in the canonical value store.
    Phone,

    /// Floating point number.
    Number,

    /// URL.
    Url,

    /// Calendar date.
    Date,

    /// Time of day.
    Time,

    /// Combined date and time.
    DateTime,

    /// One choice out of a configured list.
    MultipleChoice,

    /// Star rating, small integer.
    Rating,

    /// Slider over a configured integer range.
    Slider,

    /// Geographic coordinate pair, held encrypted in the canonical value
    /// store.
    LatLong,

    /// Reference to an uploaded file.
    FileUpload,

    /// Categorical lookup against a configured factory / branch list.
    Factory,
}

impl FieldType {
    /// Relational column type used when materializing a field of this type.
    ///
    /// Restricted to the portable subset both PostgreSQL and SQLite accept.
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::ShortAnswer => "TEXT",
            FieldType::Paragraph => "TEXT",
            FieldType::Email => "TEXT",
            FieldType::Phone => "TEXT",
            FieldType::Number => "REAL",
            FieldType::Url => "TEXT",
            FieldType::Date => "DATE",
            FieldType::Time => "TIME",
            FieldType::DateTime => "TIMESTAMP",
            FieldType::MultipleChoice => "TEXT",
            FieldType::Rating => "INTEGER",
            FieldType::Slider => "INTEGER",
            FieldType::LatLong => "TEXT",
            FieldType::FileUpload => "TEXT",
            FieldType::Factory => "TEXT",
        }
    }

    /// Whether values of this type are flagged for encryption at the
    /// value-store layer.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, FieldType::Email | FieldType::Phone | FieldType::LatLong)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            FieldType::ShortAnswer => "short_answer",
            FieldType::Paragraph => "paragraph",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Number => "number",
            FieldType::Url => "url",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime",
            FieldType::MultipleChoice => "multiple_choice",
            FieldType::Rating => "rating",
            FieldType::Slider => "slider",
            FieldType::LatLong => "lat_long",
            FieldType::FileUpload => "file_upload",
            FieldType::Factory => "factory",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "short_answer" => Ok(FieldType::ShortAnswer),
            "paragraph" => Ok(FieldType::Paragraph),
            "email" => Ok(FieldType::Email),
            "phone" => Ok(FieldType::Phone),
            "number" => Ok(FieldType::Number),
            "url" => Ok(FieldType::Url),
            "date" => Ok(FieldType::Date),
            "time" => Ok(FieldType::Time),
            "datetime" => Ok(FieldType::DateTime),
            "multiple_choice" => Ok(FieldType::MultipleChoice),
            "rating" => Ok(FieldType::Rating),
            "slider" => Ok(FieldType::Slider),
            "lat_long" => Ok(FieldType::LatLong),
            "file_upload" => Ok(FieldType::FileUpload),
            "factory" => Ok(FieldType::Factory),
            unknown => Err(format!("Unknown field type: {}", unknown)),
        }
    }
}
