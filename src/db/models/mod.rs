// SPDX-License-Identifier: AGPL-3.0-or-later

mod backup;
mod form;
mod submission;
mod translation;

pub use backup::FieldDataBackupRow;
pub use form::{FieldRow, FormRow, MaterializedTableRow};
pub use submission::{SubmissionRow, SubmissionValueRow};
pub use translation::TranslationCacheRow;
