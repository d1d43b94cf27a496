// SPDX-License-Identifier: AGPL-3.0-or-later

/// `FormStore` errors.
#[derive(thiserror::Error, Debug)]
pub enum FormStorageError {
    /// Catch all error which implementers can use for passing their own errors up the chain.
    #[error("Error occured in FormStore: {0}")]
    Custom(String),

    /// A form with this title already exists, titles are unique system-wide.
    #[error("A form titled '{0}' already exists")]
    DuplicateTitle(String),

    /// Error which originates when a requested form is not present.
    #[error("Form with id {0} not found in storage")]
    FormNotFound(String),

    /// Error returned from the database.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// `SubmissionStore` errors.
#[derive(thiserror::Error, Debug)]
pub enum SubmissionStorageError {
    /// Catch all error which implementers can use for passing their own errors up the chain.
    #[error("Error occured in SubmissionStore: {0}")]
    Custom(String),

    /// Error which originates when a requested submission is not present.
    #[error("Submission with id {0} not found in storage")]
    SubmissionNotFound(String),

    /// Error returned from the database.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// `TranslationStore` errors.
#[derive(thiserror::Error, Debug)]
pub enum TranslationStorageError {
    /// Error returned from the database.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// `MaterializedStore` errors.
#[derive(thiserror::Error, Debug)]
pub enum MaterializedStorageError {
    /// Catch all error which implementers can use for passing their own errors up the chain.
    #[error("Error occured in MaterializedStore: {0}")]
    Custom(String),

    /// Error returned from the database.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// `BackupStore` errors.
#[derive(thiserror::Error, Debug)]
pub enum BackupStorageError {
    /// Serialization of the backed up column values failed.
    #[error("Could not encode backup payload: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Error returned from the database.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
