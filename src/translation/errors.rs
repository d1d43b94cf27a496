// SPDX-License-Identifier: AGPL-3.0-or-later

/// Errors of the external translation tier.
///
/// These never escape the translator, every failure path falls back to
/// deterministic transliteration.
#[derive(thiserror::Error, Debug)]
pub enum TranslationError {
    /// The HTTP call to the translation service failed or timed out.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The translation service answered with a non-success status.
    #[error("Translation service responded with status {0}")]
    Service(u16),

    /// The translation service returned an empty result.
    #[error("Translation service returned an empty result")]
    EmptyResult,
}
