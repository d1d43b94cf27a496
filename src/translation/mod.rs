// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tiered resolution of human-language phrases into ASCII/English phrases.
//!
//! Lookup order: curated static dictionary, persistent cache, external
//! machine-translation service (bounded retry, daily ceiling), deterministic
//! transliteration. The last tier always succeeds, identifier generation
//! never blocks on translation failure.
mod client;
mod dictionary;
mod errors;
mod translator;

pub use client::TranslationClient;
pub use errors::TranslationError;
pub use translator::{transliterate, Origin, Quality, Resolution, Translator};
