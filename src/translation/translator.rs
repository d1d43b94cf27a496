// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt;

use log::{debug, warn};

use crate::config::TranslationConfiguration;
use crate::db::SqlStore;
use crate::identifier::short_hash;
use crate::translation::{dictionary, TranslationClient};

/// Which tier resolved a phrase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Origin {
    /// Exact match in the curated static dictionary.
    Dictionary,

    /// Hit in the persistent translation cache.
    Cache,

    /// Fresh result from the external translation service.
    Service,

    /// Deterministic transliteration, used when all other tiers failed.
    Fallback,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Origin::Dictionary => "dictionary",
            Origin::Cache => "cache",
            Origin::Service => "service",
            Origin::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}

/// Quality class of a resolution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Quality {
    /// Curated, human-confirmed translation.
    Exact,

    /// Machine translation.
    Machine,

    /// Content-preserving transliteration, no actual translation happened.
    Transliterated,
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Quality::Exact => "exact",
            Quality::Machine => "machine",
            Quality::Transliterated => "transliterated",
        };
        write!(f, "{}", name)
    }
}

/// Result of resolving one phrase.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Resolution {
    /// Equivalent ASCII/English phrase.
    pub english: String,

    /// Which tier produced it.
    pub origin: Origin,

    /// How trustworthy it is.
    pub quality: Quality,
}

/// Tiered phrase resolver.
///
/// `resolve` is infallible by design: whatever happens below it (cache
/// unavailable, service down, daily ceiling reached) the caller receives a
/// usable ASCII phrase. It is called at definition time only, the submission
/// hot path works exclusively with persisted identifiers.
#[derive(Clone, Debug)]
pub struct Translator {
    store: SqlStore,
    client: Option<TranslationClient>,
    config: TranslationConfiguration,
}

impl Translator {
    /// Returns a new translator over the given store and configuration.
    pub fn new(store: SqlStore, config: TranslationConfiguration) -> Self {
        let client = config
            .service_url
            .as_ref()
            .map(|url| TranslationClient::new(url, config.timeout_seconds, &config.source_language));

        Self {
            store,
            client,
            config,
        }
    }

    /// Resolves a human-language phrase into an equivalent English phrase.
    pub async fn resolve(&self, phrase: &str) -> Resolution {
        let phrase = phrase.trim();

        // Phrases which are already ASCII pass through as-is.
        if phrase.is_ascii() && !phrase.is_empty() {
            return Resolution {
                english: phrase.to_owned(),
                origin: Origin::Dictionary,
                quality: Quality::Exact,
            };
        }

        if let Some(english) = dictionary::lookup(phrase) {
            debug!("Dictionary hit for '{}': '{}'", phrase, english);
            return Resolution {
                english: english.to_owned(),
                origin: Origin::Dictionary,
                quality: Quality::Exact,
            };
        }

        match self.store.get_cached_translation(phrase).await {
            Ok(Some(row)) => {
                debug!("Cache hit for '{}': '{}'", phrase, row.resolved_phrase);
                return Resolution {
                    english: row.resolved_phrase,
                    origin: Origin::Cache,
                    quality: match row.quality.as_str() {
                        "exact" => Quality::Exact,
                        "machine" => Quality::Machine,
                        _ => Quality::Transliterated,
                    },
                };
            }
            Ok(None) => (),
            Err(err) => warn!("Translation cache lookup failed: {}", err),
        }

        if let Some(english) = self.translate_external(phrase).await {
            return Resolution {
                english,
                origin: Origin::Service,
                quality: Quality::Machine,
            };
        }

        let english = transliterate(phrase);
        debug!("Falling back to transliteration for '{}': '{}'", phrase, english);

        Resolution {
            english,
            origin: Origin::Fallback,
            quality: Quality::Transliterated,
        }
    }

    /// External tier: reserves a call against the daily ceiling, translates
    /// and writes the result into the persistent cache.
    async fn translate_external(&self, phrase: &str) -> Option<String> {
        let client = self.client.as_ref()?;

        match self
            .store
            .try_reserve_translation_call(self.config.daily_call_limit)
            .await
        {
            Ok(true) => (),
            Ok(false) => {
                warn!("Daily translation call limit reached, skipping external tier");
                return None;
            }
            Err(err) => {
                warn!("Could not reserve translation call: {}", err);
                return None;
            }
        }

        match client.translate(phrase).await {
            Ok(english) => {
                if let Err(err) = self
                    .store
                    .upsert_translation(phrase, &english, "service", "machine")
                    .await
                {
                    warn!("Could not cache translation of '{}': {}", phrase, err);
                }
                Some(english)
            }
            Err(err) => {
                warn!("External translation of '{}' failed: {}", phrase, err);
                None
            }
        }
    }
}

/// Deterministic transliteration fallback.
///
/// Keeps the ASCII-alphanumeric content of the phrase and appends a short
/// content hash so distinct phrases stay distinct even when all their
/// human-language characters are stripped.
pub fn transliterate(phrase: &str) -> String {
    let mut kept = String::with_capacity(phrase.len());
    let mut last_was_space = true;

    for character in phrase.to_lowercase().chars() {
        if character.is_ascii_alphanumeric() {
            kept.push(character);
            last_was_space = false;
        } else if !last_was_space {
            kept.push(' ');
            last_was_space = true;
        }
    }

    let kept = kept.trim();
    let base = if kept.is_empty() { "field" } else { kept };

    format!("{} {}", base, short_hash(phrase.trim()))
}
