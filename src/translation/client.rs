// SPDX-License-Identifier: AGPL-3.0-or-later

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::translation::TranslationError;

/// Request body of the translation service's `/translate` endpoint.
#[derive(Serialize, Debug)]
struct TranslateRequest<'a> {
    text: &'a str,
    from_lang: &'a str,
    to_lang: &'a str,
}

/// Relevant part of the `/translate` response body.
#[derive(Deserialize, Debug)]
struct TranslateResponse {
    translated: String,
}

/// HTTP client for the external machine-translation service.
///
/// Calls carry a short timeout and are attempted at most twice, the
/// definition path must not stall when the service is slow or down.
#[derive(Clone, Debug)]
pub struct TranslationClient {
    http: reqwest::Client,
    endpoint: String,
    source_language: String,
}

impl TranslationClient {
    /// Returns a new client for the service hosted at `base_url`.
    pub fn new(base_url: &str, timeout_seconds: u64, source_language: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            // Building a client without TLS or proxy settings does not fail.
            .unwrap_or_default();

        Self {
            http,
            endpoint: format!("{}/translate", base_url.trim_end_matches('/')),
            source_language: source_language.to_owned(),
        }
    }

    /// Translates `text` to English, retrying once on failure.
    pub async fn translate(&self, text: &str) -> Result<String, TranslationError> {
        match self.request(text).await {
            Ok(translated) => Ok(translated),
            Err(err) => {
                warn!("Translation call failed, retrying once: {}", err);
                self.request(text).await
            }
        }
    }

    async fn request(&self, text: &str) -> Result<String, TranslationError> {
        let body = TranslateRequest {
            text,
            from_lang: &self.source_language,
            to_lang: "en",
        };

        let response = self.http.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(TranslationError::Service(response.status().as_u16()));
        }

        let payload: TranslateResponse = response.json().await?;
        let translated = payload.translated.trim().to_owned();

        if translated.is_empty() {
            return Err(TranslationError::EmptyResult);
        }

        debug!("Translated '{}' to '{}'", text, translated);
        Ok(translated)
    }
}
