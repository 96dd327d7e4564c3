// src/services/translator.rs

//! Title translation with a persistent text cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::TranslationConfig;

/// Source text -> translated text.
pub type TranslationCache = BTreeMap<String, String>;

/// Capability to translate one line of text.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate_line(&self, text: &str, target: &str, source: &str) -> Result<String>;
}

/// Client for the public `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate_line(&self, text: &str, target: &str, source: &str) -> Result<String> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?;
        let body: Value = serde_json::from_slice(&response.bytes().await?)?;
        join_segments(&body).ok_or_else(|| {
            AppError::crawl("translation", format!("unexpected response shape for '{text}'"))
        })
    }
}

/// The response is `[[["translated", "source", ...], ...], ...]`; join the
/// first element of every segment.
fn join_segments(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let mut translated = String::new();
    for segment in segments {
        translated.push_str(segment.get(0)?.as_str()?);
    }
    Some(translated)
}

/// Translator that never reaches the network; titles pass through unchanged.
pub struct NoopTranslator;

#[async_trait]
impl Translator for NoopTranslator {
    async fn translate_line(&self, text: &str, _target: &str, _source: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Normalizes titles and translates non-ASCII ones through a cache.
pub struct TranslationGateway {
    translator: Arc<dyn Translator>,
    cache: TranslationCache,
    source_language: String,
    target_language: String,
}

impl TranslationGateway {
    pub fn new(translator: Arc<dyn Translator>, config: &TranslationConfig) -> Self {
        Self {
            translator,
            cache: TranslationCache::new(),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
        }
    }

    /// Seed the gateway with a previously saved cache.
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn into_cache(self) -> TranslationCache {
        self.cache
    }

    /// Translate a title. ASCII titles are returned as-is; a failed
    /// translation falls back to the normalized source text.
    pub async fn translate(&mut self, text: &str) -> String {
        let text = normalize(text);
        if text.is_ascii() {
            return text;
        }
        if let Some(cached) = self.cache.get(&text) {
            log::debug!("Translation cache hit for '{text}'");
            return cached.clone();
        }

        match self
            .translator
            .translate_line(&text, &self.target_language, &self.source_language)
            .await
        {
            Ok(translated) => {
                self.cache.insert(text, translated.clone());
                translated
            }
            Err(e) => {
                log::warn!("Translation failed for '{text}': {e}");
                text
            }
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().replace('\u{2019}', "'")
}
