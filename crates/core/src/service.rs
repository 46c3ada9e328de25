//! Provider-agnostic tagging API with a one-hop fallback.
//!
//! Connection tests, tag suggestion and note parsing never fail from the
//! caller's point of view; only [`TaggingService::generate_text`] returns an
//! error, since there is no sensible text to substitute.

use crate::models::{ComparisonEntry, SuggestionOutcome};
use anyhow::Context;
use futures::future::join_all;
use providers::prompt::single_item;
use providers::{
    restrict_to_vocabulary, Entity, ProviderError, ProviderKind, ProviderRegistry,
    ProviderStatus, TagProvider,
};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_LENGTH: usize = 200;

pub struct TaggingService {
    registry: ProviderRegistry,
    // last write wins; a concurrent switch may route one in-flight call either way
    current: AtomicU8,
}

impl TaggingService {
    pub fn new(registry: ProviderRegistry, default_provider: ProviderKind) -> Self {
        Self {
            registry,
            current: AtomicU8::new(default_provider as u8),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn provider(&self) -> ProviderKind {
        ProviderKind::from_u8(self.current.load(Ordering::Acquire))
            .unwrap_or(ProviderKind::HuggingFace)
    }

    /// Changes the default provider without checking connectivity.
    pub fn set_provider(&self, kind: ProviderKind) {
        self.current.store(kind as u8, Ordering::Release);
        info!(provider = %kind, "default provider changed");
    }

    /// Tests `kind` and makes it the default only when it is reachable.
    pub async fn switch_provider(&self, kind: ProviderKind) -> ProviderStatus {
        let status = self.test_connection(Some(kind)).await;
        if status.connected {
            self.set_provider(kind);
        } else {
            warn!(provider = %kind, error = ?status.error, "not switching to unreachable provider");
        }
        status
    }

    pub async fn test_connection(&self, provider: Option<ProviderKind>) -> ProviderStatus {
        let kind = provider.unwrap_or_else(|| self.provider());
        match self.registry.get(kind) {
            Ok(p) => p.test_connection().await,
            Err(e) => ProviderStatus {
                connected: false,
                api_key_configured: false,
                provider: kind,
                error: Some(e.to_string()),
            },
        }
    }

    pub async fn test_all(&self) -> Vec<ProviderStatus> {
        join_all(ProviderKind::ALL.map(|k| self.test_connection(Some(k)))).await
    }

    /// Runs `call` against `primary`, then once against its fallback if the
    /// first attempt failed. Returns the provider that produced the result.
    async fn with_fallback<T, F, Fut>(
        &self,
        primary: ProviderKind,
        operation: &'static str,
        call: F,
    ) -> (ProviderKind, Result<T, ProviderError>)
    where
        F: Fn(Arc<dyn TagProvider>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let first = match self.registry.get(primary) {
            Ok(p) => call(p).await,
            Err(e) => Err(e),
        };
        let err = match first {
            Ok(v) => return (primary, Ok(v)),
            Err(e) => e,
        };
        let Some(fallback) = self.registry.fallback_for(primary) else {
            warn!(provider = %primary, error = %err, "{operation} failed, no fallback registered");
            return (primary, Err(err));
        };
        let kind = fallback.kind();
        warn!(provider = %primary, fallback = %kind, error = %err, "{operation} failed, falling back");
        (kind, call(fallback).await)
    }

    pub async fn suggest_tags(
        &self,
        text: &str,
        vocabulary: &[String],
        provider: Option<ProviderKind>,
    ) -> SuggestionOutcome {
        let primary = provider.unwrap_or_else(|| self.provider());
        if text.trim().is_empty() || vocabulary.is_empty() {
            return SuggestionOutcome {
                tags: Vec::new(),
                provider: primary,
                error: None,
            };
        }
        let (used, result) = self
            .with_fallback(primary, "tag suggestion", |p| async move {
                p.suggest_tags(text, vocabulary).await
            })
            .await;
        match result {
            Ok(tags) => {
                let tags = restrict_to_vocabulary(tags, vocabulary);
                debug!(provider = %used, ?tags, "tags suggested");
                SuggestionOutcome {
                    tags,
                    provider: used,
                    error: None,
                }
            }
            Err(e) => SuggestionOutcome {
                tags: Vec::new(),
                provider: used,
                error: Some(e.to_string()),
            },
        }
    }

    /// Asks every configured provider concurrently. One provider failing,
    /// or panicking, never affects the others' entries.
    pub async fn compare_providers(
        &self,
        text: &str,
        vocabulary: &[String],
    ) -> BTreeMap<ProviderKind, ComparisonEntry> {
        let text: Arc<str> = Arc::from(text);
        let vocab: Arc<[String]> = Arc::from(vocabulary);
        let (kinds, handles): (Vec<_>, Vec<_>) = self
            .registry
            .providers()
            .into_iter()
            .filter(|p| p.is_configured())
            .map(|p| {
                let text = Arc::clone(&text);
                let vocab = Arc::clone(&vocab);
                let kind = p.kind();
                let handle = tokio::spawn(async move { p.suggest_tags(&text, &vocab).await });
                (kind, handle)
            })
            .unzip();

        let results = join_all(handles).await;
        kinds
            .into_iter()
            .zip(results)
            .map(|(kind, joined)| {
                let entry = match joined {
                    Ok(Ok(tags)) => ComparisonEntry::fulfilled(restrict_to_vocabulary(tags, &vocab)),
                    Ok(Err(e)) => ComparisonEntry::rejected(e.to_string()),
                    Err(e) => ComparisonEntry::rejected(format!("provider task failed: {e}")),
                };
                (kind, entry)
            })
            .collect()
    }

    /// Splits a note into items. Worst case the trimmed note is one item.
    pub async fn parse_note(&self, text: &str, provider: Option<ProviderKind>) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let primary = provider.unwrap_or_else(|| self.provider());
        let (used, result) = self
            .with_fallback(primary, "note parsing", |p| async move { p.parse_note(text).await })
            .await;
        match result {
            Ok(items) if !items.is_empty() => items,
            Ok(_) => single_item(text),
            Err(e) => {
                warn!(provider = %used, error = %e, "note parsing failed, keeping note whole");
                single_item(text)
            }
        }
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        max_length: Option<usize>,
    ) -> anyhow::Result<String> {
        let kind = self.provider();
        let provider = self.registry.get(kind)?;
        provider
            .generate_text(prompt, max_length.unwrap_or(DEFAULT_MAX_LENGTH))
            .await
            .with_context(|| format!("{kind} text generation failed"))
    }

    /// Named entities from the Hugging Face NER model; empty when unavailable.
    pub async fn extract_entities(&self, text: &str) -> Vec<Entity> {
        let result = match self.registry.get(ProviderKind::HuggingFace) {
            Ok(p) => p.extract_entities(text).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            warn!(error = %e, "entity extraction failed");
            Vec::new()
        })
    }
}
