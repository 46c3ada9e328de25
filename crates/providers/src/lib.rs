//! Provider abstractions for text-AI backends that suggest tags for notes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub mod gemini;
pub mod huggingface;
pub mod openai;
pub mod prompt;
pub mod scorer;

/// Upper bound on tags returned for a single note.
pub const MAX_TAGS: usize = 3;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} API key not configured")]
    NotConfigured(ProviderKind),
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("could not parse model output: {0}")]
    Parse(String),
    #[error("text generation failed: {0}")]
    Generation(String),
    #[error("operation not supported by this provider")]
    Unsupported,
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::RequestFailed(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ProviderKind {
    HuggingFace = 0,
    OpenAi = 1,
    Gemini = 2,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::HuggingFace,
        ProviderKind::OpenAi,
        ProviderKind::Gemini,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| *k as u8 == v)
    }

    /// Providers tried after this one fails, in order. Only the first
    /// registered entry is ever used.
    pub fn fallback_order(&self) -> &'static [ProviderKind] {
        match self {
            ProviderKind::HuggingFace => &[ProviderKind::Gemini],
            ProviderKind::Gemini => &[ProviderKind::HuggingFace],
            ProviderKind::OpenAi => &[ProviderKind::Gemini],
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hf" => Ok(ProviderKind::HuggingFace),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub connected: bool,
    pub api_key_configured: bool,
    pub provider: ProviderKind,
    pub error: Option<String>,
}

impl ProviderStatus {
    pub fn not_configured(provider: ProviderKind) -> Self {
        Self {
            connected: false,
            api_key_configured: false,
            provider,
            error: Some(ProviderError::NotConfigured(provider).to_string()),
        }
    }

    pub fn from_result(provider: ProviderKind, result: Result<(), ProviderError>) -> Self {
        Self {
            connected: result.is_ok(),
            api_key_configured: true,
            provider,
            error: result.err().map(|e| e.to_string()),
        }
    }
}

/// Candidate label with a relevance score in [0, 1]. Never leaves this crate's
/// providers; only used for ranking and threshold filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    pub score: f32,
}

/// Keeps distinct labels above `threshold`, best first, at most [`MAX_TAGS`].
pub fn top_labels(mut results: Vec<ClassificationResult>, threshold: f32) -> Vec<String> {
    results.retain(|r| r.score > threshold);
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut out: Vec<String> = Vec::new();
    for r in results {
        if out.contains(&r.label) {
            continue;
        }
        out.push(r.label);
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub group: String,
    pub word: String,
    pub score: f32,
}

/// Maps candidate labels onto the vocabulary's own spelling, dropping unknown
/// labels and duplicates, and caps the result at [`MAX_TAGS`]. An exact
/// spelling wins over a case-insensitive one.
pub fn restrict_to_vocabulary<I>(candidates: I, vocabulary: &[String]) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for candidate in candidates {
        let needle = candidate.as_ref().trim();
        let exact = vocabulary.iter().find(|v| v.as_str() == needle);
        let Some(tag) = exact.or_else(|| vocabulary.iter().find(|v| v.eq_ignore_ascii_case(needle)))
        else {
            continue;
        };
        if !out.contains(tag) {
            out.push(tag.clone());
        }
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}

#[async_trait::async_trait]
pub trait TagProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn is_configured(&self) -> bool;

    /// Issues a minimal real request. Never fails; problems land in
    /// `ProviderStatus::error`.
    async fn test_connection(&self) -> ProviderStatus;

    /// Up to [`MAX_TAGS`] vocabulary entries relevant to `text`. Malformed
    /// model output yields an empty list; credential and transport failures
    /// are returned so callers can fall back.
    async fn suggest_tags(
        &self,
        text: &str,
        vocabulary: &[String],
    ) -> Result<Vec<String>, ProviderError>;

    async fn generate_text(&self, prompt: &str, max_length: usize)
        -> Result<String, ProviderError>;

    /// Splits a note into distinct items. Unparseable model output yields the
    /// trimmed input as a single item.
    async fn parse_note(&self, text: &str) -> Result<Vec<String>, ProviderError>;

    async fn extract_entities(&self, _text: &str) -> Result<Vec<Entity>, ProviderError> {
        Err(ProviderError::Unsupported)
    }
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn TagProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: Arc<dyn TagProvider>) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn get(&self, kind: ProviderKind) -> Result<Arc<dyn TagProvider>, ProviderError> {
        self.providers
            .get(&kind)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(kind.to_string()))
    }

    pub fn contains(&self, kind: ProviderKind) -> bool {
        self.providers.contains_key(&kind)
    }

    /// Registered providers in [`ProviderKind::ALL`] order.
    pub fn providers(&self) -> Vec<Arc<dyn TagProvider>> {
        ProviderKind::ALL
            .iter()
            .filter_map(|k| self.providers.get(k).cloned())
            .collect()
    }

    /// The single provider to retry with after `kind` fails.
    pub fn fallback_for(&self, kind: ProviderKind) -> Option<Arc<dyn TagProvider>> {
        kind.fallback_order()
            .iter()
            .filter(|k| **k != kind)
            .find_map(|k| self.providers.get(k).cloned())
    }
}

/// Turns a non-2xx response into [`ProviderError::Api`], preferring the
/// provider's own error message when the body carries one.
pub(crate) async fn check_status(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.bytes().await.unwrap_or(bytes::Bytes::from_static(b""));
    Err(ProviderError::Api {
        status: status.as_u16(),
        body: api_error_message(&body),
    })
}

fn api_error_message(body: &[u8]) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        let err = v.get("error")?;
        err.get("message")
            .and_then(|m| m.as_str())
            .or_else(|| err.as_str())
            .map(str::to_string)
    });
    message.unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string())
}

/// Reads an API key from the first set, non-empty variable.
pub fn credential_from_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| std::env::var(n).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .unwrap_or_default()
}
