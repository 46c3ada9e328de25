use crate::prompt::{parse_items_response, parse_note_prompt, parse_tag_response, tag_prompt};
use crate::{check_status, http_client, ProviderError, ProviderKind, ProviderStatus, TagProvider};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

const TAG_MAX_TOKENS: usize = 150;
const PARSE_MAX_TOKENS: usize = 500;

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    cfg: Arc<GeminiConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(cfg: GeminiConfig) -> Self {
        if cfg.api_key.is_none() {
            warn!("Gemini API key not set; provider will report as not configured");
        }
        Self {
            client: http_client(),
            cfg: Arc::new(cfg),
        }
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.cfg
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured(ProviderKind::Gemini))
    }

    fn model_url(&self, suffix: &str) -> String {
        format!(
            "{}/v1beta/models/{}{}",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.model,
            suffix
        )
    }

    async fn generate(&self, prompt: &str, max_tokens: usize) -> Result<String, ProviderError> {
        let key = self.api_key()?;
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        debug!(model = %self.cfg.model, "gemini generateContent");
        let resp = self
            .client
            .post(self.model_url(":generateContent"))
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;
        let parsed: GenerateResponse = check_status(resp).await?.json().await?;

        Ok(parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl TagProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    fn is_configured(&self) -> bool {
        self.cfg.api_key.is_some()
    }

    async fn test_connection(&self) -> ProviderStatus {
        let Ok(key) = self.api_key() else {
            return ProviderStatus::not_configured(self.kind());
        };
        let result: Result<(), ProviderError> = async {
            let resp = self
                .client
                .get(self.model_url(""))
                .header("x-goog-api-key", key)
                .send()
                .await?;
            check_status(resp).await.map(|_| ())
        }
        .await;
        ProviderStatus::from_result(self.kind(), result)
    }

    async fn suggest_tags(
        &self,
        text: &str,
        vocabulary: &[String],
    ) -> Result<Vec<String>, ProviderError> {
        self.api_key()?;
        if text.trim().is_empty() || vocabulary.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self.generate(&tag_prompt(text, vocabulary), TAG_MAX_TOKENS).await?;
        match parse_tag_response(&raw, vocabulary) {
            Ok(tags) => Ok(tags),
            Err(e) => {
                warn!(error = %e, "gemini returned unusable tag list");
                Ok(Vec::new())
            }
        }
    }

    async fn generate_text(
        &self,
        prompt: &str,
        max_length: usize,
    ) -> Result<String, ProviderError> {
        let text = self.generate(prompt, max_length).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::Generation("empty response from Gemini".into()));
        }
        Ok(text.to_string())
    }

    async fn parse_note(&self, text: &str) -> Result<Vec<String>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let raw = self.generate(&parse_note_prompt(text), PARSE_MAX_TOKENS).await?;
        Ok(parse_items_response(&raw, text))
    }
}
