use crate::prompt::{parse_items_response, parse_note_prompt, parse_tag_response, tag_prompt};
use crate::{check_status, http_client, ProviderError, ProviderKind, ProviderStatus, TagProvider};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const API_KEY_VARS: &[&str] = &["OPENAI_API_KEY"];

const TAG_MAX_TOKENS: usize = 150;
const PARSE_MAX_TOKENS: usize = 500;

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    cfg: Arc<OpenAiConfig>,
}

impl OpenAiProvider {
    pub fn new(cfg: OpenAiConfig) -> Self {
        if cfg.api_key.is_none() {
            warn!("OpenAI API key not set; provider will report as not configured");
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
            .ok_or(ProviderError::NotConfigured(ProviderKind::OpenAi))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    async fn chat(&self, prompt: &str, max_tokens: usize) -> Result<String, ProviderError> {
        #[derive(serde::Serialize)]
        struct ChatMessage<'a> {
            role: &'static str,
            content: &'a str,
        }
        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: usize,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChatMessageResp,
        }
        #[derive(Deserialize)]
        struct ChatMessageResp {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct ChatApiResponse {
            choices: Vec<Choice>,
        }

        let key = self.api_key()?;
        let body = ChatRequest {
            model: &self.cfg.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        debug!(model = %self.cfg.chat_model, "openai chat completion");
        let resp = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let parsed: ChatApiResponse = check_status(resp).await?.json().await?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl TagProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
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
                .get(self.url("/v1/models"))
                .bearer_auth(key)
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
        let raw = self.chat(&tag_prompt(text, vocabulary), TAG_MAX_TOKENS).await?;
        match parse_tag_response(&raw, vocabulary) {
            Ok(tags) => Ok(tags),
            Err(e) => {
                warn!(error = %e, "openai returned unusable tag list");
                Ok(Vec::new())
            }
        }
    }

    async fn generate_text(
        &self,
        prompt: &str,
        max_length: usize,
    ) -> Result<String, ProviderError> {
        let text = self.chat(prompt, max_length).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::Generation("empty response from OpenAI".into()));
        }
        Ok(text.to_string())
    }

    async fn parse_note(&self, text: &str) -> Result<Vec<String>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let raw = self.chat(&parse_note_prompt(text), PARSE_MAX_TOKENS).await?;
        Ok(parse_items_response(&raw, text))
    }
}
