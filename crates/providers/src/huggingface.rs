use crate::prompt::{single_item, CLASSIFIER_THRESHOLD};
use crate::{
    check_status, http_client, restrict_to_vocabulary, scorer, top_labels,
    ClassificationResult, Entity, ProviderError, ProviderKind, ProviderStatus, TagProvider,
};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_CLASSIFICATION_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_NER_MODEL: &str = "dslim/bert-base-NER";
pub const DEFAULT_GENERATION_MODEL: &str = "gpt2";
pub const API_KEY_VARS: &[&str] = &["HUGGINGFACE_API_KEY", "HF_TOKEN"];

const MIN_ITEM_CHARS: usize = 10;
const MIN_ENTITY_SCORE: f32 = 0.5;
const PING_TEXT: &str = "connection test";

#[derive(Clone)]
pub struct HuggingFaceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub classification_model: String,
    pub ner_model: String,
    pub generation_model: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            classification_model: DEFAULT_CLASSIFICATION_MODEL.to_string(),
            ner_model: DEFAULT_NER_MODEL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
        }
    }
}

impl HuggingFaceConfig {
    /// Whether the classification model can score arbitrary labels remotely.
    pub fn zero_shot_capable(&self) -> bool {
        let model = self.classification_model.to_lowercase();
        ["mnli", "xnli", "zero-shot"].iter().any(|m| model.contains(m))
    }
}

/// Hugging Face Inference API: zero-shot classification, NER and text
/// generation, with local keyword scoring for embedding-only models.
#[derive(Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    cfg: Arc<HuggingFaceConfig>,
}

impl HuggingFaceProvider {
    pub fn new(cfg: HuggingFaceConfig) -> Self {
        if cfg.api_key.is_none() {
            warn!("Hugging Face API key not set; provider will report as not configured");
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
            .ok_or(ProviderError::NotConfigured(ProviderKind::HuggingFace))
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{}", self.cfg.base_url.trim_end_matches('/'), model)
    }

    async fn post<T: serde::Serialize + ?Sized>(
        &self,
        model: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key()?;
        debug!(model, "huggingface inference request");
        let resp = self
            .client
            .post(self.model_url(model))
            .bearer_auth(key)
            .json(body)
            .send()
            .await?;
        check_status(resp).await
    }

    async fn zero_shot(
        &self,
        text: &str,
        vocabulary: &[String],
    ) -> Result<Vec<ClassificationResult>, ProviderError> {
        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "candidate_labels": vocabulary },
        });
        let resp = self.post(&self.cfg.classification_model, &body).await?;
        let raw = resp.bytes().await?;
        let parsed: ZeroShotResponse = serde_json::from_slice(&raw)
            .map_err(|e| ProviderError::Parse(format!("zero-shot response: {e}")))?;
        Ok(parsed.into_results())
    }

    /// Smallest request the classification model's task accepts.
    async fn ping_classifier(&self) -> Result<(), ProviderError> {
        if self.cfg.zero_shot_capable() {
            self.zero_shot(PING_TEXT, &[PING_TEXT.to_string()]).await?;
            return Ok(());
        }
        let body = serde_json::json!({
            "inputs": { "source_sentence": PING_TEXT, "sentences": [PING_TEXT] },
        });
        self.post(&self.cfg.classification_model, &body).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct ZeroShotColumns {
    labels: Vec<String>,
    scores: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Columns(ZeroShotColumns),
    Batched(Vec<ZeroShotColumns>),
    Rows(Vec<LabelScore>),
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

impl ZeroShotColumns {
    fn into_results(self) -> Vec<ClassificationResult> {
        self.labels
            .into_iter()
            .zip(self.scores)
            .map(|(label, score)| ClassificationResult { label, score })
            .collect()
    }
}

impl ZeroShotResponse {
    fn into_results(self) -> Vec<ClassificationResult> {
        match self {
            ZeroShotResponse::Columns(columns) => columns.into_results(),
            ZeroShotResponse::Batched(batch) => batch
                .into_iter()
                .next()
                .map(ZeroShotColumns::into_results)
                .unwrap_or_default(),
            ZeroShotResponse::Rows(rows) => rows
                .into_iter()
                .map(|r| ClassificationResult {
                    label: r.label,
                    score: r.score,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Deserialize)]
struct NerSpan {
    #[serde(alias = "entity")]
    entity_group: String,
    word: String,
    score: f32,
}

/// Splits on sentence terminators and line breaks, keeping fragments longer
/// than ten characters that contain a letter.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for fragment in text.split(|c| matches!(c, '.' | '!' | '?' | '\n')) {
        let fragment = fragment.trim();
        if fragment.chars().count() > MIN_ITEM_CHARS
            && fragment.chars().any(char::is_alphabetic)
            && !items.iter().any(|i| i == fragment)
        {
            items.push(fragment.to_string());
        }
    }
    if items.is_empty() {
        return single_item(text);
    }
    items
}

#[async_trait::async_trait]
impl TagProvider for HuggingFaceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::HuggingFace
    }

    fn is_configured(&self) -> bool {
        self.cfg.api_key.is_some()
    }

    async fn test_connection(&self) -> ProviderStatus {
        if !self.is_configured() {
            return ProviderStatus::not_configured(self.kind());
        }
        ProviderStatus::from_result(self.kind(), self.ping_classifier().await)
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
        if self.cfg.zero_shot_capable() {
            let results = match self.zero_shot(text, vocabulary).await {
                Ok(results) => results,
                Err(ProviderError::Parse(e)) => {
                    warn!(error = %e, "unreadable zero-shot output, no tags");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };
            return Ok(restrict_to_vocabulary(
                top_labels(results, CLASSIFIER_THRESHOLD),
                vocabulary,
            ));
        }
        debug!(
            model = %self.cfg.classification_model,
            "model cannot score labels directly, using keyword relevance"
        );
        Ok(restrict_to_vocabulary(scorer::suggest(text, vocabulary), vocabulary))
    }

    async fn generate_text(
        &self,
        prompt: &str,
        max_length: usize,
    ) -> Result<String, ProviderError> {
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": { "max_new_tokens": max_length, "return_full_text": false },
        });
        let resp = self.post(&self.cfg.generation_model, &body).await?;
        let parsed: Vec<GeneratedText> = resp
            .json()
            .await
            .map_err(|e| ProviderError::Generation(e.to_string()))?;
        parsed
            .into_iter()
            .next()
            .map(|g| g.generated_text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::Generation("empty response from Hugging Face".into()))
    }

    async fn parse_note(&self, text: &str) -> Result<Vec<String>, ProviderError> {
        Ok(split_sentences(text))
    }

    async fn extract_entities(&self, text: &str) -> Result<Vec<Entity>, ProviderError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "aggregation_strategy": "simple" },
        });
        let resp = self.post(&self.cfg.ner_model, &body).await?;
        let spans: Vec<NerSpan> = resp.json().await?;
        let mut entities: Vec<Entity> = Vec::new();
        for span in spans.into_iter().filter(|s| s.score >= MIN_ENTITY_SCORE) {
            let word = span.word.trim().to_string();
            if word.is_empty() || entities.iter().any(|e| e.word.eq_ignore_ascii_case(&word)) {
                continue;
            }
            entities.push(Entity {
                group: span.entity_group,
                word,
                score: span.score,
            });
        }
        Ok(entities)
    }
}
