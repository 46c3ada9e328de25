use crate::config::AppConfig;
use crate::models::{CapturedNote, SuggestionOutcome};
use crate::service::TaggingService;
use anyhow::Context;
use providers::gemini::{self, GeminiConfig, GeminiProvider};
use providers::huggingface::{self, HuggingFaceConfig, HuggingFaceProvider};
use providers::openai::{self, OpenAiConfig, OpenAiProvider};
use providers::{credential_from_env, ProviderRegistry};
use sqlx::SqlitePool;
use std::sync::Arc;
use storage::{notes, tags};
use tracing::{info, warn};

/// One provider per backend; credentials are read from the environment here
/// and nowhere else.
pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let hf = HuggingFaceProvider::new(HuggingFaceConfig {
        api_key: credential_from_env(huggingface::API_KEY_VARS),
        base_url: config.huggingface.base_url.clone(),
        classification_model: config.huggingface.classification_model.clone(),
        ner_model: config.huggingface.ner_model.clone(),
        generation_model: config.huggingface.generation_model.clone(),
    });
    let openai = OpenAiProvider::new(OpenAiConfig {
        api_key: credential_from_env(openai::API_KEY_VARS),
        base_url: config.openai.base_url.clone(),
        chat_model: config.openai.model.clone(),
    });
    let gemini = GeminiProvider::new(GeminiConfig {
        api_key: credential_from_env(gemini::API_KEY_VARS),
        base_url: config.gemini.base_url.clone(),
        model: config.gemini.model.clone(),
    });

    ProviderRegistry::new()
        .with_provider(Arc::new(hf))
        .with_provider(Arc::new(openai))
        .with_provider(Arc::new(gemini))
}

pub fn build_service(config: &AppConfig) -> TaggingService {
    TaggingService::new(build_registry(config), config.ai.default_provider)
}

/// Suggests tags for a stored note from the stored vocabulary and persists
/// them.
pub async fn auto_tag_note(
    pool: &SqlitePool,
    service: &TaggingService,
    note_id: i64,
) -> anyhow::Result<SuggestionOutcome> {
    let note = notes::get_note(pool, note_id)
        .await?
        .with_context(|| format!("note {note_id} not found"))?;
    let vocabulary = tags::list_tag_names(pool).await.context("load vocabulary")?;
    if vocabulary.is_empty() {
        warn!("no tags defined yet, nothing to suggest from");
    }
    let outcome = service.suggest_tags(&note.body, &vocabulary, None).await;
    if let Some(err) = &outcome.error {
        warn!(note_id, provider = %outcome.provider, error = %err, "tag suggestion failed");
    }
    if !outcome.tags.is_empty() {
        tags::tag_note(pool, note_id, &outcome.tags).await?;
    }
    Ok(outcome)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    /// Split the text into separate notes first.
    pub split: bool,
    pub auto_tag: bool,
}

/// Stores `text` as one note, or one note per parsed item, tagging each when
/// asked to.
pub async fn capture(
    pool: &SqlitePool,
    service: &TaggingService,
    text: &str,
    opts: CaptureOptions,
) -> anyhow::Result<Vec<CapturedNote>> {
    let text = text.trim();
    anyhow::ensure!(!text.is_empty(), "note text must not be empty");

    let items = if opts.split {
        service.parse_note(text, None).await
    } else {
        vec![text.to_string()]
    };

    let mut captured = Vec::with_capacity(items.len());
    for item in items {
        let note = notes::create_note(pool, &item).await?;
        let tags = if opts.auto_tag {
            auto_tag_note(pool, service, note.id).await?.tags
        } else {
            Vec::new()
        };
        captured.push(CapturedNote {
            id: note.id,
            body: note.body,
            tags,
        });
    }
    info!(count = captured.len(), "notes captured");
    Ok(captured)
}
