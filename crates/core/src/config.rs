use providers::{gemini, huggingface, openai, ProviderKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub ai: AiConfig,
    pub huggingface: HuggingFaceSettings,
    pub openai: OpenAiSettings,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub default_provider: ProviderKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceSettings {
    pub base_url: String,
    pub classification_model: String,
    pub ner_model: String,
    pub generation_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSettings {
    pub base_url: String,
    pub model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                path: "notetag.db".to_string(),
            },
            ai: AiConfig {
                default_provider: ProviderKind::HuggingFace,
            },
            huggingface: HuggingFaceSettings {
                base_url: huggingface::DEFAULT_BASE_URL.to_string(),
                classification_model: huggingface::DEFAULT_CLASSIFICATION_MODEL.to_string(),
                ner_model: huggingface::DEFAULT_NER_MODEL.to_string(),
                generation_model: huggingface::DEFAULT_GENERATION_MODEL.to_string(),
            },
            openai: OpenAiSettings {
                base_url: openai::DEFAULT_BASE_URL.to_string(),
                model: openai::DEFAULT_CHAT_MODEL.to_string(),
            },
            gemini: GeminiSettings {
                base_url: gemini::DEFAULT_BASE_URL.to_string(),
                model: gemini::DEFAULT_MODEL.to_string(),
            },
        }
    }
}

/// Short environment names that override the file and `NOTETAG__*` values.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ai.default_provider", "AI_PROVIDER"),
    ("huggingface.classification_model", "HUGGINGFACE_MODEL"),
    ("openai.model", "OPENAI_MODEL"),
    ("gemini.model", "GEMINI_MODEL"),
];

pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let defaults = config::Config::try_from(&AppConfig::default())?;
    let mut settings = config::Config::builder().add_source(defaults);
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("NOTETAG")
            .prefix_separator("__")
            .separator("__"),
    );
    for (key, var) in ENV_OVERRIDES {
        let mut value = std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if *key == "ai.default_provider" {
            // aliases such as "hf" or "google" resolve to the canonical name
            value = value
                .map(|v| v.parse::<ProviderKind>().map(|k| k.as_str().to_string()))
                .transpose()?;
        }
        settings = settings.set_override_option(*key, value)?;
    }
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
