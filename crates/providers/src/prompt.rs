//! Prompts and output parsing shared by the generative providers.

use crate::{restrict_to_vocabulary, ClassificationResult, ProviderError};
use serde::Deserialize;

/// Minimum model-reported confidence for a generated tag.
pub const CLASSIFIER_THRESHOLD: f32 = 0.1;

pub fn tag_prompt(text: &str, vocabulary: &[String]) -> String {
    format!(
        "You label personal notes with tags.\n\
         Allowed tags: {}\n\
         Pick at most 3 allowed tags that describe the note. Use only tags from the list.\n\
         Respond with a JSON array only, for example [{{\"tag\": \"work\", \"score\": 0.9}}], \
         where score is your confidence between 0 and 1.\n\
         Note:\n{}",
        serde_json::to_string(vocabulary).unwrap_or_default(),
        text.trim()
    )
}

pub fn parse_note_prompt(text: &str) -> String {
    format!(
        "Split the following note into separate, self-contained items such as tasks, \
         reminders or ideas. Keep the original wording.\n\
         Respond with a JSON array of strings only.\n\
         Note:\n{}",
        text.trim()
    )
}

/// The outermost `[...]` in model output, ignoring code fences and prose.
fn json_array_slice(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagItem {
    Plain(String),
    Scored {
        #[serde(alias = "label", alias = "name")]
        tag: String,
        #[serde(default = "full_confidence", alias = "confidence")]
        score: f32,
    },
}

fn full_confidence() -> f32 {
    1.0
}

/// Parses a generated tag list and keeps entries from `vocabulary` scoring
/// above [`CLASSIFIER_THRESHOLD`].
pub fn parse_tag_response(raw: &str, vocabulary: &[String]) -> Result<Vec<String>, ProviderError> {
    let slice = json_array_slice(raw)
        .ok_or_else(|| ProviderError::Parse("no JSON array in response".into()))?;
    let items: Vec<TagItem> =
        serde_json::from_str(slice).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let mut results: Vec<ClassificationResult> = items
        .into_iter()
        .map(|item| match item {
            TagItem::Plain(tag) => ClassificationResult { label: tag, score: 1.0 },
            TagItem::Scored { tag, score } => ClassificationResult { label: tag, score },
        })
        .filter(|r| r.score > CLASSIFIER_THRESHOLD)
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    // duplicates and unknown labels are dropped before the cap is applied
    Ok(restrict_to_vocabulary(results.into_iter().map(|r| r.label), vocabulary))
}

/// Parses a generated item list; anything unusable falls back to the trimmed
/// note as a single item.
pub fn parse_items_response(raw: &str, original: &str) -> Vec<String> {
    let parsed = json_array_slice(raw)
        .and_then(|slice| serde_json::from_str::<Vec<String>>(slice).ok())
        .unwrap_or_default();
    let mut items: Vec<String> = Vec::new();
    for item in parsed.into_iter().map(|s| s.trim().to_string()) {
        if !item.is_empty() && !items.contains(&item) {
            items.push(item);
        }
    }
    if items.is_empty() {
        tracing::debug!("model output was not a usable item list, keeping note whole");
        return single_item(original);
    }
    items
}

pub fn single_item(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Vec::new()
    } else {
        vec![trimmed.to_string()]
    }
}
