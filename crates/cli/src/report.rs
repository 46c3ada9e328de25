//! Plain-text rendering for command output.

use notetag_core::models::{CapturedNote, ComparisonEntry, ComparisonStatus, SuggestionOutcome};
use providers::{Entity, ProviderKind, ProviderStatus};
use std::collections::BTreeMap;
use storage::models::TaggedNote;

pub fn status_line(status: &ProviderStatus) -> String {
    let state = if status.connected {
        "connected"
    } else if !status.api_key_configured {
        "not configured"
    } else {
        "unreachable"
    };
    match &status.error {
        Some(err) if !status.connected => format!("{:<12} {} ({})", status.provider, state, err),
        _ => format!("{:<12} {}", status.provider, state),
    }
}

pub fn suggestion(outcome: &SuggestionOutcome) -> String {
    let mut out = if outcome.tags.is_empty() {
        format!("no tags suggested [{}]", outcome.provider)
    } else {
        format!("{} [{}]", outcome.tags.join(", "), outcome.provider)
    };
    if let Some(err) = &outcome.error {
        out.push_str(&format!("\nwarning: {err}"));
    }
    out
}

pub fn comparison(results: &BTreeMap<ProviderKind, ComparisonEntry>) -> String {
    if results.is_empty() {
        return "no configured providers to compare".to_string();
    }
    results
        .iter()
        .map(|(kind, entry)| match entry.status {
            ComparisonStatus::Fulfilled if entry.tags.is_empty() => format!("{kind:<12} (none)"),
            ComparisonStatus::Fulfilled => format!("{kind:<12} {}", entry.tags.join(", ")),
            ComparisonStatus::Rejected => format!(
                "{kind:<12} failed: {}",
                entry.error.as_deref().unwrap_or("unknown error")
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn items(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn entities(entities: &[Entity]) -> String {
    if entities.is_empty() {
        return "no entities found".to_string();
    }
    entities
        .iter()
        .map(|e| format!("{:<6} {} ({:.2})", e.group, e.word, e.score))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn captured(notes: &[CapturedNote]) -> String {
    notes
        .iter()
        .map(|n| {
            if n.tags.is_empty() {
                format!("#{} {}", n.id, n.body)
            } else {
                format!("#{} {} [{}]", n.id, n.body, n.tags.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn note_row(note: &TaggedNote) -> String {
    let when = chrono::DateTime::from_timestamp(note.note.created_at, 0)
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", note.tags.join(", "))
    };
    format!("#{:<4} {}  {}{}", note.note.id, when, note.note.body, tags)
}

/// Tags passed on the command line, trimmed and de-duplicated in order.
pub fn vocabulary_from_args(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in raw.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !out.iter().any(|t2| t2.eq_ignore_ascii_case(tag)) {
            out.push(tag.to_string());
        }
    }
    out
}
