use providers::ProviderKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionOutcome {
    pub tags: Vec<String>,
    pub provider: ProviderKind,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Fulfilled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub status: ComparisonStatus,
    pub tags: Vec<String>,
    pub error: Option<String>,
}

impl ComparisonEntry {
    pub fn fulfilled(tags: Vec<String>) -> Self {
        Self {
            status: ComparisonStatus::Fulfilled,
            tags,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            status: ComparisonStatus::Rejected,
            tags: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// A note stored by [`crate::pipeline::capture`], with the tags it received.
#[derive(Debug, Clone, Serialize)]
pub struct CapturedNote {
    pub id: i64,
    pub body: String,
    pub tags: Vec<String>,
}
