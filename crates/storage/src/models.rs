use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub body: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A note with its tag names, as listed to users.
#[derive(Debug, Clone, Serialize)]
pub struct TaggedNote {
    #[serde(flatten)]
    pub note: Note,
    pub tags: Vec<String>,
}
