use crate::models::{Note, TaggedNote};
use crate::tags;
use sqlx::SqlitePool;

pub async fn create_note(pool: &SqlitePool, body: &str) -> anyhow::Result<Note> {
    let now = chrono::Utc::now().timestamp();
    let id = sqlx::query("INSERT INTO notes (body, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .last_insert_rowid();
    tracing::debug!(id, "note created");
    Ok(Note {
        id,
        body: body.to_string(),
        created_at: now,
        updated_at: now,
    })
}

pub async fn get_note(pool: &SqlitePool, id: i64) -> anyhow::Result<Option<Note>> {
    let note = sqlx::query_as::<_, Note>(
        "SELECT id, body, created_at, updated_at FROM notes WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(note)
}

/// Newest first.
pub async fn list_notes(pool: &SqlitePool) -> anyhow::Result<Vec<TaggedNote>> {
    let notes = sqlx::query_as::<_, Note>(
        "SELECT id, body, created_at, updated_at FROM notes ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;
    let mut out = Vec::with_capacity(notes.len());
    for note in notes {
        let tags = tags::note_tags(pool, note.id).await?;
        out.push(TaggedNote { note, tags });
    }
    Ok(out)
}

/// Returns false when no such note existed.
pub async fn delete_note(pool: &SqlitePool, id: i64) -> anyhow::Result<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM note_tags WHERE note_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM notes WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tx.commit().await?;
    Ok(deleted > 0)
}
