use crate::models::Tag;
use sqlx::SqlitePool;

/// Returns the existing tag (names compare case-insensitively) or creates it.
pub async fn ensure_tag(pool: &SqlitePool, name: &str) -> anyhow::Result<Tag> {
    let name = name.trim();
    anyhow::ensure!(!name.is_empty(), "tag name must not be empty");
    sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(pool)
        .await?;
    let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(tag)
}

/// The tag vocabulary, alphabetical.
pub async fn list_tag_names(pool: &SqlitePool) -> anyhow::Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>("SELECT name FROM tags ORDER BY name COLLATE NOCASE")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

/// Attaches existing or new tags to a note; already attached tags are kept.
pub async fn tag_note(pool: &SqlitePool, note_id: i64, names: &[String]) -> anyhow::Result<()> {
    for name in names {
        let tag = ensure_tag(pool, name).await?;
        sqlx::query("INSERT OR IGNORE INTO note_tags (note_id, tag_id) VALUES (?, ?)")
            .bind(note_id)
            .bind(tag.id)
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn note_tags(pool: &SqlitePool, note_id: i64) -> anyhow::Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT t.name FROM tags t JOIN note_tags nt ON nt.tag_id = t.id WHERE nt.note_id = ? ORDER BY t.name COLLATE NOCASE",
    )
    .bind(note_id)
    .fetch_all(pool)
    .await?;
    Ok(names)
}
