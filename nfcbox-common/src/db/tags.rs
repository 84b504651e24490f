//! Queries against the `tags` table

use sqlx::SqlitePool;

use super::models::{TagFields, TagRecord};
use crate::{Error, Result};

/// All rows, in insertion order
pub async fn list_tags(pool: &SqlitePool) -> Result<Vec<TagRecord>> {
    let rows = sqlx::query_as::<_, TagRecord>(
        "SELECT id, tag_id, spotify_uri, media_type, comment FROM tags ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Point read by tag identifier
///
/// Duplicate tag identifiers are allowed; the row with the lowest id wins.
pub async fn find_by_tag_id(pool: &SqlitePool, tag_id: &str) -> Result<Option<TagRecord>> {
    let row = sqlx::query_as::<_, TagRecord>(
        "SELECT id, tag_id, spotify_uri, media_type, comment FROM tags WHERE tag_id = ? ORDER BY id LIMIT 1",
    )
    .bind(tag_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Fetch one row by its row id
pub async fn get_tag(pool: &SqlitePool, id: i64) -> Result<TagRecord> {
    sqlx::query_as::<_, TagRecord>(
        "SELECT id, tag_id, spotify_uri, media_type, comment FROM tags WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("tag row {}", id)))
}

/// Insert a row, returning its id
pub async fn insert_tag(pool: &SqlitePool, fields: &TagFields) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO tags (tag_id, spotify_uri, media_type, comment) VALUES (?, ?, ?, ?)",
    )
    .bind(&fields.tag_id)
    .bind(&fields.spotify_uri)
    .bind(&fields.media_type)
    .bind(&fields.comment)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Overwrite every column of an existing row
pub async fn update_tag(pool: &SqlitePool, id: i64, fields: &TagFields) -> Result<()> {
    let result = sqlx::query(
        "UPDATE tags SET tag_id = ?, spotify_uri = ?, media_type = ?, comment = ? WHERE id = ?",
    )
    .bind(&fields.tag_id)
    .bind(&fields.spotify_uri)
    .bind(&fields.media_type)
    .bind(&fields.comment)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("tag row {}", id)));
    }
    Ok(())
}

/// Delete a row by id
pub async fn delete_tag(pool: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM tags WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("tag row {}", id)));
    }
    Ok(())
}
