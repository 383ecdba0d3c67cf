//! Enrichment placeholder rows
//!
//! The catalog guarantees one `track_links` row per track; the URL columns
//! belong to link-enrichment collaborators and are never written here.

use audiocat_common::Result;
use sqlx::{SqliteConnection, SqlitePool};

/// Create the placeholder for one track if missing
pub async fn ensure_placeholder(conn: &mut SqliteConnection, track_id: i64) -> Result<u64> {
    let written = sqlx::query("INSERT OR IGNORE INTO track_links (track_id) VALUES (?)")
        .bind(track_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(written)
}

/// Create every missing placeholder in one statement
pub async fn fill_missing_placeholders(pool: &SqlitePool) -> Result<u64> {
    let written = sqlx::query(
        r#"
        INSERT OR IGNORE INTO track_links (track_id)
        SELECT t.id FROM tracks t
        LEFT JOIN track_links l ON l.track_id = t.id
        WHERE l.track_id IS NULL
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();
    Ok(written)
}

/// Remove the placeholder of a track about to be deleted
pub async fn delete_placeholder(conn: &mut SqliteConnection, track_id: i64) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM track_links WHERE track_id = ?")
        .bind(track_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(deleted)
}

/// Number of placeholder rows
pub async fn count_placeholders(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM track_links")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
