//! Genre reference rows

use crate::extractors::tag_fields::UNKNOWN_GENRE;
use audiocat_common::time::epoch_now;
use audiocat_common::Result;
use sqlx::{SqliteConnection, SqlitePool};

/// Insert `name` if missing; the unknown-genre sentinel is never stored
///
/// Returns rows written.
pub async fn ensure_genre(conn: &mut SqliteConnection, name: &str) -> Result<u64> {
    if name == UNKNOWN_GENRE || name.trim().is_empty() {
        return Ok(0);
    }

    let written = sqlx::query("INSERT OR IGNORE INTO genres (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(epoch_now())
        .execute(&mut *conn)
        .await?
        .rows_affected();

    Ok(written)
}

/// All genre names, sorted
pub async fn list_genres(pool: &SqlitePool) -> Result<Vec<String>> {
    let names = sqlx::query_scalar("SELECT name FROM genres ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(names)
}
