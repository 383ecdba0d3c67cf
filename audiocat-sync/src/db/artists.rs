//! Artist rows
//!
//! Created lazily on first reference, never updated or pruned here.

use audiocat_common::time::epoch_now;
use audiocat_common::Result;
use sqlx::{SqliteConnection, SqlitePool};

/// Id for `name`, inserting the row if missing
///
/// Returns `(id, rows_written)`.
pub async fn ensure_artist(conn: &mut SqliteConnection, name: &str) -> Result<(i64, u64)> {
    let written = sqlx::query("INSERT OR IGNORE INTO artists (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(epoch_now())
        .execute(&mut *conn)
        .await?
        .rows_affected();

    let id: i64 = sqlx::query_scalar("SELECT id FROM artists WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;

    Ok((id, written))
}

/// All artist names, sorted
pub async fn list_artist_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let names = sqlx::query_scalar("SELECT name FROM artists ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SchemaManager;

    #[tokio::test]
    async fn test_ensure_artist_is_idempotent() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        SchemaManager::ensure(&pool).await;

        let mut conn = pool.acquire().await.unwrap();
        let (first_id, first_rows) = ensure_artist(&mut conn, "Test Artist").await.unwrap();
        let (second_id, second_rows) = ensure_artist(&mut conn, "Test Artist").await.unwrap();
        drop(conn);

        assert_eq!(first_id, second_id);
        assert_eq!(first_rows, 1);
        assert_eq!(second_rows, 0);

        let stored_id: i64 = sqlx::query_scalar("SELECT id FROM artists WHERE name = 'Test Artist'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stored_id, first_id);
        assert_eq!(list_artist_names(&pool).await.unwrap(), vec!["Test Artist"]);
    }
}
