//! Release rows
//!
//! A release is keyed by (artist_id, name). Its folder set is stored as the
//! sorted, distinct folder paths joined with [`FOLDER_SEPARATOR`].

use audiocat_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, BTreeSet};

/// Separator between folder paths in `albums.folder_paths`
pub const FOLDER_SEPARATOR: char = '|';

/// Release attributes taken from the canonical folder tuple
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseFields<'a> {
    pub artist_id: i64,
    pub name: &'a str,
    pub year: Option<i32>,
    pub genre: &'a str,
    pub label: Option<&'a str>,
}

/// Release record
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub id: i64,
    pub artist_id: i64,
    pub name: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub label: Option<String>,
    pub folder_paths: Vec<String>,
    pub track_count: i64,
    pub bitrate_range: Option<String>,
    pub artwork_path: Option<String>,
    pub updated_at: i64,
}

/// Split a stored folder set
pub fn split_folders(joined: &str) -> Vec<String> {
    joined
        .split(FOLDER_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join folders into the stored form (sorted, distinct)
pub fn join_folders<'a>(folders: impl IntoIterator<Item = &'a str>) -> String {
    let set: BTreeSet<&str> = folders.into_iter().filter(|s| !s.is_empty()).collect();
    set.into_iter().collect::<Vec<_>>().join(&FOLDER_SEPARATOR.to_string())
}

/// Find or create the release, refreshing its attributes when stale
///
/// An existing row is rewritten only if `updated_at` is at least
/// `staleness_secs` older than `now`. Returns `(id, rows_written)`.
pub async fn ensure_release(
    conn: &mut SqliteConnection,
    fields: &ReleaseFields<'_>,
    now: i64,
    staleness_secs: i64,
) -> Result<(i64, u64)> {
    let existing: Option<(i64, i64)> =
        sqlx::query_as("SELECT id, updated_at FROM albums WHERE artist_id = ? AND name = ?")
            .bind(fields.artist_id)
            .bind(fields.name)
            .fetch_optional(&mut *conn)
            .await?;

    match existing {
        None => {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO albums (artist_id, name, year, genre, label, folder_paths,
                                    track_count, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, '', 0, ?, ?)
                RETURNING id
                "#,
            )
            .bind(fields.artist_id)
            .bind(fields.name)
            .bind(fields.year)
            .bind(fields.genre)
            .bind(fields.label)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
            Ok((id, 1))
        }
        Some((id, updated_at)) if now - updated_at >= staleness_secs => {
            let written = sqlx::query(
                "UPDATE albums SET year = ?, genre = ?, label = ?, updated_at = ? WHERE id = ?",
            )
            .bind(fields.year)
            .bind(fields.genre)
            .bind(fields.label)
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
            Ok((id, written))
        }
        Some((id, _)) => Ok((id, 0)),
    }
}

/// Add `folder` to the release's folder set if absent
pub async fn merge_folder(conn: &mut SqliteConnection, album_id: i64, folder: &str) -> Result<u64> {
    let stored: String = sqlx::query_scalar("SELECT folder_paths FROM albums WHERE id = ?")
        .bind(album_id)
        .fetch_one(&mut *conn)
        .await?;

    let mut folders = split_folders(&stored);
    if folders.iter().any(|f| f == folder) {
        return Ok(0);
    }
    folders.push(folder.to_string());

    set_folders(conn, album_id, &join_folders(folders.iter().map(String::as_str))).await
}

/// Overwrite the stored folder set
pub async fn set_folders(conn: &mut SqliteConnection, album_id: i64, joined: &str) -> Result<u64> {
    let written = sqlx::query("UPDATE albums SET folder_paths = ? WHERE id = ?")
        .bind(joined)
        .bind(album_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(written)
}

/// (id, folder set) for every release
pub async fn load_folder_sets(pool: &SqlitePool) -> Result<Vec<(i64, Vec<String>)>> {
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, folder_paths FROM albums ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, joined)| (id, split_folders(&joined)))
        .collect())
}

/// Recompute track counts and folder sets from live track rows
///
/// Only releases whose stored value differs are written.
pub async fn refresh_aggregates(pool: &SqlitePool) -> Result<u64> {
    let mut written = sqlx::query(
        r#"
        UPDATE albums
        SET track_count = (SELECT COUNT(*) FROM tracks WHERE tracks.album_id = albums.id)
        WHERE track_count != (SELECT COUNT(*) FROM tracks WHERE tracks.album_id = albums.id)
        "#,
    )
    .execute(pool)
    .await?
    .rows_affected();

    let members: Vec<(i64, String)> = sqlx::query_as(
        "SELECT DISTINCT album_id, folder_path FROM tracks WHERE album_id IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    let mut live: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
    for (album_id, folder) in members {
        live.entry(album_id).or_default().insert(folder);
    }

    let stored_sets = load_folder_sets(pool).await?;
    let mut conn = pool.acquire().await?;
    for (album_id, stored) in stored_sets {
        // Empty releases keep their set until pruned
        let Some(folders) = live.get(&album_id) else { continue };
        let expected = join_folders(folders.iter().map(String::as_str));
        if join_folders(stored.iter().map(String::as_str)) != expected {
            written += set_folders(&mut conn, album_id, &expected).await?;
        }
    }

    Ok(written)
}

/// Delete a release row; member tracks must be gone first
pub async fn delete_release(conn: &mut SqliteConnection, album_id: i64) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM albums WHERE id = ?")
        .bind(album_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(deleted)
}

/// Releases that no track references
pub async fn load_empty_release_ids(pool: &SqlitePool) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar(
        r#"
        SELECT a.id FROM albums a
        WHERE NOT EXISTS (SELECT 1 FROM tracks t WHERE t.album_id = a.id)
        ORDER BY a.id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Load release by artist name and release name
pub async fn load_release(pool: &SqlitePool, artist: &str, name: &str) -> Result<Option<Release>> {
    let row = sqlx::query(
        r#"
        SELECT a.id, a.artist_id, a.name, a.year, a.genre, a.label, a.folder_paths,
               a.track_count, a.bitrate_range, a.artwork_path, a.updated_at
        FROM albums a
        JOIN artists ar ON ar.id = a.artist_id
        WHERE ar.name = ? AND a.name = ?
        "#,
    )
    .bind(artist)
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Release {
        id: row.get("id"),
        artist_id: row.get("artist_id"),
        name: row.get("name"),
        year: row.get("year"),
        genre: row.get("genre"),
        label: row.get("label"),
        folder_paths: split_folders(&row.get::<String, _>("folder_paths")),
        track_count: row.get("track_count"),
        bitrate_range: row.get("bitrate_range"),
        artwork_path: row.get("artwork_path"),
        updated_at: row.get("updated_at"),
    }))
}

/// Number of releases
pub async fn count_releases(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM albums")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
