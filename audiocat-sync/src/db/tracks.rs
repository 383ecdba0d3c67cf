//! Track rows
//!
//! Identity is the file path. Upserts carry the original added-timestamp and
//! its calendar fields forward; they are written only when the row is first
//! inserted.

use audiocat_common::time::AddedStamp;
use audiocat_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// Everything the sync controller writes for one file
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRow {
    pub path: String,
    pub folder_path: String,
    pub album_id: i64,
    pub title: String,
    pub artist: String,
    pub album_artist: String,
    pub album: String,
    pub genre: String,
    pub label: Option<String>,
    pub year: Option<i32>,
    pub track_number: u32,
    pub file_format: String,
    pub duration: Option<f64>,
    pub bitrate: u32,
    pub bit_depth: u32,
    pub sample_rate: u32,
    pub replaygain_track_gain: Option<f64>,
    pub replaygain_track_peak: Option<f64>,
    pub replaygain_album_gain: Option<f64>,
    pub replaygain_album_peak: Option<f64>,
    pub has_lyrics: bool,
    pub last_modified: f64,
    /// Used only when the row is created
    pub added: AddedStamp,
}

/// Stored track, as read back
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTrack {
    pub id: i64,
    pub path: String,
    pub folder_path: String,
    pub album_id: Option<i64>,
    pub title: String,
    pub artist: String,
    pub album_artist: String,
    pub album: String,
    pub genre: String,
    pub year: Option<i32>,
    pub track_number: i64,
    pub bitrate: i64,
    pub replaygain_track_gain: Option<f64>,
    pub has_lyrics: bool,
    pub artwork_path: Option<String>,
    pub last_modified: f64,
    pub added: AddedStamp,
}

/// Insert or update by path, returning the track id
pub async fn upsert_track(conn: &mut SqliteConnection, track: &TrackRow) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO tracks (
            path, folder_path, album_id, title, artist, album_artist, album, genre,
            label, year, track_number, file_format, duration, bitrate, bit_depth,
            sample_rate, replaygain_track_gain, replaygain_track_peak,
            replaygain_album_gain, replaygain_album_peak, has_lyrics, last_modified,
            date_added, added_day, added_week, added_month, added_year
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            folder_path = excluded.folder_path,
            album_id = excluded.album_id,
            title = excluded.title,
            artist = excluded.artist,
            album_artist = excluded.album_artist,
            album = excluded.album,
            genre = excluded.genre,
            label = excluded.label,
            year = excluded.year,
            track_number = excluded.track_number,
            file_format = excluded.file_format,
            duration = excluded.duration,
            bitrate = excluded.bitrate,
            bit_depth = excluded.bit_depth,
            sample_rate = excluded.sample_rate,
            replaygain_track_gain = excluded.replaygain_track_gain,
            replaygain_track_peak = excluded.replaygain_track_peak,
            replaygain_album_gain = excluded.replaygain_album_gain,
            replaygain_album_peak = excluded.replaygain_album_peak,
            has_lyrics = excluded.has_lyrics,
            last_modified = excluded.last_modified
        RETURNING id
        "#,
    )
    .bind(&track.path)
    .bind(&track.folder_path)
    .bind(track.album_id)
    .bind(&track.title)
    .bind(&track.artist)
    .bind(&track.album_artist)
    .bind(&track.album)
    .bind(&track.genre)
    .bind(&track.label)
    .bind(track.year)
    .bind(track.track_number)
    .bind(&track.file_format)
    .bind(track.duration)
    .bind(track.bitrate)
    .bind(track.bit_depth)
    .bind(track.sample_rate)
    .bind(track.replaygain_track_gain)
    .bind(track.replaygain_track_peak)
    .bind(track.replaygain_album_gain)
    .bind(track.replaygain_album_peak)
    .bind(track.has_lyrics)
    .bind(track.last_modified)
    .bind(track.added.date_added)
    .bind(&track.added.added_day)
    .bind(&track.added.added_week)
    .bind(&track.added.added_month)
    .bind(track.added.added_year)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// path → stored last-modified, for change detection
pub async fn load_modified_map(pool: &SqlitePool) -> Result<HashMap<String, f64>> {
    let rows = sqlx::query("SELECT path, last_modified FROM tracks")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get::<String, _>("path"), row.get::<f64, _>("last_modified")))
        .collect())
}

/// Load track by path
pub async fn load_track_by_path(pool: &SqlitePool, path: &str) -> Result<Option<StoredTrack>> {
    let row = sqlx::query(
        r#"
        SELECT id, path, folder_path, album_id, title, artist, album_artist, album, genre,
               year, track_number, bitrate, replaygain_track_gain, has_lyrics, artwork_path,
               last_modified, date_added
        FROM tracks
        WHERE path = ?
        "#,
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| StoredTrack {
        id: row.get("id"),
        path: row.get("path"),
        folder_path: row.get("folder_path"),
        album_id: row.get("album_id"),
        title: row.get("title"),
        artist: row.get("artist"),
        album_artist: row.get("album_artist"),
        album: row.get("album"),
        genre: row.get("genre"),
        year: row.get("year"),
        track_number: row.get("track_number"),
        bitrate: row.get("bitrate"),
        replaygain_track_gain: row.get("replaygain_track_gain"),
        has_lyrics: row.get("has_lyrics"),
        artwork_path: row.get("artwork_path"),
        last_modified: row.get("last_modified"),
        // Calendar fields are re-derived; they are stored only for readers
        added: AddedStamp::from_epoch(row.get("date_added")),
    }))
}

/// Stored calendar fields for a track, as written
pub async fn load_added_fields(
    pool: &SqlitePool,
    path: &str,
) -> Result<Option<(i64, String, String, String, i32)>> {
    let row = sqlx::query_as(
        "SELECT date_added, added_day, added_week, added_month, added_year FROM tracks WHERE path = ?",
    )
    .bind(path)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// (id, path, folder_path, album_id) for every track
///
/// Rows carried over from older catalogs may lack a folder; it reads as `""`.
pub async fn load_locations(pool: &SqlitePool) -> Result<Vec<(i64, String, String, Option<i64>)>> {
    let rows = sqlx::query_as(
        "SELECT id, path, COALESCE(folder_path, '') AS folder_path, album_id FROM tracks ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Delete one track; its placeholder must already be gone or cascade
pub async fn delete_track(conn: &mut SqliteConnection, track_id: i64) -> Result<u64> {
    let deleted = sqlx::query("DELETE FROM tracks WHERE id = ?")
        .bind(track_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(deleted)
}

/// Number of tracks
pub async fn count_tracks(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
