//! Derived release attributes
//!
//! Whole-catalog passes run after sync and pruning:
//! - artwork: first matching image in any of the release's folders,
//!   propagated to its tracks
//! - bitrate range: `"min-max"` (or a single value) over member tracks
//!
//! Both passes write only values that differ from what is stored, so a
//! second run over an unchanged catalog writes nothing.

use crate::error::SyncResult;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Artwork file stems, in preference order
pub const ARTWORK_NAMES: [&str; 5] = ["cover", "folder", "front", "album", "albumart"];

/// Artwork extensions, in preference order
pub const ARTWORK_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Derived-pass counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedReport {
    /// Releases whose artwork path changed
    pub artwork_assigned: usize,
    /// Releases whose bitrate range changed
    pub bitrate_ranges_written: usize,
    pub rows_written: u64,
}

/// Per-run memo of folder → artwork lookups
///
/// Owned by one derived pass and dropped with it; never shared between runs.
#[derive(Debug, Default)]
pub struct ArtworkCache {
    probed: HashMap<PathBuf, Option<PathBuf>>,
}

impl ArtworkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artwork for `folder`, probing the filesystem at most once per folder
    pub fn lookup(&mut self, folder: &Path) -> Option<PathBuf> {
        if let Some(found) = self.probed.get(folder) {
            return found.clone();
        }
        let found = find_artwork(folder);
        self.probed.insert(folder.to_path_buf(), found.clone());
        found
    }

    /// Folders probed so far
    pub fn len(&self) -> usize {
        self.probed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probed.is_empty()
    }
}

/// First artwork file in `folder` by name then extension preference
///
/// Names match case-insensitively. An unreadable folder has no artwork.
pub fn find_artwork(folder: &Path) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(folder = %folder.display(), error = %e, "Artwork probe skipped");
            return None;
        }
    };

    // Sorted so that case-only collisions resolve the same way every run
    let mut by_lower_name: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut names: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
        .collect();
    names.sort();
    for (name, path) in names {
        by_lower_name.entry(name.to_lowercase()).or_insert(path);
    }

    ARTWORK_NAMES.iter().find_map(|stem| {
        ARTWORK_EXTENSIONS
            .iter()
            .find_map(|ext| by_lower_name.get(&format!("{stem}.{ext}")).cloned())
    })
}

/// `"128-320"`, or `"320"` when every track shares one bitrate
pub fn format_bitrate_range(min: i64, max: i64) -> String {
    if min == max {
        min.to_string()
    } else {
        format!("{min}-{max}")
    }
}

/// Assign release artwork and copy it onto member tracks
///
/// Returns `(releases changed, rows written)`.
pub async fn update_artwork(pool: &SqlitePool, cache: &mut ArtworkCache) -> SyncResult<(usize, u64)> {
    let members: Vec<(i64, String)> = sqlx::query_as(
        "SELECT DISTINCT album_id, folder_path FROM tracks WHERE album_id IS NOT NULL",
    )
    .fetch_all(pool)
    .await?;

    let mut folders_by_album: BTreeMap<i64, BTreeSet<String>> = BTreeMap::new();
    for (album_id, folder) in members {
        folders_by_album.entry(album_id).or_default().insert(folder);
    }

    let stored: HashMap<i64, Option<String>> = sqlx::query_as("SELECT id, artwork_path FROM albums")
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect();

    let mut assigned = 0;
    let mut rows = 0;
    let mut conn = pool.acquire().await?;

    for (album_id, folders) in folders_by_album {
        let found = folders
            .iter()
            .find_map(|folder| cache.lookup(Path::new(folder)))
            .map(|path| path.to_string_lossy().into_owned());

        if stored.get(&album_id) != Some(&found) {
            rows += sqlx::query("UPDATE albums SET artwork_path = ? WHERE id = ?")
                .bind(&found)
                .bind(album_id)
                .execute(&mut *conn)
                .await?
                .rows_affected();
            assigned += 1;
        }

        rows += sqlx::query(
            "UPDATE tracks SET artwork_path = ? WHERE album_id = ? AND artwork_path IS NOT ?",
        )
        .bind(&found)
        .bind(album_id)
        .bind(&found)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }

    tracing::info!(
        releases_changed = assigned,
        folders_probed = cache.len(),
        "Artwork pass completed"
    );

    Ok((assigned, rows))
}

/// Recompute every release's bitrate range
///
/// Tracks with unknown bitrate (0) are ignored; a release with none left
/// gets NULL. Returns `(releases changed, rows written)`.
pub async fn update_bitrate_ranges(pool: &SqlitePool) -> SyncResult<(usize, u64)> {
    let ranges: HashMap<i64, String> = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT album_id, MIN(bitrate), MAX(bitrate) FROM tracks
        WHERE album_id IS NOT NULL AND bitrate > 0
        GROUP BY album_id
        "#,
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(album_id, min, max)| (album_id, format_bitrate_range(min, max)))
    .collect();

    let stored: Vec<(i64, Option<String>)> = sqlx::query_as("SELECT id, bitrate_range FROM albums ORDER BY id")
        .fetch_all(pool)
        .await?;

    let mut changed = 0;
    let mut rows = 0;
    let mut conn = pool.acquire().await?;

    for (album_id, current) in stored {
        let expected = ranges.get(&album_id).cloned();
        if current == expected {
            continue;
        }
        rows += sqlx::query("UPDATE albums SET bitrate_range = ? WHERE id = ?")
            .bind(&expected)
            .bind(album_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        changed += 1;
    }

    tracing::info!(releases_changed = changed, "Bitrate range pass completed");

    Ok((changed, rows))
}
