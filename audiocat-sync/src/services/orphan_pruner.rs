//! Orphan pruning
//!
//! Removes catalog rows whose files or folders no longer exist under the
//! root. Runs in three steps:
//! 1. Releases: every stored folder gone → the release and its tracks go;
//!    some folders gone → tracks in those folders go and the set shrinks.
//! 2. Tracks whose file was not seen by the walk.
//! 3. Releases left with no tracks.
//!
//! Track deletion removes the link placeholder first. Anything beneath a
//! directory the walk could not read is left alone.

use crate::db::{albums, links, tracks};
use crate::error::SyncResult;
use crate::services::file_scanner::ScannedTree;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Pruning counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PruneReport {
    pub releases_pruned: usize,
    pub tracks_pruned: usize,
    /// Folders dropped from releases that kept at least one folder
    pub folders_dropped: usize,
    pub rows_written: u64,
}

/// Prune everything `tree` no longer contains
pub async fn prune_orphans(pool: &SqlitePool, tree: &ScannedTree) -> SyncResult<PruneReport> {
    let observed_files: HashSet<String> = tree
        .files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    let observed_folders: HashSet<String> = tree
        .folders
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();

    let mut report = PruneReport::default();

    if !tree.incomplete.is_empty() {
        tracing::warn!(
            unreadable = tree.incomplete.len(),
            "Walk was incomplete, rows beneath unreadable entries are kept"
        );
    }

    prune_releases(pool, tree, &observed_folders, &mut report).await?;
    prune_tracks(pool, tree, &observed_files, &mut report).await?;

    let empty = albums::load_empty_release_ids(pool).await?;
    if !empty.is_empty() {
        let mut tx = pool.begin().await?;
        for album_id in empty {
            let deleted = albums::delete_release(&mut *tx, album_id).await?;
            report.releases_pruned += deleted as usize;
            report.rows_written += deleted;
        }
        tx.commit().await?;
    }

    report.rows_written += albums::refresh_aggregates(pool).await?;

    tracing::info!(
        releases_pruned = report.releases_pruned,
        tracks_pruned = report.tracks_pruned,
        folders_dropped = report.folders_dropped,
        "Orphan pruning completed"
    );

    Ok(report)
}

async fn prune_releases(
    pool: &SqlitePool,
    tree: &ScannedTree,
    observed_folders: &HashSet<String>,
    report: &mut PruneReport,
) -> SyncResult<()> {
    // album → (track id, folder) of its members
    let mut members: HashMap<i64, Vec<(i64, String)>> = HashMap::new();
    for (track_id, _path, folder, album_id) in tracks::load_locations(pool).await? {
        if let Some(album_id) = album_id {
            members.entry(album_id).or_default().push((track_id, folder));
        }
    }

    for (album_id, folders) in albums::load_folder_sets(pool).await? {
        if folders.is_empty() {
            continue;
        }
        let (kept, gone): (Vec<String>, Vec<String>) = folders
            .into_iter()
            .partition(|f| observed_folders.contains(f) || tree.is_unobserved(Path::new(f)));
        if gone.is_empty() {
            continue;
        }

        let album_members = members.remove(&album_id).unwrap_or_default();
        let mut tx = pool.begin().await?;

        if kept.is_empty() {
            for (track_id, _) in &album_members {
                delete_track(&mut *tx, *track_id, report).await?;
            }
            report.rows_written += albums::delete_release(&mut *tx, album_id).await?;
            report.releases_pruned += 1;
            tracing::debug!(album_id, "Release pruned, every folder gone");
        } else {
            for (track_id, folder) in &album_members {
                if gone.contains(folder) {
                    delete_track(&mut *tx, *track_id, report).await?;
                }
            }
            let joined = albums::join_folders(kept.iter().map(String::as_str));
            report.rows_written += albums::set_folders(&mut *tx, album_id, &joined).await?;
            report.folders_dropped += gone.len();
            tracing::debug!(album_id, dropped = gone.len(), "Release folder set shrunk");
        }

        tx.commit().await?;
    }

    Ok(())
}

async fn prune_tracks(
    pool: &SqlitePool,
    tree: &ScannedTree,
    observed_files: &HashSet<String>,
    report: &mut PruneReport,
) -> SyncResult<()> {
    let missing: Vec<i64> = tracks::load_locations(pool)
        .await?
        .into_iter()
        .filter(|(_, path, _, _)| !observed_files.contains(path) && !tree.is_unobserved(Path::new(path)))
        .map(|(track_id, ..)| track_id)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for track_id in missing {
        delete_track(&mut *tx, track_id, report).await?;
    }
    tx.commit().await?;

    Ok(())
}

async fn delete_track(conn: &mut SqliteConnection, track_id: i64, report: &mut PruneReport) -> SyncResult<()> {
    report.rows_written += links::delete_placeholder(conn, track_id).await?;
    let deleted = tracks::delete_track(conn, track_id).await?;
    report.tracks_pruned += deleted as usize;
    report.rows_written += deleted;
    Ok(())
}
