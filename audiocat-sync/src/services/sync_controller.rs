//! Sync controller
//!
//! Second pass over the tree. Files whose stored modification time is at
//! least the on-disk one are skipped; the rest are read on blocking workers
//! and written one file per transaction, in walk order. Unreadable files and
//! failed writes are counted and logged, and never abort the pass.

use crate::db::{albums, artists, genres, links, tracks};
use crate::error::SyncResult;
use crate::extractors::tag_fields::normalize_artist;
use crate::extractors::{ContainerFamily, TagSource, TrackTags};
use crate::services::file_scanner::FileScanner;
use crate::services::folder_resolver::{FolderScan, FolderTuple};
use audiocat_common::time::{epoch_now, system_time_to_epoch_secs, AddedStamp};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tracing target for per-file failures; the binary can route it to its own file
pub const FILE_ERRORS_TARGET: &str = "audiocat::file_errors";

/// Sync pass tuning
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Ignore stored modification times and re-read every file
    pub full_rescan: bool,
    /// Concurrent tag readers
    pub workers: usize,
    /// Minimum age before an existing release row is refreshed
    pub release_staleness_secs: i64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            full_rescan: false,
            workers: 4,
            release_staleness_secs: 168 * 3600,
        }
    }
}

/// Sync pass counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub files_seen: usize,
    pub unchanged: usize,
    pub upserted: usize,
    /// Tags could not be read (or the reader task died)
    pub unreadable: usize,
    /// Tags were read but the transaction failed
    pub write_failed: usize,
    pub rows_written: u64,
}

impl SyncReport {
    /// Files that failed for any reason
    pub fn errors(&self) -> usize {
        self.unreadable + self.write_failed
    }
}

/// A file that needs reading
#[derive(Debug, Clone)]
struct Candidate {
    path: PathBuf,
    family: ContainerFamily,
    mtime: f64,
}

/// Stored modification time is authoritative unless a full rescan was requested
fn is_unchanged(stored: Option<f64>, on_disk: f64, full_rescan: bool) -> bool {
    !full_rescan && stored.is_some_and(|stored| stored >= on_disk)
}

/// Sync controller service
pub struct SyncController {
    pool: SqlitePool,
    source: Arc<dyn TagSource>,
    options: SyncOptions,
}

impl SyncController {
    pub fn new(pool: SqlitePool, source: Arc<dyn TagSource>, options: SyncOptions) -> Self {
        Self { pool, source, options }
    }

    /// Walk `root` again and reconcile every changed file with the catalog
    pub async fn run(&self, folders: &FolderScan, root: &Path) -> SyncResult<SyncReport> {
        let walk_root = root.to_path_buf();
        let tree = tokio::task::spawn_blocking(move || FileScanner::new().scan(&walk_root)).await??;

        let mut report = SyncReport {
            files_seen: tree.files.len(),
            ..Default::default()
        };

        let known = tracks::load_modified_map(&self.pool).await?;
        let candidates = self.select_candidates(tree.files, &known, &mut report);

        tracing::info!(
            files = report.files_seen,
            unchanged = report.unchanged,
            to_read = candidates.len(),
            workers = self.options.workers,
            "Sync pass starting"
        );

        // Reads run concurrently; `buffered` hands results back in walk order
        // so writes stay serialized and deterministic.
        let source = Arc::clone(&self.source);
        let reads = stream::iter(candidates)
            .map(move |candidate| {
                let source = Arc::clone(&source);
                async move {
                    let path = candidate.path.clone();
                    let family = candidate.family;
                    let result =
                        tokio::task::spawn_blocking(move || source.read_tags(&path, family)).await;
                    (candidate, result)
                }
            })
            .buffered(self.options.workers.max(1));
        let mut reads = std::pin::pin!(reads);

        while let Some((candidate, joined)) = reads.next().await {
            let tags = match joined {
                Ok(Ok(tags)) => tags,
                Ok(Err(e)) => {
                    report.unreadable += 1;
                    tracing::error!(
                        target: FILE_ERRORS_TARGET,
                        path = %candidate.path.display(),
                        error = %e,
                        "Unreadable file"
                    );
                    continue;
                }
                Err(e) => {
                    report.unreadable += 1;
                    tracing::error!(
                        target: FILE_ERRORS_TARGET,
                        path = %candidate.path.display(),
                        error = %e,
                        "Tag reader task failed"
                    );
                    continue;
                }
            };

            match self.write_file(&candidate, &tags, folders).await {
                Ok(rows) => {
                    report.upserted += 1;
                    report.rows_written += rows;
                }
                Err(e) => {
                    report.write_failed += 1;
                    tracing::error!(
                        target: FILE_ERRORS_TARGET,
                        path = %candidate.path.display(),
                        error = %e,
                        "Catalog write failed"
                    );
                }
            }
        }

        // Unchanged files from older catalogs may predate their placeholder row
        match links::fill_missing_placeholders(&self.pool).await {
            Ok(rows) => report.rows_written += rows,
            Err(e) => tracing::warn!("Failed to backfill track link rows: {}", e),
        }
        match albums::refresh_aggregates(&self.pool).await {
            Ok(rows) => report.rows_written += rows,
            Err(e) => tracing::warn!("Failed to refresh release aggregates: {}", e),
        }

        tracing::info!(
            upserted = report.upserted,
            unreadable = report.unreadable,
            write_failed = report.write_failed,
            rows_written = report.rows_written,
            "Sync pass completed"
        );

        Ok(report)
    }

    fn select_candidates(
        &self,
        files: Vec<PathBuf>,
        known: &HashMap<String, f64>,
        report: &mut SyncReport,
    ) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        for path in files {
            let Some(family) = ContainerFamily::from_path(&path) else { continue };

            let mtime = match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(modified) => system_time_to_epoch_secs(modified),
                Err(e) => {
                    report.unreadable += 1;
                    tracing::error!(
                        target: FILE_ERRORS_TARGET,
                        path = %path.display(),
                        error = %e,
                        "Cannot stat file"
                    );
                    continue;
                }
            };

            let stored = known.get(&*path.to_string_lossy()).copied();
            if is_unchanged(stored, mtime, self.options.full_rescan) {
                report.unchanged += 1;
                continue;
            }

            candidates.push(Candidate { path, family, mtime });
        }

        candidates
    }

    /// One file, one transaction. Returns rows written.
    async fn write_file(
        &self,
        candidate: &Candidate,
        tags: &TrackTags,
        folders: &FolderScan,
    ) -> SyncResult<u64> {
        let folder = candidate.path.parent().unwrap_or_else(|| Path::new(""));
        // Folders first seen by this walk (created after the resolve pass) fall back to the file itself
        let tuple = folders
            .tuple_for(folder)
            .cloned()
            .unwrap_or_else(|| FolderTuple::from_tags(tags));
        let folder_path = folder.to_string_lossy().into_owned();
        let now = epoch_now();

        let mut tx = self.pool.begin().await?;
        let mut rows = 0;

        let (artist_id, written) = artists::ensure_artist(&mut *tx, &normalize_artist(&tuple.artist)).await?;
        rows += written;

        let release = albums::ReleaseFields {
            artist_id,
            name: &tuple.album,
            year: tuple.year,
            genre: &tuple.genre,
            label: tuple.label.as_deref(),
        };
        let (album_id, written) =
            albums::ensure_release(&mut *tx, &release, now, self.options.release_staleness_secs).await?;
        rows += written;
        rows += albums::merge_folder(&mut *tx, album_id, &folder_path).await?;

        let row = tracks::TrackRow {
            path: candidate.path.to_string_lossy().into_owned(),
            folder_path,
            album_id,
            title: tags.title.clone(),
            artist: tags.artist.clone(),
            album_artist: tuple.artist.clone(),
            album: tuple.album.clone(),
            // Release-level text comes from the folder tuple; title and artist credit stay per file
            genre: tuple.genre.clone(),
            label: tuple.label.clone(),
            year: tuple.year,
            track_number: tags.track_number,
            file_format: tags.family.label().to_string(),
            duration: tags.duration_secs,
            bitrate: tags.bitrate_kbps,
            bit_depth: tags.bit_depth,
            sample_rate: tags.sample_rate,
            replaygain_track_gain: tags.replay_gain.track_gain,
            replaygain_track_peak: tags.replay_gain.track_peak,
            replaygain_album_gain: tags.replay_gain.album_gain,
            replaygain_album_peak: tags.replay_gain.album_peak,
            has_lyrics: tags.has_lyrics,
            last_modified: candidate.mtime,
            added: AddedStamp::from_epoch(now),
        };
        let track_id = tracks::upsert_track(&mut *tx, &row).await?;
        rows += 1;

        rows += genres::ensure_genre(&mut *tx, &tuple.genre).await?;
        rows += links::ensure_placeholder(&mut *tx, track_id).await?;

        tx.commit().await?;

        tracing::debug!(path = %row.path, track_id, album_id, "Track written");
        Ok(rows)
    }
}
