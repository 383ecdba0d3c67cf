//! Run-level behavior: fatal conditions, action flags, catalog evolution

mod helpers;

use audiocat_sync::db::{albums, tracks};
use audiocat_sync::services::{RunLock, ScanError};
use audiocat_sync::{Action, ActionFlags, SyncError};
use helpers::{assert_has_column, bump_mtime, open_test_catalog, FixtureTags, Library};
use sqlx::Row;

#[tokio::test]
async fn missing_root_fails_before_catalog_is_touched() {
    let lib = Library::new();
    let mut options = lib.options(ActionFlags::default());
    options.root = Some(lib.root.join("does-not-exist"));

    let result = lib.run_with(&options).await;
    assert!(matches!(
        result,
        Err(SyncError::RootPathInvalid(ScanError::PathNotFound(_)))
    ));
    assert!(!lib.catalog.exists());
    assert!(!RunLock::path_for(&lib.catalog).exists());
}

#[tokio::test]
async fn unconfigured_root_is_fatal() {
    let lib = Library::new();
    let mut options = lib.options(ActionFlags::default());
    options.root = None;

    let result = lib.run_with(&options).await;
    assert!(matches!(
        result,
        Err(SyncError::RootPathInvalid(ScanError::NotConfigured))
    ));
    assert!(!lib.catalog.exists());
}

#[tokio::test]
async fn concurrent_run_is_refused() {
    let lib = Library::new();
    let _held = RunLock::acquire(&lib.catalog).unwrap();

    let result = lib.run_with(&lib.options(ActionFlags::default())).await;
    assert!(matches!(result, Err(SyncError::Locked(_))));
}

#[tokio::test]
async fn lock_is_released_after_run() {
    let lib = Library::new();
    lib.run().await;
    let _next = RunLock::acquire(&lib.catalog).unwrap();
}

#[tokio::test]
async fn lock_left_by_killed_run_does_not_block() {
    let lib = Library::new();
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R"));
    // A killed process leaves its lock file behind but holds no lock
    std::fs::write(RunLock::path_for(&lib.catalog), "4194304999\n").unwrap();

    let summary = lib.run_with(&lib.options(ActionFlags::default())).await.unwrap();
    assert_eq!(summary.sync.upserted, 1);
}

#[tokio::test]
async fn derived_only_needs_no_root() {
    let lib = Library::new();
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R").bitrate(192));
    lib.run().await;

    let mut options = lib.options(ActionFlags {
        derived_only: true,
        ..Default::default()
    });
    options.root = None;

    let summary = lib.run_with(&options).await.unwrap();
    assert_eq!(summary.actions, vec![Action::DerivedAttributes]);
    assert_eq!(summary.sync.files_seen, 0);
    assert!(summary.failed_phases.is_empty());
}

#[tokio::test]
async fn orphans_only_skips_sync() {
    let lib = Library::new();
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R"));
    lib.write("R/02.mp3", &FixtureTags::new("2", "A", "R"));
    lib.run().await;

    std::fs::remove_file(lib.root.join("R/02.mp3")).unwrap();
    lib.write("New/01.mp3", &FixtureTags::new("n", "B", "New"));

    let summary = lib
        .run_with(&lib.options(ActionFlags {
            orphans_only: true,
            ..Default::default()
        }))
        .await
        .unwrap();
    assert_eq!(summary.actions, vec![Action::PruneOrphans]);
    assert_eq!(summary.prune.tracks_pruned, 1);

    let pool = open_test_catalog(&lib.catalog).await;
    assert_eq!(tracks::count_tracks(&pool).await.unwrap(), 1);
    assert!(albums::load_release(&pool, "B", "New").await.unwrap().is_none());
    pool.close().await;
}

#[tokio::test]
async fn maintenance_and_upgrade_report() {
    let lib = Library::new();
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R"));
    lib.run().await;

    let mut options = lib.options(ActionFlags {
        upgrade_schema: true,
        maintenance: true,
        ..Default::default()
    });
    options.root = None;

    let summary = lib.run_with(&options).await.unwrap();
    assert_eq!(summary.actions, vec![Action::UpgradeSchema, Action::Maintenance]);
    assert!(summary.schema.is_noop());
    assert!(summary.schema_upgrade.unwrap().is_noop());

    let maintenance = summary.maintenance.unwrap();
    assert_eq!(maintenance.fts_rebuilt, 3);
    assert!(maintenance.indexes_rebuilt > 0);
}

#[tokio::test]
async fn older_catalog_gains_columns_and_keeps_rows() {
    let lib = Library::new();

    // Catalog written by an older release: fewer columns, one existing row
    {
        let pool = open_test_catalog(&lib.catalog).await;
        sqlx::query(
            "CREATE TABLE tracks (id INTEGER PRIMARY KEY AUTOINCREMENT, path TEXT NOT NULL UNIQUE, title TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO tracks (path, title) VALUES ('/old/song.mp3', 'Old Song')")
            .execute(&pool)
            .await
            .unwrap();
        pool.close().await;
    }

    let mut options = lib.options(ActionFlags {
        upgrade_schema: true,
        ..Default::default()
    });
    options.root = None;
    let summary = lib.run_with(&options).await.unwrap();
    assert!(summary.schema.columns_added > 0);

    let pool = open_test_catalog(&lib.catalog).await;
    assert_has_column(&pool, "tracks", "album_id").await;
    assert_has_column(&pool, "tracks", "added_week").await;
    assert_has_column(&pool, "tracks", "bitrate").await;

    let row = sqlx::query("SELECT title, bitrate, album_id, folder_path FROM tracks WHERE path = '/old/song.mp3'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<String, _>("title"), "Old Song");
    assert_eq!(row.get::<i64, _>("bitrate"), 0);
    assert_eq!(row.get::<Option<i64>, _>("album_id"), None);
    assert_eq!(row.get::<String, _>("folder_path"), "");
    pool.close().await;

    // The upgraded catalog goes through a full pipeline; the legacy row is an orphan
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R"));
    let summary = lib.run().await;
    assert!(summary.failed_phases.is_empty(), "{summary}");
    assert_eq!(summary.sync.upserted, 1);
    assert_eq!(summary.prune.tracks_pruned, 1);

    let pool = open_test_catalog(&lib.catalog).await;
    assert_eq!(tracks::count_tracks(&pool).await.unwrap(), 1);
    assert!(tracks::load_track_by_path(&pool, &lib.stored("R/01.mp3"))
        .await
        .unwrap()
        .is_some());
    pool.close().await;
}

#[tokio::test]
async fn summary_serializes_to_json() {
    let lib = Library::new();
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R"));
    let summary = lib.run().await;

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["sync"]["upserted"], 1);
    assert_eq!(json["actions"][0], "sync");
    assert!(json.get("maintenance").is_none());
}

/// Make the catalog reject `event` on tracks matching `condition`
async fn reject_tracks(lib: &Library, event: &str, condition: &str) {
    let pool = open_test_catalog(&lib.catalog).await;
    let sql = format!(
        "CREATE TRIGGER reject_{} BEFORE {} ON tracks WHEN {} BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        event.to_lowercase(),
        event,
        condition
    );
    sqlx::query(&sql).execute(&pool).await.unwrap();
    pool.close().await;
}

async fn allow_tracks(lib: &Library, events: &[&str]) {
    let pool = open_test_catalog(&lib.catalog).await;
    for event in events {
        let sql = format!("DROP TRIGGER reject_{}", event.to_lowercase());
        sqlx::query(&sql).execute(&pool).await.unwrap();
    }
    pool.close().await;
}

#[tokio::test]
async fn failed_write_keeps_old_mtime_and_is_retried() {
    let lib = Library::new();
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R"));
    lib.write("R/02.mp3", &FixtureTags::new("2", "A", "R"));
    lib.run().await;

    let target = lib.stored("R/01.mp3");
    let pool = open_test_catalog(&lib.catalog).await;
    let before = tracks::load_track_by_path(&pool, &target).await.unwrap().unwrap();
    pool.close().await;

    let condition = format!("NEW.path = '{target}'");
    reject_tracks(&lib, "INSERT", &condition).await;
    reject_tracks(&lib, "UPDATE", &condition).await;

    let edited = lib.write("R/01.mp3", &FixtureTags::new("1 (remaster)", "A", "R"));
    bump_mtime(&edited, 60);

    let summary = lib.run().await;
    assert_eq!(summary.sync.write_failed, 1);
    assert_eq!(summary.sync.upserted, 0);
    assert_eq!(summary.errors(), 1);
    assert!(summary.failed_phases.is_empty());

    let pool = open_test_catalog(&lib.catalog).await;
    let after_failure = tracks::load_track_by_path(&pool, &target).await.unwrap().unwrap();
    assert_eq!(after_failure.last_modified, before.last_modified);
    assert_eq!(after_failure.title, "1");
    pool.close().await;

    allow_tracks(&lib, &["INSERT", "UPDATE"]).await;

    let retry = lib.run().await;
    assert_eq!(retry.sync.upserted, 1);
    assert_eq!(retry.errors(), 0);

    let pool = open_test_catalog(&lib.catalog).await;
    let retried = tracks::load_track_by_path(&pool, &target).await.unwrap().unwrap();
    assert!(retried.last_modified > before.last_modified);
    assert_eq!(retried.title, "1 (remaster)");
    assert_eq!(retried.id, before.id);
    pool.close().await;
}

#[tokio::test]
async fn failed_phase_does_not_stop_later_phases() {
    let lib = Library::new();
    lib.write("R/01.mp3", &FixtureTags::new("1", "A", "R"));
    lib.write("R/02.mp3", &FixtureTags::new("2", "A", "R"));
    lib.run().await;

    reject_tracks(&lib, "DELETE", "1").await;
    std::fs::remove_file(lib.root.join("R/02.mp3")).unwrap();
    std::fs::write(lib.root.join("R/Folder.jpg"), b"jpeg").unwrap();

    let summary = lib.run_with(&lib.options(ActionFlags::default())).await.unwrap();
    assert_eq!(summary.failed_phases, vec![Action::PruneOrphans.to_string()]);
    assert_eq!(summary.derived.artwork_assigned, 1);
    assert!(summary.to_string().contains("Failed phases:    prune_orphans"));

    let pool = open_test_catalog(&lib.catalog).await;
    assert_eq!(tracks::count_tracks(&pool).await.unwrap(), 2);
    pool.close().await;

    allow_tracks(&lib, &["DELETE"]).await;
    let summary = lib.run().await;
    assert!(summary.failed_phases.is_empty());
    assert_eq!(summary.prune.tracks_pruned, 1);
}
