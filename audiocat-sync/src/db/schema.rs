//! Catalog schema
//!
//! Table definitions are the single source of truth for the catalog shape.
//! [`SchemaManager::ensure`] brings any prior catalog (empty, older, current)
//! to this shape additively: tables and columns are created when absent,
//! secondary indexes, full-text shadow tables and their triggers likewise.
//! Nothing is dropped, renamed or retyped, and no failure aborts startup.

use audiocat_common::db::{ColumnDefinition, SchemaIntrospector, SchemaSync, TableSchema, TableSyncOutcome};
use audiocat_common::time::epoch_now;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

/// Highest schema revision this binary knows about
pub const SCHEMA_VERSION: i64 = 1;

// ============================================================================
// Tables
// ============================================================================

/// Artists: append-only reference data keyed by normalized name
pub struct ArtistsTable;

impl TableSchema for ArtistsTable {
    fn table_name() -> &'static str {
        "artists"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").autoincrement(),
            ColumnDefinition::new("name", "TEXT").not_null().unique(),
            // Filled by enrichment collaborators
            ColumnDefinition::new("bio", "TEXT"),
            ColumnDefinition::new("tags", "TEXT"),
            ColumnDefinition::new("created_at", "INTEGER").not_null().default("0"),
        ]
    }
}

/// Releases, keyed by (artist_id, name)
pub struct AlbumsTable;

impl TableSchema for AlbumsTable {
    fn table_name() -> &'static str {
        "albums"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").autoincrement(),
            ColumnDefinition::new("artist_id", "INTEGER")
                .not_null()
                .references("artists(id)"),
            ColumnDefinition::new("name", "TEXT").not_null(),
            ColumnDefinition::new("year", "INTEGER"),
            ColumnDefinition::new("genre", "TEXT"),
            ColumnDefinition::new("label", "TEXT"),
            // Distinct contributing folders, sorted, joined with '|'
            ColumnDefinition::new("folder_paths", "TEXT").not_null().default("''"),
            ColumnDefinition::new("track_count", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("bitrate_range", "TEXT"),
            ColumnDefinition::new("artwork_path", "TEXT"),
            ColumnDefinition::new("created_at", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("updated_at", "INTEGER").not_null().default("0"),
        ]
    }

    fn table_constraints() -> Vec<&'static str> {
        vec!["UNIQUE(artist_id, name)"]
    }
}

/// Tracks, one per audio file, keyed by path
pub struct TracksTable;

impl TableSchema for TracksTable {
    fn table_name() -> &'static str {
        "tracks"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").autoincrement(),
            ColumnDefinition::new("path", "TEXT").not_null().unique(),
            // Defaults let ADD COLUMN keep NOT NULL on catalogs with existing rows
            ColumnDefinition::new("folder_path", "TEXT").not_null().default("''"),
            ColumnDefinition::new("album_id", "INTEGER").references("albums(id)"),
            // Denormalized text
            ColumnDefinition::new("title", "TEXT").not_null().default("''"),
            ColumnDefinition::new("artist", "TEXT").not_null().default("''"),
            ColumnDefinition::new("album_artist", "TEXT").not_null().default("''"),
            ColumnDefinition::new("album", "TEXT").not_null().default("''"),
            ColumnDefinition::new("genre", "TEXT").not_null().default("''"),
            ColumnDefinition::new("label", "TEXT"),
            ColumnDefinition::new("year", "INTEGER"),
            ColumnDefinition::new("track_number", "INTEGER").not_null().default("0"),
            // Technical
            ColumnDefinition::new("file_format", "TEXT"),
            ColumnDefinition::new("duration", "REAL"),
            ColumnDefinition::new("bitrate", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("bit_depth", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("sample_rate", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("replaygain_track_gain", "REAL"),
            ColumnDefinition::new("replaygain_track_peak", "REAL"),
            ColumnDefinition::new("replaygain_album_gain", "REAL"),
            ColumnDefinition::new("replaygain_album_peak", "REAL"),
            ColumnDefinition::new("has_lyrics", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("artwork_path", "TEXT"),
            // Provenance
            ColumnDefinition::new("last_modified", "REAL").not_null().default("0"),
            ColumnDefinition::new("date_added", "INTEGER").not_null().default("0"),
            ColumnDefinition::new("added_day", "TEXT"),
            ColumnDefinition::new("added_week", "TEXT"),
            ColumnDefinition::new("added_month", "TEXT"),
            ColumnDefinition::new("added_year", "INTEGER"),
        ]
    }
}

/// Genres: reference-only, never attached to tracks by key
pub struct GenresTable;

impl TableSchema for GenresTable {
    fn table_name() -> &'static str {
        "genres"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").autoincrement(),
            ColumnDefinition::new("name", "TEXT").not_null().unique(),
            ColumnDefinition::new("created_at", "INTEGER").not_null().default("0"),
        ]
    }
}

/// Enrichment placeholder, one per track; URL columns belong to link enrichers
pub struct TrackLinksTable;

impl TableSchema for TrackLinksTable {
    fn table_name() -> &'static str {
        "track_links"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("track_id", "INTEGER")
                .primary_key()
                .references("tracks(id) ON DELETE CASCADE"),
            ColumnDefinition::new("musicbrainz_url", "TEXT"),
            ColumnDefinition::new("spotify_url", "TEXT"),
            ColumnDefinition::new("youtube_url", "TEXT"),
            ColumnDefinition::new("lyrics_url", "TEXT"),
            ColumnDefinition::new("updated_at", "INTEGER"),
        ]
    }
}

/// Informational revision record
pub struct SchemaVersionTable;

impl TableSchema for SchemaVersionTable {
    fn table_name() -> &'static str {
        "schema_version"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("version", "INTEGER").primary_key(),
            ColumnDefinition::new("applied_at", "INTEGER").not_null().default("0"),
        ]
    }
}

// ============================================================================
// Indexes and full-text shadow tables
// ============================================================================

/// Secondary indexes: (name, DDL)
pub const INDEXES: &[(&str, &str)] = &[
    ("idx_tracks_album_id", "CREATE INDEX idx_tracks_album_id ON tracks(album_id)"),
    ("idx_tracks_folder_path", "CREATE INDEX idx_tracks_folder_path ON tracks(folder_path)"),
    ("idx_tracks_artist", "CREATE INDEX idx_tracks_artist ON tracks(artist)"),
    ("idx_tracks_album_artist", "CREATE INDEX idx_tracks_album_artist ON tracks(album_artist)"),
    ("idx_tracks_genre", "CREATE INDEX idx_tracks_genre ON tracks(genre)"),
    ("idx_tracks_date_added", "CREATE INDEX idx_tracks_date_added ON tracks(date_added)"),
    ("idx_albums_artist_id", "CREATE INDEX idx_albums_artist_id ON albums(artist_id)"),
];

/// FTS5 external-content table mirroring text columns of a base table
#[derive(Debug, Clone, Copy)]
pub struct FtsTable {
    pub name: &'static str,
    pub base: &'static str,
    pub columns: &'static [&'static str],
}

pub const FTS_TABLES: &[FtsTable] = &[
    FtsTable {
        name: "tracks_fts",
        base: "tracks",
        columns: &["title", "artist", "album", "genre"],
    },
    FtsTable {
        name: "artists_fts",
        base: "artists",
        columns: &["name", "bio", "tags"],
    },
    FtsTable {
        name: "albums_fts",
        base: "albums",
        columns: &["name", "genre"],
    },
];

impl FtsTable {
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE VIRTUAL TABLE {} USING fts5({}, content='{}', content_rowid='id')",
            self.name,
            self.columns.join(", "),
            self.base
        )
    }

    /// Insert/delete/update triggers: (name, DDL)
    pub fn triggers(&self) -> Vec<(String, String)> {
        let cols = self.columns.join(", ");
        let new_vals = self.prefixed("new");
        let old_vals = self.prefixed("old");

        let insert = format!("INSERT INTO {fts}(rowid, {cols}) VALUES (new.id, {new_vals});", fts = self.name);
        let delete = format!(
            "INSERT INTO {fts}({fts}, rowid, {cols}) VALUES ('delete', old.id, {old_vals});",
            fts = self.name
        );

        vec![
            (
                format!("{}_ai", self.name),
                format!(
                    "CREATE TRIGGER {}_ai AFTER INSERT ON {} BEGIN {} END",
                    self.name, self.base, insert
                ),
            ),
            (
                format!("{}_ad", self.name),
                format!(
                    "CREATE TRIGGER {}_ad AFTER DELETE ON {} BEGIN {} END",
                    self.name, self.base, delete
                ),
            ),
            (
                format!("{}_au", self.name),
                format!(
                    "CREATE TRIGGER {}_au AFTER UPDATE ON {} BEGIN {} {} END",
                    self.name, self.base, delete, insert
                ),
            ),
        ]
    }

    fn prefixed(&self, row: &str) -> String {
        self.columns
            .iter()
            .map(|c| format!("{}.{}", row, c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Schema Manager
// ============================================================================

/// What one ensure pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaReport {
    pub tables_created: usize,
    pub columns_added: usize,
    pub indexes_created: usize,
    pub fts_tables_created: usize,
    pub triggers_created: usize,
    pub warnings: Vec<String>,
}

impl SchemaReport {
    /// True when the pass found nothing to do
    pub fn is_noop(&self) -> bool {
        self.tables_created == 0
            && self.columns_added == 0
            && self.indexes_created == 0
            && self.fts_tables_created == 0
            && self.triggers_created == 0
    }

    fn absorb(&mut self, table: &str, outcome: TableSyncOutcome) {
        if outcome.created {
            self.tables_created += 1;
        }
        self.columns_added += outcome.columns_added.len();
        for column in outcome.columns_added {
            info!("Added column {}.{}", table, column);
        }
        self.warnings.extend(outcome.warnings);
    }

    fn warn(&mut self, what: impl Into<String>) {
        let what = what.into();
        warn!("Schema: {}", what);
        self.warnings.push(what);
    }
}

/// Maintenance pass outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaintenanceReport {
    pub indexes_rebuilt: usize,
    pub fts_rebuilt: usize,
    pub warnings: Vec<String>,
}

/// Catalog initializer/upgrader
pub struct SchemaManager;

impl SchemaManager {
    /// Bring the catalog to the expected shape
    ///
    /// Idempotent and additive. Individual statement failures become warnings
    /// in the report; callers discover real breakage from their own queries.
    pub async fn ensure(pool: &SqlitePool) -> SchemaReport {
        let mut report = SchemaReport::default();

        // Referenced tables before referencing ones
        Self::table::<ArtistsTable>(pool, &mut report).await;
        Self::table::<AlbumsTable>(pool, &mut report).await;
        Self::table::<TracksTable>(pool, &mut report).await;
        Self::table::<GenresTable>(pool, &mut report).await;
        Self::table::<TrackLinksTable>(pool, &mut report).await;
        Self::table::<SchemaVersionTable>(pool, &mut report).await;

        for (name, sql) in INDEXES {
            match SchemaSync::ensure_object(pool, "index", name, sql).await {
                Ok(true) => report.indexes_created += 1,
                Ok(false) => {}
                Err(e) => report.warn(format!("index {} failed: {}", name, e)),
            }
        }

        for fts in FTS_TABLES {
            Self::fts_table(pool, fts, &mut report).await;
        }

        if let Err(e) = Self::record_version(pool).await {
            report.warn(format!("schema_version record failed: {}", e));
        }

        if report.is_noop() {
            debug!("Catalog schema up to date ({} warnings)", report.warnings.len());
        } else {
            info!(
                "Catalog schema updated: {} tables, {} columns, {} indexes, {} FTS tables, {} triggers",
                report.tables_created,
                report.columns_added,
                report.indexes_created,
                report.fts_tables_created,
                report.triggers_created
            );
        }

        report
    }

    /// Explicit upgrade request: ensure, then log the resulting shape per table
    pub async fn upgrade(pool: &SqlitePool) -> SchemaReport {
        info!("=== Schema upgrade ===");
        let report = Self::ensure(pool).await;

        for table in [
            ArtistsTable::table_name(),
            AlbumsTable::table_name(),
            TracksTable::table_name(),
            GenresTable::table_name(),
            TrackLinksTable::table_name(),
            SchemaVersionTable::table_name(),
        ] {
            match SchemaIntrospector::introspect_table(pool, table).await {
                Ok(columns) => info!("  {}: {} columns", table, columns.len()),
                Err(e) => warn!("  {}: introspection failed: {}", table, e),
            }
        }

        report
    }

    /// Rebuild indexes and FTS data, refresh statistics, compact storage
    ///
    /// Never run implicitly.
    pub async fn maintenance(pool: &SqlitePool) -> MaintenanceReport {
        info!("=== Catalog maintenance ===");
        let mut report = MaintenanceReport::default();

        for (name, sql) in INDEXES {
            let drop = format!("DROP INDEX IF EXISTS {}", name);
            let rebuilt = async {
                sqlx::query(&drop).execute(pool).await?;
                sqlx::query(sql).execute(pool).await?;
                Ok::<_, sqlx::Error>(())
            }
            .await;

            match rebuilt {
                Ok(()) => report.indexes_rebuilt += 1,
                Err(e) => Self::maintenance_warning(&mut report, format!("index {}: {}", name, e)),
            }
        }

        for fts in FTS_TABLES {
            let sql = format!("INSERT INTO {0}({0}) VALUES ('rebuild')", fts.name);
            match sqlx::query(&sql).execute(pool).await {
                Ok(_) => report.fts_rebuilt += 1,
                Err(e) => Self::maintenance_warning(&mut report, format!("FTS {}: {}", fts.name, e)),
            }
        }

        for statement in [
            "ANALYZE",
            "PRAGMA optimize",
            "VACUUM",
            "PRAGMA journal_mode = WAL",
            "PRAGMA synchronous = NORMAL",
        ] {
            if let Err(e) = sqlx::query(statement).execute(pool).await {
                Self::maintenance_warning(&mut report, format!("{}: {}", statement, e));
            }
        }

        info!(
            "Maintenance complete: {} indexes rebuilt, {} FTS tables rebuilt",
            report.indexes_rebuilt, report.fts_rebuilt
        );

        report
    }

    async fn table<T: TableSchema>(pool: &SqlitePool, report: &mut SchemaReport) {
        match SchemaSync::ensure_table::<T>(pool).await {
            Ok(outcome) => report.absorb(T::table_name(), outcome),
            Err(e) => report.warn(format!("table {} failed: {}", T::table_name(), e)),
        }
    }

    async fn fts_table(pool: &SqlitePool, fts: &FtsTable, report: &mut SchemaReport) {
        match SchemaSync::ensure_object(pool, "table", fts.name, &fts.create_sql()).await {
            Ok(true) => {
                report.fts_tables_created += 1;
                // Index rows that predate the shadow table
                let rebuild = format!("INSERT INTO {0}({0}) VALUES ('rebuild')", fts.name);
                if let Err(e) = sqlx::query(&rebuild).execute(pool).await {
                    report.warn(format!("FTS {} initial rebuild failed: {}", fts.name, e));
                }
            }
            Ok(false) => {}
            Err(e) => {
                report.warn(format!("FTS table {} failed: {}", fts.name, e));
                return;
            }
        }

        for (name, sql) in fts.triggers() {
            match SchemaSync::ensure_object(pool, "trigger", &name, &sql).await {
                Ok(true) => report.triggers_created += 1,
                Ok(false) => {}
                Err(e) => report.warn(format!("trigger {} failed: {}", name, e)),
            }
        }
    }

    async fn record_version(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(SCHEMA_VERSION)
            .bind(epoch_now())
            .execute(pool)
            .await?;
        Ok(())
    }

    fn maintenance_warning(report: &mut MaintenanceReport, what: String) {
        warn!("Maintenance: {}", what);
        report.warnings.push(what);
    }
}
