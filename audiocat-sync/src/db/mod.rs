//! Catalog access
//!
//! Row-level repositories are free functions over a connection. Writers that
//! take part in a per-file transaction accept `&mut SqliteConnection`; whole-
//! catalog passes take the pool. Every writer reports `rows_affected` so
//! callers can account for writes.

pub mod albums;
pub mod artists;
pub mod genres;
pub mod links;
pub mod schema;
pub mod tracks;

pub use schema::{MaintenanceReport, SchemaManager, SchemaReport};

use audiocat_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the catalog and bring its schema up to date
pub async fn open_and_ensure(db_path: &Path) -> Result<(SqlitePool, SchemaReport)> {
    let pool = audiocat_common::db::open_catalog(db_path).await?;
    let report = SchemaManager::ensure(&pool).await;
    Ok((pool, report))
}
