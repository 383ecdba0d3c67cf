//! Database Test Utilities
//!
//! Catalog access and schema inspection for assertions

use sqlx::SqlitePool;
use std::path::Path;

/// Column information from PRAGMA table_info
#[derive(Debug, sqlx::FromRow)]
pub struct ColumnInfo {
    pub cid: i32,
    pub name: String,
    pub r#type: String,
    pub notnull: i32,
    pub dflt_value: Option<String>,
    pub pk: i32,
}

/// Open a catalog written by a run
///
/// Close the pool before starting another run against the same file.
pub async fn open_test_catalog(path: &Path) -> SqlitePool {
    audiocat_common::db::open_catalog(path).await.unwrap()
}

/// Get table schema information
pub async fn get_table_columns(pool: &SqlitePool, table_name: &str) -> Vec<ColumnInfo> {
    let query = format!("PRAGMA table_info({})", table_name);
    sqlx::query_as::<_, ColumnInfo>(&query)
        .fetch_all(pool)
        .await
        .unwrap()
}

/// Check if table has specific column
pub async fn has_column(pool: &SqlitePool, table_name: &str, column_name: &str) -> bool {
    get_table_columns(pool, table_name)
        .await
        .iter()
        .any(|c| c.name == column_name)
}

/// Assert table HAS column
pub async fn assert_has_column(pool: &SqlitePool, table_name: &str, column_name: &str) {
    assert!(
        has_column(pool, table_name, column_name).await,
        "Table '{}' should have column '{}', but it doesn't exist",
        table_name,
        column_name
    );
}
