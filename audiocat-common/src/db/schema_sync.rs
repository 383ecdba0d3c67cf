//! Automatic Schema Synchronization
//!
//! Data-driven schema maintenance: table definitions in code are brought to the
//! live catalog additively. Nothing here drops, renames or retypes a column.
//!
//! # Architecture
//!
//! Per table:
//! 1. **Create** - table absent: `CREATE TABLE` with the full current column set
//! 2. **Auto-Sync** - table present: introspect live columns, `ALTER TABLE ADD COLUMN`
//!    for every expected column that is missing
//!
//! Drift that cannot be fixed additively (type or constraint mismatch) is
//! reported as a warning and left alone.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct GenresTable;
//!
//! impl TableSchema for GenresTable {
//!     fn table_name() -> &'static str { "genres" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "INTEGER").primary_key(),
//!             ColumnDefinition::new("name", "TEXT").not_null().unique(),
//!         ]
//!     }
//! }
//!
//! SchemaSync::ensure_table::<GenresTable>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// AUTOINCREMENT (only meaningful with an INTEGER primary key)
    pub autoincrement: bool,
    /// UNIQUE constraint
    pub unique: bool,
    /// DEFAULT value (raw SQL expression)
    pub default_value: Option<String>,
    /// REFERENCES clause, e.g. `tracks(id) ON DELETE CASCADE`
    pub references: Option<String>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            autoincrement: false,
            unique: false,
            default_value: None,
            references: None,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark primary key as AUTOINCREMENT (ids are never reused)
    pub fn autoincrement(mut self) -> Self {
        self.primary_key = true;
        self.autoincrement = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark column as UNIQUE
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set DEFAULT value
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Add a REFERENCES clause
    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.references = Some(target.into());
        self
    }

    /// Column definition as it appears inside `CREATE TABLE`
    pub fn to_create_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if let Some(target) = &self.references {
            sql.push_str(&format!(" REFERENCES {}", target));
        }
        sql
    }
}

/// Actual column from database introspection (PRAGMA table_info result)
#[derive(Debug, Clone)]
pub struct ActualColumn {
    /// Column ID (position in table)
    pub cid: i32,
    /// Column name
    pub name: String,
    /// SQL type from PRAGMA table_info
    pub type_name: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// DEFAULT value
    pub default_value: Option<String>,
    /// PRIMARY KEY flag
    pub pk: bool,
}

/// Schema drift detected between expected and actual schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    /// Column missing from database
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch (never auto-fixed)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Constraint mismatch (never auto-fixed)
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String,
    },
}

/// Defines expected schema for a database table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Expected column definitions (order matters for new table creation)
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// Table-level constraints appended to `CREATE TABLE`, e.g. `UNIQUE(a, b)`
    fn table_constraints() -> Vec<&'static str> {
        Vec::new()
    }
}

/// Outcome of synchronizing one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSyncOutcome {
    /// Table did not exist and was created
    pub created: bool,
    /// Columns appended via ALTER TABLE
    pub columns_added: Vec<String>,
    /// Drift or statement failures that were logged and skipped
    pub warnings: Vec<String>,
}

/// Schema introspection - read actual database schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Read actual columns from database table using PRAGMA table_info
    ///
    /// Returns columns in database order (by cid)
    pub async fn introspect_table(
        pool: &SqlitePool,
        table_name: &str,
    ) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    /// Check if table exists
    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        Self::object_exists(pool, "table", table_name).await
    }

    /// Check if a schema object (table, index, trigger, view) exists
    pub async fn object_exists(pool: &SqlitePool, kind: &str, name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type = ? AND name = ?
            )
            "#,
        )
        .bind(kind)
        .bind(name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Schema comparison - detect drift between expected and actual
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compare expected schema to actual database schema
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            if let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) {
                if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                    drift.push(SchemaDrift::TypeMismatch {
                        table: table_name.to_string(),
                        column: expected_col.name.clone(),
                        expected: expected_col.sql_type.clone(),
                        actual: actual_col.type_name.clone(),
                    });
                }

                if expected_col.not_null && !actual_col.not_null && !actual_col.pk {
                    drift.push(SchemaDrift::ConstraintMismatch {
                        table: table_name.to_string(),
                        column: expected_col.name.clone(),
                        constraint: "NOT NULL".to_string(),
                    });
                }

                if expected_col.primary_key && !actual_col.pk {
                    drift.push(SchemaDrift::ConstraintMismatch {
                        table: table_name.to_string(),
                        column: expected_col.name.clone(),
                        constraint: "PRIMARY KEY".to_string(),
                    });
                }
            } else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
            }
        }

        drift
    }

    /// Check if SQL types are compatible (SQLite type affinity rules)
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        if exp.contains("INT") && act.contains("INT") {
            return true;
        }

        let is_text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        if is_text(&exp) && is_text(&act) {
            return true;
        }

        let is_real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");
        if is_real(&exp) && is_real(&act) {
            return true;
        }

        false
    }
}

/// Schema synchronization - apply additive schema changes to database
pub struct SchemaSync;

impl SchemaSync {
    /// Bring one table to its expected shape
    ///
    /// **What this CAN fix:**
    /// - Missing table (CREATE TABLE with the full column set)
    /// - Missing columns (ALTER TABLE ADD COLUMN)
    ///
    /// **What this never touches:**
    /// - Type changes, constraint changes, column removal
    ///
    /// A failing ALTER is recorded as a warning; the remaining columns are
    /// still attempted.
    pub async fn ensure_table<T: TableSchema>(pool: &SqlitePool) -> Result<TableSyncOutcome> {
        let table_name = T::table_name();
        let expected = T::expected_columns();
        let mut outcome = TableSyncOutcome::default();

        debug!("Schema sync: checking table '{}'", table_name);

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            Self::create_table(pool, table_name, &expected, &T::table_constraints()).await?;
            outcome.created = true;
            return Ok(outcome);
        }

        let actual = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let drift = SchemaDiff::compare(table_name, &expected, &actual);

        if drift.is_empty() {
            debug!("  Schema up to date for '{}'", table_name);
            return Ok(outcome);
        }

        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    match Self::add_column(pool, &table, &column).await {
                        Ok(()) => outcome.columns_added.push(column.name.clone()),
                        Err(e) => {
                            warn!("  Failed to add column {}.{}: {}", table, column.name, e);
                            outcome
                                .warnings
                                .push(format!("add column {}.{} failed: {}", table, column.name, e));
                        }
                    }
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "  Type mismatch in {}.{}: expected '{}', found '{}'. Left unchanged.",
                        table, column, expected, actual
                    );
                    outcome.warnings.push(format!(
                        "type mismatch {}.{}: expected {}, found {}",
                        table, column, expected, actual
                    ));
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!(
                        "  Constraint mismatch in {}.{}: missing '{}'. Left unchanged.",
                        table, column, constraint
                    );
                    outcome.warnings.push(format!(
                        "constraint mismatch {}.{}: missing {}",
                        table, column, constraint
                    ));
                }
            }
        }

        Ok(outcome)
    }

    /// Create an absent schema object from its full DDL
    ///
    /// Returns `true` when the object was created, `false` when it already existed.
    pub async fn ensure_object(
        pool: &SqlitePool,
        kind: &str,
        name: &str,
        create_sql: &str,
    ) -> Result<bool> {
        if SchemaIntrospector::object_exists(pool, kind, name).await? {
            return Ok(false);
        }

        sqlx::query(create_sql).execute(pool).await?;
        info!("  Created {} '{}'", kind, name);
        Ok(true)
    }

    async fn create_table(
        pool: &SqlitePool,
        table: &str,
        columns: &[ColumnDefinition],
        constraints: &[&str],
    ) -> Result<()> {
        let mut parts: Vec<String> = columns.iter().map(|c| c.to_create_sql()).collect();
        parts.extend(constraints.iter().map(|c| c.to_string()));

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            table,
            parts.join(",\n    ")
        );

        sqlx::query(&sql).execute(pool).await?;
        info!("  Created table '{}' ({} columns)", table, columns.len());
        Ok(())
    }

    /// Add missing column to table via ALTER TABLE ADD COLUMN
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            table, column.name, column.sql_type
        );

        // SQLite ALTER TABLE ADD COLUMN limitations:
        // - PRIMARY KEY / UNIQUE: not supported
        // - NOT NULL: only with a DEFAULT value

        if column.primary_key {
            warn!(
                "  Cannot add PRIMARY KEY column {}.{} via ALTER TABLE; added without constraint",
                table, column.name
            );
        }

        if column.unique {
            warn!(
                "  Cannot add UNIQUE column {}.{} via ALTER TABLE; added without constraint",
                table, column.name
            );
        }

        if column.not_null {
            if let Some(default) = &column.default_value {
                sql.push_str(&format!(" NOT NULL DEFAULT {}", default));
            } else {
                warn!(
                    "  Cannot add NOT NULL column {}.{} without DEFAULT; added as nullable",
                    table, column.name
                );
            }
        } else if let Some(default) = &column.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }

        if let Some(target) = &column.references {
            sql.push_str(&format!(" REFERENCES {}", target));
        }

        info!("  Adding column: {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                info!("  Column {}.{} already present", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
