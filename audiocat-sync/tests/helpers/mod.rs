//! Test Helper Utilities
//!
//! Shared utilities for the audiocat-sync integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod fixture_source;
pub mod library;

pub use db_utils::{assert_has_column, get_table_columns, has_column, open_test_catalog};
pub use fixture_source::{FixtureTagSource, FixtureTags};
pub use library::{bump_mtime, Library};
