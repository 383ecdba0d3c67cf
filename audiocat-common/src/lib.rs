//! # audiocat Common Library
//!
//! Shared code for the audiocat catalog crates:
//! - Error type
//! - Configuration file model and path resolution
//! - Catalog connection setup and additive schema synchronization
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
