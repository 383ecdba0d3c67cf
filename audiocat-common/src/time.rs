//! Timestamp utilities
//!
//! Catalog rows carry two kinds of time:
//! - file modification times as fractional epoch seconds (REAL columns)
//! - the immutable added-timestamp as whole epoch seconds, plus its
//!   day/week/month/year breakdown (always derived here, in UTC)

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as whole epoch seconds
pub fn epoch_now() -> i64 {
    now().timestamp()
}

/// Convert a filesystem timestamp to fractional epoch seconds
///
/// Times before the epoch are clamped to 0.0.
pub fn system_time_to_epoch_secs(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(_) => 0.0,
    }
}

/// Added-timestamp with its derived calendar fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedStamp {
    /// Epoch seconds when the track first entered the catalog
    pub date_added: i64,
    /// `YYYY-MM-DD`
    pub added_day: String,
    /// ISO week, `YYYY-Www`
    pub added_week: String,
    /// `YYYY-MM`
    pub added_month: String,
    pub added_year: i32,
}

impl AddedStamp {
    /// Derive calendar fields from epoch seconds
    pub fn from_epoch(date_added: i64) -> Self {
        let dt = Utc
            .timestamp_opt(date_added, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let iso = dt.iso_week();

        Self {
            date_added,
            added_day: dt.format("%Y-%m-%d").to_string(),
            added_week: format!("{:04}-W{:02}", iso.year(), iso.week()),
            added_month: dt.format("%Y-%m").to_string(),
            added_year: dt.year(),
        }
    }

    /// Stamp for "now"
    pub fn now() -> Self {
        Self::from_epoch(epoch_now())
    }
}
