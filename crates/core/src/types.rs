//! Shared primitive type aliases.

use chrono::{DateTime, Utc};

/// Internal database identifier (PostgreSQL `BIGINT`).
pub type DbId = i64;

/// Timestamp with timezone, normalized to UTC.
pub type Timestamp = DateTime<Utc>;
