//! System settings DTOs.
//!
//! The `system_settings` table is a plain key/value store; its
//! repository works in raw strings, so only the time-cap DTOs live here.

use labelkit_core::timing::TimeLimits;
use serde::{Deserialize, Serialize};

/// PUT body for updating the time caps. Omitted fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateTimeLimits {
    #[serde(default)]
    pub max_annotation_time_seconds: Option<i32>,
    #[serde(default)]
    pub max_rework_time_seconds: Option<i32>,
}

/// The two effective time caps, as exposed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct TimeLimitsResponse {
    pub max_annotation_time_seconds: i32,
    pub max_rework_time_seconds: i32,
}

impl From<TimeLimits> for TimeLimitsResponse {
    fn from(limits: TimeLimits) -> Self {
        Self {
            max_annotation_time_seconds: limits.max_annotation_secs,
            max_rework_time_seconds: limits.max_rework_secs,
        }
    }
}
