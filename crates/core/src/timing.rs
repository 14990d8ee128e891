//! Time-tracking rules: per-record caps and monotonic accumulation.

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Settings keys and bounds
// ---------------------------------------------------------------------------

/// Settings key for the per-image cap on first-pass annotation time.
pub const SETTING_MAX_ANNOTATION_TIME: &str = "max_annotation_time_seconds";

/// Settings key for the per-image cap on rework time.
pub const SETTING_MAX_REWORK_TIME: &str = "max_rework_time_seconds";

/// Cap applied when a settings row is missing or unparseable.
pub const DEFAULT_TIME_LIMIT_SECS: i32 = 120;

/// Smallest accepted cap value.
pub const MIN_TIME_LIMIT_SECS: i32 = 10;

// ---------------------------------------------------------------------------
// Time limits
// ---------------------------------------------------------------------------

/// Effective per-image time caps, loaded from system settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimits {
    pub max_annotation_secs: i32,
    pub max_rework_secs: i32,
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            max_annotation_secs: DEFAULT_TIME_LIMIT_SECS,
            max_rework_secs: DEFAULT_TIME_LIMIT_SECS,
        }
    }
}

impl TimeLimits {
    /// Cap that applies to a record, by whether it is a rework pass.
    pub fn cap_for(&self, is_rework: bool) -> i32 {
        if is_rework {
            self.max_rework_secs
        } else {
            self.max_annotation_secs
        }
    }
}

/// Validate a cap value supplied through the settings API.
pub fn validate_time_limit(secs: i32) -> Result<(), CoreError> {
    if secs < MIN_TIME_LIMIT_SECS {
        return Err(CoreError::Validation(format!(
            "Max annotation time must be at least {MIN_TIME_LIMIT_SECS} seconds"
        )));
    }
    Ok(())
}

/// Fold a raw elapsed reading into a stored total.
///
/// The raw value is clamped to the cap first, then the stored total only
/// ever grows: `max(stored, min(raw, cap))`. Stale or duplicate readings
/// therefore cannot shrink recorded time, and runaway client timers
/// cannot inflate it past the cap.
pub fn clamp_elapsed(stored: i32, raw: i32, cap: i32) -> i32 {
    stored.max(raw.min(cap))
}
