//! Task queue shapes and resume-position logic.
//!
//! A queue is an ordered list of image ids for one annotator, either
//! scoped to a single category (category work queue) or to the
//! annotator's exclusive image assignments (assigned-image queue).
//! Membership is computed fresh on every read; nothing here is stored.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Allocation mode
// ---------------------------------------------------------------------------

/// How category work queues are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Queue spans every image in the pool; positions completed by a
    /// peer read as satisfied instead of dropping out.
    SharedPool,
    /// Queue contains only images exclusively assigned to the annotator.
    AssignedOnly,
}

/// All valid allocation mode strings.
const VALID_MODE_STRINGS: &[&str] = &["shared_pool", "assigned_only"];

impl AllocationMode {
    /// Return the mode as its lowercase configuration string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SharedPool => "shared_pool",
            Self::AssignedOnly => "assigned_only",
        }
    }

    /// Parse a mode from its configuration string.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "shared_pool" => Ok(Self::SharedPool),
            "assigned_only" => Ok(Self::AssignedOnly),
            _ => Err(CoreError::Validation(format!(
                "Invalid allocation mode '{s}'. Must be one of: {}",
                VALID_MODE_STRINGS.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Queue entries and resume position
// ---------------------------------------------------------------------------

/// One position in a computed queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub image_id: DbId,
    /// Whether the position needs no further work from this annotator:
    /// any annotator has completed it, or this annotator skipped it.
    pub satisfied: bool,
}

/// First queue position still needing work, or `queue.len()` when every
/// position is satisfied. The past-the-end value is the caller's signal
/// that the queue is exhausted; it is never a valid task index.
pub fn resume_index(queue: &[QueueEntry]) -> usize {
    queue
        .iter()
        .position(|e| !e.satisfied)
        .unwrap_or(queue.len())
}

/// Bounds-check a task index against the current queue length.
pub fn check_index(index: usize, queue_len: usize) -> Result<(), CoreError> {
    if index >= queue_len {
        return Err(CoreError::NotFound {
            entity: "Queue position",
            id: index as DbId,
        });
    }
    Ok(())
}
