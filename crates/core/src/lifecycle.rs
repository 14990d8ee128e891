//! Annotation lifecycle: status enums and transition guards.
//!
//! This module is the single place that knows which lifecycle transitions
//! are legal. Storage code applies transitions; handlers ask the guards
//! here first and propagate the [`CoreError`] unchanged when a transition
//! is refused.
//!
//! The record-level lifecycle, with the database columns that encode it:
//!
//! ```text
//! Unannotated  (no row)
//!    |  submit / draft
//!    v
//! Draft        (status=in_progress, review_status=NULL)
//!    |  submit
//!    v
//! Submitted    (status=completed, review_status=NULL)
//!    |  approve                         ^
//!    v                                  |  submit with approved edit request
//! Approved     (review_status=approved, locked)
//!    |  request rework
//!    v
//! ReworkRequested (status=in_progress, review_status=rework_requested, is_rework)
//!    |  submit
//!    v
//! ReworkCompleted (status=completed, review_status=rework_completed)
//!    |  approve
//!    v
//! Approved
//! ```
//!
//! `Skipped` (status=skipped) is reachable from any state whose status is
//! not `completed`; completed work is never overwritten by a skip.

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Annotation status
// ---------------------------------------------------------------------------

/// Annotator-facing progress status of an annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    InProgress,
    Completed,
    Skipped,
}

/// All valid annotation status strings.
const VALID_STATUS_STRINGS: &[&str] = &["in_progress", "completed", "skipped"];

impl AnnotationStatus {
    /// Return the status as the lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    /// Parse a status from its stored string form.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(CoreError::Validation(format!(
                "Invalid annotation status '{s}'. Must be one of: {}",
                VALID_STATUS_STRINGS.join(", ")
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Review status
// ---------------------------------------------------------------------------

/// Admin-facing review status. `None` at the storage layer means
/// "pending review" and has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    ReworkRequested,
    ReworkCompleted,
}

/// All valid review status strings.
const VALID_REVIEW_STRINGS: &[&str] = &["approved", "rework_requested", "rework_completed"];

impl ReviewStatus {
    /// Return the review status as the lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ReworkRequested => "rework_requested",
            Self::ReworkCompleted => "rework_completed",
        }
    }

    /// Parse a review status from its stored string form.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "approved" => Ok(Self::Approved),
            "rework_requested" => Ok(Self::ReworkRequested),
            "rework_completed" => Ok(Self::ReworkCompleted),
            _ => Err(CoreError::Validation(format!(
                "Invalid review status '{s}'. Must be one of: {}",
                VALID_REVIEW_STRINGS.join(", ")
            ))),
        }
    }

    /// Parse an optional stored column, where `None` means pending review.
    pub fn from_opt(s: Option<&str>) -> Result<Option<Self>, CoreError> {
        s.map(Self::from_str).transpose()
    }
}

// ---------------------------------------------------------------------------
// Edit request status
// ---------------------------------------------------------------------------

/// Lifecycle status of an edit request. `Pending` is the only
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditRequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl EditRequestStatus {
    /// Return the status as the lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse an edit request status from its stored string form.
    pub fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid edit request status '{s}'. Must be one of: pending, approved, rejected"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Record state snapshot
// ---------------------------------------------------------------------------

/// The lifecycle-relevant fields of one annotation record, as last
/// committed. Guards operate on this snapshot; callers must load it under
/// a row lock when applying the resulting transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordState {
    pub status: AnnotationStatus,
    pub review: Option<ReviewStatus>,
    pub is_rework: bool,
}

impl RecordState {
    /// Whether the record is locked against annotator writes.
    ///
    /// Locked records can still be written through an approved,
    /// unconsumed edit request (the `exempt` flag on the guards below).
    pub fn is_locked(&self) -> bool {
        self.review == Some(ReviewStatus::Approved)
    }
}

// ---------------------------------------------------------------------------
// Transition guards
// ---------------------------------------------------------------------------

/// Guard for any annotator-initiated write (draft save, submit, skip).
///
/// A record whose review status is `approved` is locked; writing it
/// requires an active lock exemption from an approved edit request.
pub fn check_write(state: Option<&RecordState>, exempt: bool) -> Result<(), CoreError> {
    match state {
        Some(s) if s.is_locked() && !exempt => Err(CoreError::Forbidden(
            "This image is locked. Request edit permission from an admin.".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Guard for `Skip`: completed work must never be overwritten by a skip.
pub fn check_skip(state: Option<&RecordState>) -> Result<(), CoreError> {
    match state {
        Some(s) if s.status == AnnotationStatus::Completed => Err(CoreError::InvalidState(
            "Cannot skip an annotation that is already completed".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Guard for `Approve`: only completed, not-yet-approved records qualify.
///
/// Re-approving is an [`CoreError::InvalidState`], never a silent success,
/// so the operation is observably idempotence-safe at the API boundary.
pub fn check_approve(state: &RecordState) -> Result<(), CoreError> {
    if state.status != AnnotationStatus::Completed {
        return Err(CoreError::InvalidState(format!(
            "Only completed annotations can be approved (current status: {})",
            state.status.as_str()
        )));
    }
    match state.review {
        None | Some(ReviewStatus::ReworkCompleted) => Ok(()),
        Some(ReviewStatus::Approved) => Err(CoreError::InvalidState(
            "Annotation is already approved".to_string(),
        )),
        Some(ReviewStatus::ReworkRequested) => Err(CoreError::InvalidState(
            "Annotation is awaiting rework and cannot be approved".to_string(),
        )),
    }
}

/// Reject a blank rework reason.
pub fn check_rework_reason(reason: &str) -> Result<(), CoreError> {
    if reason.trim().is_empty() {
        return Err(CoreError::Validation(
            "Rework reason must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Guard for `RequestRework` on a single record: legal from any state
/// except `rework_requested` itself, and the reason must not be blank.
pub fn check_request_rework(state: &RecordState, reason: &str) -> Result<(), CoreError> {
    check_rework_reason(reason)?;
    if state.review == Some(ReviewStatus::ReworkRequested) {
        return Err(CoreError::InvalidState(
            "Annotation is already awaiting rework".to_string(),
        ));
    }
    Ok(())
}

/// Outcome of a successful annotator submit, computed from the record's
/// prior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitTransition {
    /// Review status to store with the completed record.
    pub next_review: Option<ReviewStatus>,
    /// Whether this submit consumes the caller's lock exemption.
    pub consumes_exemption: bool,
}

/// Compute the review-status transition for a completed submit.
///
/// - A record awaiting rework moves to `rework_completed` (pending
///   re-review), as does a rework record resubmitted before re-review.
/// - A locked record written through an exemption returns to pending
///   review (`None`) and consumes the exemption; it is not re-locked.
/// - Anything else stays pending (`None`).
///
/// Callers must have already passed [`check_write`].
pub fn submit_transition(state: Option<&RecordState>) -> SubmitTransition {
    match state {
        Some(s) if s.review == Some(ReviewStatus::ReworkRequested) => SubmitTransition {
            next_review: Some(ReviewStatus::ReworkCompleted),
            consumes_exemption: false,
        },
        Some(s) if s.is_rework && s.review == Some(ReviewStatus::ReworkCompleted) => {
            SubmitTransition {
                next_review: Some(ReviewStatus::ReworkCompleted),
                consumes_exemption: false,
            }
        }
        Some(s) if s.review == Some(ReviewStatus::Approved) => SubmitTransition {
            next_review: None,
            consumes_exemption: true,
        },
        _ => SubmitTransition {
            next_review: None,
            consumes_exemption: false,
        },
    }
}
