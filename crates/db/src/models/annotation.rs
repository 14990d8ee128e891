//! Annotation entity model, submission DTOs, and review projections.

use labelkit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `annotations` table.
///
/// `review_status = NULL` means pending review. `is_duplicate` is
/// tri-state: unset, confirmed duplicate, confirmed non-duplicate.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Annotation {
    pub id: DbId,
    pub image_id: DbId,
    pub annotator_id: DbId,
    pub category_id: DbId,
    pub status: String,
    pub review_status: Option<String>,
    pub review_note: Option<String>,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub is_duplicate: Option<bool>,
    pub is_rework: bool,
    pub time_spent_seconds: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One selected option of an annotation, with its label resolved.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SelectedOption {
    pub annotation_id: DbId,
    pub option_id: DbId,
    pub label: String,
}

// ---------------------------------------------------------------------------
// Submission DTOs
// ---------------------------------------------------------------------------

/// PUT body for a single-category save: draft, submit, or skip,
/// distinguished by `status`.
#[derive(Debug, Deserialize)]
pub struct SaveAnnotation {
    #[serde(default)]
    pub selected_option_ids: Vec<DbId>,
    #[serde(default)]
    pub is_duplicate: Option<bool>,
    pub status: String,
    #[serde(default)]
    pub elapsed_seconds: Option<i32>,
}

/// One category's picks within an image-wide submission.
#[derive(Debug, Deserialize)]
pub struct AnnotationEntry {
    pub category_id: DbId,
    #[serde(default)]
    pub selected_option_ids: Vec<DbId>,
    #[serde(default)]
    pub is_duplicate: Option<bool>,
}

/// PUT body for an image-wide submission across all assigned categories.
#[derive(Debug, Deserialize)]
pub struct ImageSubmission {
    pub annotations: Vec<AnnotationEntry>,
    #[serde(default)]
    pub elapsed_seconds: Option<i32>,
}

/// PATCH body reporting elapsed working time on an image.
#[derive(Debug, Deserialize)]
pub struct RecordTime {
    pub elapsed_seconds: i32,
}

// ---------------------------------------------------------------------------
// Review DTOs and projections
// ---------------------------------------------------------------------------

/// PUT body for edit-then-approve: replacement content for the record.
#[derive(Debug, Deserialize)]
pub struct SaveReviewEdits {
    #[serde(default)]
    pub selected_option_ids: Vec<DbId>,
    #[serde(default)]
    pub is_duplicate: Option<bool>,
}

/// POST body for bulk approval.
#[derive(Debug, Deserialize)]
pub struct BulkApprove {
    pub annotation_ids: Vec<DbId>,
}

/// Per-id outcome of a bulk approval; failures carry the refusal reason.
#[derive(Debug, Clone, Serialize)]
pub struct BulkApproveItem {
    pub annotation_id: DbId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST body for image-wide rework (resolves the annotator explicitly).
#[derive(Debug, Deserialize)]
pub struct ImageRework {
    pub annotator_id: DbId,
    pub reason: String,
}

/// POST body for record-level rework (annotator comes from the record).
#[derive(Debug, Deserialize)]
pub struct AnnotationRework {
    pub reason: String,
}

/// Review-queue filter values accepted by the admin listing. `Pending`
/// covers records awaiting a first review or a re-review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFilter {
    Pending,
    Approved,
    ReworkRequested,
    ReworkCompleted,
}

impl ReviewFilter {
    /// Parse a filter from its query-string form.
    pub fn from_str(s: &str) -> Result<Self, labelkit_core::error::CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rework_requested" => Ok(Self::ReworkRequested),
            "rework_completed" => Ok(Self::ReworkCompleted),
            _ => Err(labelkit_core::error::CoreError::Validation(format!(
                "Invalid review filter '{s}'. Must be one of: \
                 pending, approved, rework_requested, rework_completed"
            ))),
        }
    }
}

/// Flat review-queue row with image/annotator/category context joined in.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewRow {
    pub id: DbId,
    pub image_id: DbId,
    pub filename: String,
    pub annotator_id: DbId,
    pub annotator_name: String,
    pub category_id: DbId,
    pub category_name: String,
    pub status: String,
    pub review_status: Option<String>,
    pub review_note: Option<String>,
    pub is_duplicate: Option<bool>,
    pub is_rework: bool,
    pub time_spent_seconds: i32,
    pub updated_at: Timestamp,
}

/// A review-queue row with the annotator's selected options attached.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub row: ReviewRow,
    pub selected_options: Vec<SelectedOption>,
}

/// Counts per review state for dashboard badges.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReviewStats {
    pub pending: i64,
    pub approved: i64,
    pub rework_requested: i64,
    pub rework_completed: i64,
    pub total_completed: i64,
}

// ---------------------------------------------------------------------------
// Queue and progress projections
// ---------------------------------------------------------------------------

/// Raw queue-membership row: the caller's own record status (if any)
/// and whether any annotator has completed the task.
#[derive(Debug, Clone, FromRow)]
pub struct QueueRow {
    pub image_id: DbId,
    pub my_status: Option<String>,
    pub completed_any: bool,
}

/// Raw per-category, per-status count for one annotator.
#[derive(Debug, Clone, FromRow)]
pub struct StatusCount {
    pub category_id: DbId,
    pub status: String,
    pub count: i64,
}
