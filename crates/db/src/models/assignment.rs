//! Assignment models: category membership and exclusive image allocation.
//!
//! Assignment rows themselves never leave the database as-is; the API
//! surfaces them as assigned-image listings and the overview rollup.

use labelkit_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// DTO for bulk image assignment.
#[derive(Debug, Deserialize)]
pub struct AssignImages {
    pub count: i64,
}

/// DTO for replacing an annotator's category set.
#[derive(Debug, Deserialize)]
pub struct AssignCategories {
    pub category_ids: Vec<DbId>,
}

/// Result of a bulk image assignment. `assigned_count` may be lower than
/// `requested_count` when the unassigned pool runs short.
#[derive(Debug, Clone, Serialize)]
pub struct AssignImagesOutcome {
    pub assigned_count: i64,
    pub requested_count: i64,
    pub remaining_unassigned: i64,
}

/// Per-annotator rollup for the admin assignments overview.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AnnotatorOverview {
    pub user_id: DbId,
    pub username: String,
    pub display_name: String,
    pub assigned_images: i64,
    pub completed: i64,
    pub in_progress: i64,
    pub skipped: i64,
}
