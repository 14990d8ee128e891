//! Edit request entity model and DTOs.

use labelkit_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `edit_requests` table.
///
/// An `approved` row with `consumed_at = NULL` is an active lock
/// exemption; `consumed_at` is stamped by the submit that spends it.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EditRequest {
    pub id: DbId,
    pub image_id: DbId,
    pub user_id: DbId,
    pub reason: String,
    pub status: String,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_note: Option<String>,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Edit request with requester and image context joined in, for the
/// admin listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EditRequestDetail {
    pub id: DbId,
    pub image_id: DbId,
    pub filename: String,
    pub user_id: DbId,
    pub username: String,
    pub display_name: String,
    pub reason: String,
    pub status: String,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_note: Option<String>,
    pub consumed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// POST body for creating an edit request.
#[derive(Debug, Deserialize)]
pub struct CreateEditRequest {
    pub reason: String,
}

/// PUT body for deciding an edit request.
#[derive(Debug, Deserialize)]
pub struct DecideEditRequest {
    #[serde(default)]
    pub review_note: Option<String>,
}
