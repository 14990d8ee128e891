//! Handlers for exclusive image allocation.
//!
//! Admins hand batches of unassigned images to annotators and take
//! them back. Exclusivity is the database's problem
//! (`uq_image_assignments_image`); these handlers only validate the
//! target user and the batch size.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use labelkit_core::error::CoreError;
use labelkit_core::types::DbId;
use labelkit_db::models::assignment::AssignImages;
use labelkit_db::repositories::{AssignmentRepo, UserRepo};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

use super::users::require_active_annotator;

/// Largest batch one assignment request may claim.
const MAX_ASSIGN_BATCH: i64 = 1000;

/// GET /api/admin/users/{user_id}/images
///
/// The images currently assigned to one annotator, lowest id first.
pub async fn list_assigned_images(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    // 404 for unknown users; deactivated annotators may still hold
    // assignments, so only existence is checked here.
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;

    let images = AssignmentRepo::assigned_images(&state.pool, user_id).await?;
    Ok(Json(DataResponse { data: images }))
}

/// POST /api/admin/users/{user_id}/images/assignments
///
/// Claim up to `count` unassigned images for the annotator. An
/// exhausted pool is not an error: the outcome reports how many were
/// actually claimed and how many remain.
pub async fn assign_images(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<DbId>,
    Json(input): Json<AssignImages>,
) -> AppResult<impl IntoResponse> {
    if input.count <= 0 || input.count > MAX_ASSIGN_BATCH {
        return Err(AppError::Core(CoreError::Validation(format!(
            "count must be between 1 and {MAX_ASSIGN_BATCH}"
        ))));
    }
    let user = require_active_annotator(&state, user_id).await?;

    let outcome = AssignmentRepo::assign_images(&state.pool, user_id, input.count).await?;

    tracing::info!(
        user_id,
        username = %user.username,
        admin_id = admin.user_id,
        assigned = outcome.assigned_count,
        requested = outcome.requested_count,
        "Images assigned"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: outcome })))
}

/// DELETE /api/admin/users/{user_id}/images/assignments
///
/// Release all of the annotator's image assignments back to the pool.
/// Idempotent: removing zero assignments is a success.
pub async fn unassign_all_images(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;

    let removed = AssignmentRepo::unassign_all(&state.pool, user_id).await?;

    tracing::info!(
        user_id,
        admin_id = admin.user_id,
        removed,
        "Image assignments released"
    );

    Ok(Json(json!({ "data": { "removed_count": removed } })))
}

/// GET /api/admin/assignments
///
/// Per-annotator allocation rollup: assigned image counts and record
/// status counts for every active annotator.
pub async fn overview(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<impl IntoResponse> {
    let rows = AssignmentRepo::overview(&state.pool).await?;
    Ok(Json(DataResponse { data: rows }))
}
