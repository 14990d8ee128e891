//! Handlers for the edit-request workflow.
//!
//! Approved annotations are locked against the annotator. An edit
//! request asks an admin to unlock one image; approval grants a
//! one-time exemption that the annotator's next submit consumes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use labelkit_core::error::CoreError;
use labelkit_core::lifecycle::{EditRequestStatus, ReviewStatus};
use labelkit_core::types::DbId;
use labelkit_db::models::edit_request::{CreateEditRequest, DecideEditRequest};
use labelkit_db::repositories::{AnnotationRepo, EditRequestRepo, ImageRepo};
use serde::Deserialize;
use serde_json::json;

use super::PageQuery;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAnnotator};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Annotator surface
// ---------------------------------------------------------------------------

/// POST /api/annotator/images/{image_id}/edit-requests
///
/// File an edit request for a locked image. Rejected when nothing on
/// the image is locked for the caller, and conflicts when a request is
/// already pending.
pub async fn create_edit_request(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    Json(input): Json<CreateEditRequest>,
) -> AppResult<impl IntoResponse> {
    if input.reason.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Edit request reason must not be empty".into(),
        )));
    }
    ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    if !image_locked(&state, image_id, user.user_id).await? {
        return Err(AppError::Core(CoreError::InvalidState(
            "Image is not locked; you can edit it directly".into(),
        )));
    }

    let request =
        EditRequestRepo::create(&state.pool, image_id, user.user_id, input.reason.trim()).await?;

    tracing::info!(
        request_id = request.id,
        annotator_id = user.user_id,
        image_id,
        "Edit request filed"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: request })))
}

/// GET /api/annotator/images/{image_id}/edit-status
///
/// The caller's lock and edit-request state for one image: whether it
/// is locked for them, their newest request, and whether an approved
/// exemption is still unspent.
pub async fn edit_status(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    let locked = image_locked(&state, image_id, user.user_id).await?;
    let latest = EditRequestRepo::latest_for_image_user(&state.pool, image_id, user.user_id).await?;
    let exemption = EditRequestRepo::active_exemption(&state.pool, image_id, user.user_id).await?;

    Ok(Json(json!({
        "data": {
            "locked": locked,
            "latest_request": latest,
            "has_active_exemption": exemption.is_some(),
        }
    })))
}

/// GET /api/annotator/edit-requests
///
/// The caller's own edit requests, newest first.
pub async fn list_own_requests(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let requests = EditRequestRepo::list_for_user(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: requests }))
}

// ---------------------------------------------------------------------------
// Admin surface
// ---------------------------------------------------------------------------

/// Query parameters for the admin edit-request listing.
#[derive(Debug, Deserialize)]
pub struct EditRequestListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /api/admin/edit-requests
///
/// All edit requests with requester and image context, optionally
/// filtered by status.
pub async fn list_edit_requests(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<EditRequestListQuery>,
) -> AppResult<impl IntoResponse> {
    let status = match &params.status {
        Some(s) => Some(EditRequestStatus::from_str(s)?),
        None => None,
    };
    let page = PageQuery {
        page: params.page,
        page_size: params.page_size,
    };
    let (limit, offset) = page.limit_offset();
    let requests = EditRequestRepo::list_detailed(
        &state.pool,
        status.map(|s| s.as_str()),
        limit,
        offset,
    )
    .await?;
    Ok(Json(DataResponse { data: requests }))
}

/// GET /api/admin/edit-requests/pending-count
pub async fn pending_count(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let pending = EditRequestRepo::pending_count(&state.pool).await?;
    Ok(Json(json!({ "data": { "pending": pending } })))
}

/// PUT /api/admin/edit-requests/{request_id}/approve
///
/// Approve a pending request, granting the requester a one-time lock
/// exemption for the image.
pub async fn approve_request(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<DecideEditRequest>,
) -> AppResult<impl IntoResponse> {
    let request = EditRequestRepo::decide(
        &state.pool,
        admin.user_id,
        request_id,
        true,
        input.review_note.as_deref(),
    )
    .await?;

    tracing::info!(
        request_id,
        admin_id = admin.user_id,
        image_id = request.image_id,
        "Edit request approved"
    );

    Ok(Json(DataResponse { data: request }))
}

/// PUT /api/admin/edit-requests/{request_id}/reject
pub async fn reject_request(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(request_id): Path<DbId>,
    Json(input): Json<DecideEditRequest>,
) -> AppResult<impl IntoResponse> {
    let request = EditRequestRepo::decide(
        &state.pool,
        admin.user_id,
        request_id,
        false,
        input.review_note.as_deref(),
    )
    .await?;

    tracing::info!(
        request_id,
        admin_id = admin.user_id,
        image_id = request.image_id,
        "Edit request rejected"
    );

    Ok(Json(DataResponse { data: request }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whether any of the annotator's records on the image are approved.
async fn image_locked(state: &AppState, image_id: DbId, user_id: DbId) -> AppResult<bool> {
    let annotations = AnnotationRepo::list_for_image_user(&state.pool, image_id, user_id).await?;
    Ok(annotations
        .iter()
        .any(|a| a.review_status.as_deref() == Some(ReviewStatus::Approved.as_str())))
}
