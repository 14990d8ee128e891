//! Handlers for the admin review workflow.
//!
//! Admins page through completed annotations, approve them (locking
//! them against annotator writes), correct-and-approve in one step, or
//! send a whole image back for rework.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use labelkit_core::error::CoreError;
use labelkit_core::selection::{self, CategorySpec};
use labelkit_core::types::DbId;
use labelkit_db::error::DbError;
use labelkit_db::models::annotation::{
    AnnotationRework, BulkApprove, BulkApproveItem, ImageRework, ReviewFilter, SaveReviewEdits,
};
use labelkit_db::repositories::{AnnotationRepo, CategoryRepo, ReviewRepo};
use serde::Deserialize;
use serde_json::json;

use super::PageQuery;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Review queue reads
// ---------------------------------------------------------------------------

/// Query parameters for the review queue listing.
#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    /// Review-state filter: `pending`, `approved`, `rework_requested`
    /// or `rework_completed`. Unset returns every completed record.
    pub status: Option<String>,
    pub category_id: Option<DbId>,
    pub annotator_id: Option<DbId>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /api/admin/review
///
/// Page of completed annotations with image, annotator, category and
/// selected-option context.
pub async fn list_review_queue(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ReviewListQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let filter = match &params.status {
        Some(s) => Some(ReviewFilter::from_str(s)?),
        None => None,
    };
    let page = PageQuery {
        page: params.page,
        page_size: params.page_size,
    };
    let (limit, offset) = page.limit_offset();

    let items = ReviewRepo::list(
        &state.pool,
        filter,
        params.category_id,
        params.annotator_id,
        limit,
        offset,
    )
    .await?;
    let total = ReviewRepo::count(
        &state.pool,
        filter,
        params.category_id,
        params.annotator_id,
    )
    .await?;

    Ok(Json(json!({
        "data": {
            "items": items,
            "total": total,
            "page": page.page(),
            "page_size": page.page_size(),
        }
    })))
}

/// GET /api/admin/review/stats
///
/// Counts per review state for dashboard badges.
pub async fn review_stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let stats = ReviewRepo::stats(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

// ---------------------------------------------------------------------------
// Approval
// ---------------------------------------------------------------------------

/// PUT /api/admin/review/{annotation_id}/approve
///
/// Approve one completed annotation, locking it for the annotator.
pub async fn approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(annotation_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let annotation = ReviewRepo::approve(&state.pool, admin.user_id, annotation_id).await?;

    tracing::info!(
        annotation_id,
        admin_id = admin.user_id,
        "Annotation approved"
    );

    Ok(Json(DataResponse { data: annotation }))
}

/// PUT /api/admin/review/{annotation_id}
///
/// Overwrite the record's selections and approve it in one
/// transaction. The replacement content is validated against the
/// record's category before anything is written.
pub async fn save_edits_and_approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(annotation_id): Path<DbId>,
    Json(input): Json<SaveReviewEdits>,
) -> AppResult<impl IntoResponse> {
    let annotation = AnnotationRepo::find_by_id(&state.pool, annotation_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Annotation",
            id: annotation_id,
        }))?;
    let category = CategoryRepo::find_by_id(&state.pool, annotation.category_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id: annotation.category_id,
        }))?;
    let options = CategoryRepo::options_for(&state.pool, category.id).await?;
    let option_ids: Vec<DbId> = options.iter().map(|o| o.id).collect();
    let spec = CategorySpec {
        name: &category.name,
        allows_empty: category.allows_empty,
        option_ids: &option_ids,
    };
    selection::check_option_selection(&input.selected_option_ids, &spec)?;

    let approved = ReviewRepo::save_edits_and_approve(
        &state.pool,
        admin.user_id,
        annotation_id,
        &input.selected_option_ids,
        input.is_duplicate,
    )
    .await?;

    tracing::info!(
        annotation_id,
        admin_id = admin.user_id,
        "Annotation edited and approved"
    );

    Ok(Json(DataResponse { data: approved }))
}

/// POST /api/admin/review/bulk-approve
///
/// Approve a batch of annotations independently. Not atomic: each id
/// succeeds or fails on its own and the response reports both.
pub async fn bulk_approve(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<BulkApprove>,
) -> AppResult<Json<serde_json::Value>> {
    if input.annotation_ids.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "annotation_ids must not be empty".into(),
        )));
    }

    let mut results = Vec::with_capacity(input.annotation_ids.len());
    for &annotation_id in &input.annotation_ids {
        match ReviewRepo::approve(&state.pool, admin.user_id, annotation_id).await {
            Ok(_) => results.push(BulkApproveItem {
                annotation_id,
                success: true,
                error: None,
            }),
            Err(e) => results.push(BulkApproveItem {
                annotation_id,
                success: false,
                error: Some(bulk_item_error(annotation_id, e)),
            }),
        }
    }
    let approved = results.iter().filter(|r| r.success).count();
    let failed = results.len() - approved;

    tracing::info!(
        admin_id = admin.user_id,
        requested = input.annotation_ids.len(),
        approved,
        "Bulk approval finished"
    );

    Ok(Json(json!({
        "data": {
            "results": results,
            "approved": approved,
            "failed": failed,
        }
    })))
}

// ---------------------------------------------------------------------------
// Rework
// ---------------------------------------------------------------------------

/// POST /api/admin/images/{image_id}/rework
///
/// Send every record one annotator holds on an image back for rework.
pub async fn rework_image(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    Json(input): Json<ImageRework>,
) -> AppResult<Json<serde_json::Value>> {
    let reset = ReviewRepo::request_rework(
        &state.pool,
        admin.user_id,
        image_id,
        input.annotator_id,
        &input.reason,
        None,
    )
    .await?;

    tracing::info!(
        image_id,
        annotator_id = input.annotator_id,
        admin_id = admin.user_id,
        reset,
        "Image sent back for rework"
    );

    Ok(Json(json!({ "data": { "reset_records": reset } })))
}

/// POST /api/admin/annotations/{annotation_id}/rework
///
/// Record-addressed rework: resolves the record's image and annotator,
/// then resets that whole image the same way as the image-addressed
/// form. The named record itself must be in a rework-eligible state.
pub async fn rework_annotation(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(annotation_id): Path<DbId>,
    Json(input): Json<AnnotationRework>,
) -> AppResult<Json<serde_json::Value>> {
    let annotation = AnnotationRepo::find_by_id(&state.pool, annotation_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Annotation",
            id: annotation_id,
        }))?;

    let reset = ReviewRepo::request_rework(
        &state.pool,
        admin.user_id,
        annotation.image_id,
        annotation.annotator_id,
        &input.reason,
        Some(annotation_id),
    )
    .await?;

    tracing::info!(
        annotation_id,
        image_id = annotation.image_id,
        annotator_id = annotation.annotator_id,
        admin_id = admin.user_id,
        reset,
        "Annotation sent back for rework"
    );

    Ok(Json(json!({ "data": { "reset_records": reset } })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Per-item failure text for bulk approval. Guard verdicts pass
/// through; database failures are logged and sanitized.
fn bulk_item_error(annotation_id: DbId, e: DbError) -> String {
    match e {
        DbError::Core(core) => core.to_string(),
        DbError::Sqlx(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
        DbError::Sqlx(err) => {
            tracing::error!(annotation_id, error = %err, "Bulk approval item failed");
            "An internal error occurred".to_string()
        }
    }
}
