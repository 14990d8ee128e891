//! Handlers for the annotator's image-scoped queue.
//!
//! This surface is organized around whole images rather than one
//! category at a time: an annotator lists the images they can work on,
//! opens one with all of their per-category records, and submits every
//! assigned category in a single request.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use labelkit_core::error::CoreError;
use labelkit_core::lifecycle::ReviewStatus;
use labelkit_core::selection::{self, CategorySpec};
use labelkit_core::types::DbId;
use labelkit_db::models::annotation::{Annotation, ImageSubmission, RecordTime};
use labelkit_db::repositories::annotation_repo::EntrySave;
use labelkit_db::repositories::{
    AnnotationRepo, AssignmentRepo, CategoryRepo, ImageRepo, SettingsRepo,
};
use serde_json::json;

use super::PageQuery;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAdmin, RequireAnnotator};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Listing and detail
// ---------------------------------------------------------------------------

/// GET /api/annotator/images
///
/// Page of images the caller can work on image-wide: their exclusive
/// assignments plus any image they already hold records on. Each item
/// carries the caller's per-category states and a status rollup.
pub async fn list_images(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let (limit, offset) = page.limit_offset();
    let images = AnnotationRepo::annotator_images(&state.pool, user.user_id, limit, offset).await?;
    let total = AnnotationRepo::count_annotator_images(&state.pool, user.user_id).await?;

    let image_ids: Vec<DbId> = images.iter().map(|i| i.id).collect();
    let annotations =
        AnnotationRepo::list_for_images_user(&state.pool, &image_ids, user.user_id).await?;
    let assigned_count = CategoryRepo::assigned_categories(&state.pool, user.user_id)
        .await?
        .len() as i64;

    let mut by_image: HashMap<DbId, Vec<&Annotation>> =
        HashMap::new();
    for a in &annotations {
        by_image.entry(a.image_id).or_default().push(a);
    }

    let items: Vec<serde_json::Value> = images
        .iter()
        .map(|image| {
            let rows = by_image.get(&image.id).map(Vec::as_slice).unwrap_or(&[]);
            json!({
                "image": image,
                "annotations": rows.iter().map(|a| json!({
                    "category_id": a.category_id,
                    "status": a.status,
                    "review_status": a.review_status,
                    "is_rework": a.is_rework,
                })).collect::<Vec<_>>(),
                "rollup": rollup(rows, assigned_count),
            })
        })
        .collect();

    Ok(Json(json!({
        "data": {
            "items": items,
            "total": total,
            "page": page.page(),
            "page_size": page.page_size(),
        }
    })))
}

/// GET /api/annotator/images/{image_id}
///
/// One image with the caller's annotation records and their selections.
/// Visible when the image is assigned to the caller or they already
/// hold records on it.
pub async fn image_detail(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let image = ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    let annotations =
        AnnotationRepo::list_for_image_user(&state.pool, image_id, user.user_id).await?;
    if annotations.is_empty() {
        let assigned = AssignmentRepo::is_assigned(&state.pool, user.user_id, image_id).await?;
        if !assigned {
            return Err(AppError::Core(CoreError::Forbidden(
                "This image is not assigned to you".into(),
            )));
        }
    }

    let annotation_ids: Vec<DbId> = annotations.iter().map(|a| a.id).collect();
    let selections = AnnotationRepo::selected_options(&state.pool, &annotation_ids).await?;
    let mut by_annotation: HashMap<DbId, Vec<DbId>> = HashMap::new();
    for s in &selections {
        by_annotation.entry(s.annotation_id).or_default().push(s.option_id);
    }

    let locked = annotations
        .iter()
        .any(|a| a.review_status.as_deref() == Some(ReviewStatus::Approved.as_str()));
    let records: Vec<serde_json::Value> = annotations
        .iter()
        .map(|a| {
            json!({
                "annotation": a,
                "selected_option_ids": by_annotation.get(&a.id).cloned().unwrap_or_default(),
            })
        })
        .collect();

    Ok(Json(json!({
        "data": {
            "image": image,
            "annotations": records,
            "locked": locked,
        }
    })))
}

// ---------------------------------------------------------------------------
// Image-wide submission
// ---------------------------------------------------------------------------

/// PUT /api/annotator/images/{image_id}/annotations
///
/// Submit every assigned category for one image in a single
/// transaction. The body must cover all of the caller's assigned
/// categories; each entry is validated against its category's option
/// set before anything is written.
pub async fn submit_image(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    Json(input): Json<ImageSubmission>,
) -> AppResult<Json<serde_json::Value>> {
    let assigned = AssignmentRepo::is_assigned(&state.pool, user.user_id, image_id).await?;
    if !assigned {
        return Err(AppError::Core(CoreError::Forbidden(
            "This image is not assigned to you".into(),
        )));
    }
    ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    let categories = CategoryRepo::assigned_with_options(&state.pool, user.user_id).await?;
    let mut entries = Vec::with_capacity(input.annotations.len());
    let mut covered: Vec<DbId> = Vec::with_capacity(input.annotations.len());
    for entry in &input.annotations {
        let category = categories
            .iter()
            .find(|c| c.id == entry.category_id)
            .ok_or_else(|| {
                AppError::Core(CoreError::Validation(format!(
                    "Category {} is not assigned to you",
                    entry.category_id
                )))
            })?;
        if covered.contains(&category.id) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Duplicate entry for category '{}'",
                category.name
            ))));
        }
        let option_ids: Vec<DbId> = category.options.iter().map(|o| o.id).collect();
        let spec = CategorySpec {
            name: &category.name,
            allows_empty: category.allows_empty,
            option_ids: &option_ids,
        };
        selection::check_option_selection(&entry.selected_option_ids, &spec)?;
        covered.push(category.id);
        entries.push(EntrySave {
            category_id: category.id,
            option_ids: entry.selected_option_ids.clone(),
            is_duplicate: entry.is_duplicate,
        });
    }

    let missing: Vec<String> = categories
        .iter()
        .filter(|c| !covered.contains(&c.id))
        .map(|c| c.name.clone())
        .collect();
    selection::check_no_missing_categories(&missing)?;

    let limits = SettingsRepo::time_limits(&state.pool).await?;
    let saved_ids = AnnotationRepo::submit_image_wide(
        &state.pool,
        image_id,
        user.user_id,
        &entries,
        input.elapsed_seconds,
        &limits,
    )
    .await?;

    let saved_categories: Vec<&str> = categories
        .iter()
        .filter(|c| saved_ids.contains(&c.id))
        .map(|c| c.name.as_str())
        .collect();

    tracing::info!(
        annotator_id = user.user_id,
        image_id,
        categories = saved_ids.len(),
        "Image-wide submission saved"
    );

    Ok(Json(json!({ "data": { "saved_categories": saved_categories } })))
}

// ---------------------------------------------------------------------------
// Admin catalogue
// ---------------------------------------------------------------------------

/// Query parameters for the admin image catalogue.
#[derive(Debug, serde::Deserialize)]
pub struct CatalogQuery {
    /// Filter by assignment state; unset returns the whole inventory.
    pub assigned: Option<bool>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /api/admin/images
///
/// Page through the image inventory, optionally filtered by whether an
/// image currently has an exclusive assignment.
pub async fn list_catalog(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<CatalogQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let page = PageQuery {
        page: params.page,
        page_size: params.page_size,
    };
    let (limit, offset) = page.limit_offset();
    let images = ImageRepo::list(&state.pool, params.assigned, limit, offset).await?;
    let total = ImageRepo::count(&state.pool, params.assigned).await?;

    Ok(Json(json!({
        "data": {
            "items": images,
            "total": total,
            "page": page.page(),
            "page_size": page.page_size(),
        }
    })))
}

// ---------------------------------------------------------------------------
// Time tracking
// ---------------------------------------------------------------------------

/// PATCH /api/annotator/images/{image_id}/time
///
/// Fold an elapsed-time reading into the caller's records on the
/// image. Advisory telemetry: clamped per record, never decreasing,
/// and updating zero rows is not an error.
pub async fn record_time(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path(image_id): Path<DbId>,
    Json(input): Json<RecordTime>,
) -> AppResult<Json<serde_json::Value>> {
    if input.elapsed_seconds < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "Elapsed seconds must be non-negative".into(),
        )));
    }

    let limits = SettingsRepo::time_limits(&state.pool).await?;
    let updated = AnnotationRepo::record_time(
        &state.pool,
        image_id,
        user.user_id,
        input.elapsed_seconds,
        &limits,
    )
    .await?;

    Ok(Json(json!({ "data": { "updated_records": updated } })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Per-image status rollup across the annotator's records.
fn rollup(
    rows: &[&Annotation],
    assigned_count: i64,
) -> serde_json::Value {
    let completed = rows.iter().filter(|a| a.status == "completed").count() as i64;
    let in_progress = rows.iter().filter(|a| a.status == "in_progress").count() as i64;
    let skipped = rows.iter().filter(|a| a.status == "skipped").count() as i64;
    let needs_rework = rows
        .iter()
        .any(|a| a.review_status.as_deref() == Some(ReviewStatus::ReworkRequested.as_str()));
    json!({
        "completed": completed,
        "in_progress": in_progress,
        "skipped": skipped,
        "pending": (assigned_count - rows.len() as i64).max(0),
        "needs_rework": needs_rework,
    })
}
