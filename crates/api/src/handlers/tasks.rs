//! Handlers for the annotator's category-scoped work queue.
//!
//! A queue is the ordered set of images an annotator works through for
//! one assigned category. All endpoints require the annotator (or
//! admin) role and reject categories the caller is not assigned to.

use axum::extract::{Path, State};
use axum::Json;
use labelkit_core::error::CoreError;
use labelkit_core::lifecycle::AnnotationStatus;
use labelkit_core::queue::{self, QueueEntry};
use labelkit_core::selection::{self, CategorySpec};
use labelkit_core::types::DbId;
use labelkit_db::models::annotation::{Annotation, SaveAnnotation};
use labelkit_db::models::category::CategoryWithOptions;
use labelkit_db::repositories::annotation_repo::SingleSave;
use labelkit_db::repositories::{AnnotationRepo, CategoryRepo, ImageRepo, SettingsRepo};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAnnotator;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Queue reads
// ---------------------------------------------------------------------------

/// GET /api/annotator/categories
///
/// The caller's assigned categories with their option sets and queue
/// progress (completed positions, queue size, resume index).
pub async fn list_categories(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
) -> AppResult<Json<serde_json::Value>> {
    let categories = CategoryRepo::assigned_with_options(&state.pool, user.user_id).await?;

    let mut payload = Vec::with_capacity(categories.len());
    for category in categories {
        let queue = AnnotationRepo::category_queue(
            &state.pool,
            user.user_id,
            category.id,
            state.config.allocation_mode,
        )
        .await?;
        payload.push(category_with_progress(category, &queue));
    }

    Ok(Json(json!({ "data": payload })))
}

/// GET /api/annotator/categories/{category_id}/queue-size
pub async fn queue_size(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path(category_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let queue = load_queue(&state, user.user_id, category_id).await?;

    Ok(Json(json!({ "data": { "queue_size": queue.len() } })))
}

/// GET /api/annotator/categories/{category_id}/resume-index
///
/// The first queue position still needing work. When every position is
/// satisfied, `resume_index == queue_size` and `done` is `true`; the
/// sentinel is not a valid task index.
pub async fn resume_index(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path(category_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let queue = load_queue(&state, user.user_id, category_id).await?;
    let resume = queue::resume_index(&queue);

    Ok(Json(json!({
        "data": {
            "resume_index": resume,
            "queue_size": queue.len(),
            "done": resume == queue.len(),
        }
    })))
}

/// GET /api/annotator/categories/{category_id}/tasks/{index}
///
/// The task card at one queue position: the image, the category's
/// options, the caller's own prior record (for resume/edit), and
/// whether another annotator already completed the task.
pub async fn task_at(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path((category_id, index)): Path<(DbId, usize)>,
) -> AppResult<Json<serde_json::Value>> {
    let queue = load_queue(&state, user.user_id, category_id).await?;
    queue::check_index(index, queue.len())?;
    let image_id = queue[index].image_id;

    let image = ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;
    let category = CategoryRepo::find_by_id(&state.pool, category_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Category",
            id: category_id,
        }))?;
    let options = CategoryRepo::options_for(&state.pool, category_id).await?;

    let annotation =
        AnnotationRepo::find_by_key(&state.pool, image_id, user.user_id, category_id).await?;
    let selected_option_ids = match &annotation {
        Some(a) => AnnotationRepo::selection_ids(&state.pool, a.id).await?,
        None => Vec::new(),
    };
    let completed_by_other =
        AnnotationRepo::completed_by_other(&state.pool, image_id, category_id, user.user_id)
            .await?;

    Ok(Json(json!({
        "data": {
            "index": index,
            "queue_size": queue.len(),
            "image": image,
            "category": category,
            "options": options,
            "annotation": annotation,
            "selected_option_ids": selected_option_ids,
            "completed_by_other": completed_by_other,
        }
    })))
}

// ---------------------------------------------------------------------------
// Single-category submission
// ---------------------------------------------------------------------------

/// PUT /api/annotator/categories/{category_id}/images/{image_id}/annotation
///
/// Save one category's annotation for an image: a draft
/// (`in_progress`), a submission (`completed`), or a skip (`skipped`).
/// Submissions are validated against the category's option set; drafts
/// only need their picks to belong to the category.
pub async fn save_annotation(
    RequireAnnotator(user): RequireAnnotator,
    State(state): State<AppState>,
    Path((category_id, image_id)): Path<(DbId, DbId)>,
    Json(input): Json<SaveAnnotation>,
) -> AppResult<Json<DataResponse<Annotation>>> {
    let target = AnnotationStatus::from_str(&input.status)?;

    check_category_access(&state, user.user_id, category_id).await?;
    ImageRepo::find_by_id(&state.pool, image_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Image",
            id: image_id,
        }))?;

    if target != AnnotationStatus::Skipped {
        let category = CategoryRepo::find_by_id(&state.pool, category_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Category",
                id: category_id,
            }))?;
        let options = CategoryRepo::options_for(&state.pool, category_id).await?;
        let option_ids: Vec<DbId> = options.iter().map(|o| o.id).collect();
        let spec = CategorySpec {
            name: &category.name,
            allows_empty: category.allows_empty,
            option_ids: &option_ids,
        };
        // Drafts may be empty regardless of allows_empty; any picks they
        // do carry must still belong to the category.
        if target == AnnotationStatus::Completed || !input.selected_option_ids.is_empty() {
            selection::check_option_selection(&input.selected_option_ids, &spec)?;
        }
    }

    let limits = SettingsRepo::time_limits(&state.pool).await?;
    let save = SingleSave {
        image_id,
        annotator_id: user.user_id,
        category_id,
        target,
        option_ids: input.selected_option_ids,
        is_duplicate: input.is_duplicate,
        elapsed_seconds: input.elapsed_seconds,
    };
    let annotation = AnnotationRepo::save_single(&state.pool, &save, &limits).await?;

    tracing::info!(
        annotator_id = user.user_id,
        image_id,
        category_id,
        status = target.as_str(),
        "Annotation saved"
    );

    Ok(Json(DataResponse { data: annotation }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject callers who do not hold the category assignment, then compute
/// their queue.
async fn load_queue(
    state: &AppState,
    annotator_id: DbId,
    category_id: DbId,
) -> AppResult<Vec<QueueEntry>> {
    check_category_access(state, annotator_id, category_id).await?;
    let queue = AnnotationRepo::category_queue(
        &state.pool,
        annotator_id,
        category_id,
        state.config.allocation_mode,
    )
    .await?;
    Ok(queue)
}

/// 403 unless the annotator holds the category assignment.
async fn check_category_access(
    state: &AppState,
    annotator_id: DbId,
    category_id: DbId,
) -> AppResult<()> {
    let assigned = CategoryRepo::has_assignment(&state.pool, annotator_id, category_id).await?;
    if !assigned {
        return Err(AppError::Core(CoreError::Forbidden(
            "Category not assigned to you".into(),
        )));
    }
    Ok(())
}

/// Flatten a category and its queue into the listing payload.
fn category_with_progress(
    category: CategoryWithOptions,
    queue: &[QueueEntry],
) -> serde_json::Value {
    let completed = queue.iter().filter(|e| e.satisfied).count();
    json!({
        "id": category.id,
        "name": category.name,
        "description": category.description,
        "display_order": category.display_order,
        "allows_empty": category.allows_empty,
        "options": category.options,
        "progress": {
            "completed": completed,
            "total": queue.len(),
            "resume_index": queue::resume_index(queue),
        }
    })
}
