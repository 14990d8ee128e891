//! Route definitions for the `/annotator` surface.
//!
//! Every endpoint requires the annotator role; admins pass too so they
//! can walk the same surface when triaging.

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::handlers::{edit_requests, images, notifications, settings, tasks};
use crate::state::AppState;

/// Routes mounted at `/annotator`.
///
/// ```text
/// GET    /categories                                         -> list_categories
/// GET    /categories/{category_id}/queue-size                -> queue_size
/// GET    /categories/{category_id}/resume-index              -> resume_index
/// GET    /categories/{category_id}/tasks/{index}             -> task_at
/// PUT    /categories/{category_id}/images/{image_id}/annotation -> save_annotation
///
/// GET    /images                                             -> list_images
/// GET    /images/{image_id}                                  -> image_detail
/// PUT    /images/{image_id}/annotations                      -> submit_image
/// PATCH  /images/{image_id}/time                             -> record_time
/// POST   /images/{image_id}/edit-requests                    -> create_edit_request
/// GET    /images/{image_id}/edit-status                      -> edit_status
/// GET    /edit-requests                                      -> list_own_requests
///
/// GET    /notifications                                      -> list_notifications
/// GET    /notifications/unread-count                         -> unread_count
/// PUT    /notifications/{id}/read                            -> mark_read
/// PUT    /notifications/read-all                             -> mark_all_read
///
/// GET    /settings/time-limits                               -> time_limits
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Category-scoped work queue
        .route("/categories", get(tasks::list_categories))
        .route(
            "/categories/{category_id}/queue-size",
            get(tasks::queue_size),
        )
        .route(
            "/categories/{category_id}/resume-index",
            get(tasks::resume_index),
        )
        .route(
            "/categories/{category_id}/tasks/{index}",
            get(tasks::task_at),
        )
        .route(
            "/categories/{category_id}/images/{image_id}/annotation",
            put(tasks::save_annotation),
        )
        // Image-scoped queue
        .route("/images", get(images::list_images))
        .route("/images/{image_id}", get(images::image_detail))
        .route(
            "/images/{image_id}/annotations",
            put(images::submit_image),
        )
        .route("/images/{image_id}/time", patch(images::record_time))
        // Edit requests
        .route(
            "/images/{image_id}/edit-requests",
            post(edit_requests::create_edit_request),
        )
        .route(
            "/images/{image_id}/edit-status",
            get(edit_requests::edit_status),
        )
        .route("/edit-requests", get(edit_requests::list_own_requests))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/notifications/{id}/read",
            put(notifications::mark_read),
        )
        .route("/notifications/read-all", put(notifications::mark_all_read))
        // Settings
        .route("/settings/time-limits", get(settings::time_limits))
}
