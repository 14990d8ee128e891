//! Route definitions for the `/admin` surface.
//!
//! Every endpoint requires the `admin` role via [`RequireAdmin`]
//! extractors in the handlers.
//!
//! [`RequireAdmin`]: crate::middleware::rbac::RequireAdmin

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{
    assignments, categories, edit_requests, images, review, settings, users,
};
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /users                                    -> list_users
/// POST   /users                                    -> create_user
/// PUT    /users/{user_id}                          -> update_user
/// PUT    /users/{user_id}/categories               -> assign_categories
/// GET    /users/{user_id}/images                   -> list_assigned_images
/// POST   /users/{user_id}/images/assignments       -> assign_images
/// DELETE /users/{user_id}/images/assignments       -> unassign_all_images
/// GET    /assignments                              -> overview
/// GET    /categories                               -> list_categories
/// GET    /images                                   -> list_catalog
/// GET    /progress                                 -> progress
///
/// GET    /review                                   -> list_review_queue
/// GET    /review/stats                             -> review_stats
/// PUT    /review/{annotation_id}/approve           -> approve
/// PUT    /review/{annotation_id}                   -> save_edits_and_approve
/// POST   /review/bulk-approve                      -> bulk_approve
/// POST   /images/{image_id}/rework                 -> rework_image
/// POST   /annotations/{annotation_id}/rework       -> rework_annotation
///
/// GET    /edit-requests                            -> list_edit_requests
/// GET    /edit-requests/pending-count              -> pending_count
/// PUT    /edit-requests/{request_id}/approve       -> approve_request
/// PUT    /edit-requests/{request_id}/reject        -> reject_request
///
/// GET    /settings                                 -> get_settings
/// PUT    /settings                                 -> update_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // User management and work allocation
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{user_id}", put(users::update_user))
        .route(
            "/users/{user_id}/categories",
            put(users::assign_categories),
        )
        .route(
            "/users/{user_id}/images",
            get(assignments::list_assigned_images),
        )
        .route(
            "/users/{user_id}/images/assignments",
            post(assignments::assign_images).delete(assignments::unassign_all_images),
        )
        .route("/assignments", get(assignments::overview))
        .route("/categories", get(categories::list_categories))
        .route("/images", get(images::list_catalog))
        .route("/progress", get(users::progress))
        // Review workflow
        .route("/review", get(review::list_review_queue))
        .route("/review/stats", get(review::review_stats))
        .route(
            "/review/{annotation_id}/approve",
            put(review::approve),
        )
        .route("/review/{annotation_id}", put(review::save_edits_and_approve))
        .route("/review/bulk-approve", post(review::bulk_approve))
        .route("/images/{image_id}/rework", post(review::rework_image))
        .route(
            "/annotations/{annotation_id}/rework",
            post(review::rework_annotation),
        )
        // Edit requests
        .route("/edit-requests", get(edit_requests::list_edit_requests))
        .route(
            "/edit-requests/pending-count",
            get(edit_requests::pending_count),
        )
        .route(
            "/edit-requests/{request_id}/approve",
            put(edit_requests::approve_request),
        )
        .route(
            "/edit-requests/{request_id}/reject",
            put(edit_requests::reject_request),
        )
        // System settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
}
