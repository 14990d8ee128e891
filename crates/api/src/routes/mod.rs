pub mod admin;
pub mod annotator;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /annotator/categories                                      assigned categories + progress
/// /annotator/categories/{category_id}/queue-size             queue size
/// /annotator/categories/{category_id}/resume-index           first unfinished position
/// /annotator/categories/{category_id}/tasks/{index}          task card at position
/// /annotator/categories/{category_id}/images/{image_id}/annotation
///                                                            save draft/submit/skip (PUT)
///
/// /annotator/images                                          image-scoped queue
/// /annotator/images/{image_id}                               image detail + own records
/// /annotator/images/{image_id}/annotations                   image-wide submit (PUT)
/// /annotator/images/{image_id}/time                          report elapsed time (PATCH)
/// /annotator/images/{image_id}/edit-requests                 file edit request (POST)
/// /annotator/images/{image_id}/edit-status                   lock + request state
/// /annotator/edit-requests                                   own edit requests
///
/// /annotator/notifications                                   list (?unread_only, limit, offset)
/// /annotator/notifications/unread-count                      unread count
/// /annotator/notifications/{id}/read                         mark read (PUT)
/// /annotator/notifications/read-all                          mark all read (PUT)
///
/// /annotator/settings/time-limits                            effective time caps
///
/// /admin/users                                               list, create
/// /admin/users/{user_id}                                     update (PUT)
/// /admin/users/{user_id}/categories                          replace category set (PUT)
/// /admin/users/{user_id}/images                              assigned images
/// /admin/users/{user_id}/images/assignments                  assign batch (POST), release (DELETE)
/// /admin/assignments                                         per-annotator allocation rollup
/// /admin/categories                                          category catalogue
/// /admin/images                                              image inventory (?assigned)
/// /admin/progress                                            per-annotator progress
///
/// /admin/review                                              queue (?status, category_id, annotator_id)
/// /admin/review/stats                                        counts per review state
/// /admin/review/{annotation_id}/approve                      approve (PUT)
/// /admin/review/{annotation_id}                              edit + approve (PUT)
/// /admin/review/bulk-approve                                 bulk approve (POST)
/// /admin/images/{image_id}/rework                            image-addressed rework (POST)
/// /admin/annotations/{annotation_id}/rework                  record-addressed rework (POST)
///
/// /admin/edit-requests                                       list (?status)
/// /admin/edit-requests/pending-count                         pending badge count
/// /admin/edit-requests/{request_id}/approve                  approve request (PUT)
/// /admin/edit-requests/{request_id}/reject                   reject request (PUT)
///
/// /admin/settings                                            get, update time caps
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Annotator work surface (annotator or admin role).
        .nest("/annotator", annotator::router())
        // Admin allocation, review, and configuration surface.
        .nest("/admin", admin::router())
}
