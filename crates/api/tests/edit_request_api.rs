//! Integration tests for the edit-request workflow: filing against
//! locked images, admin decisions, and the one-time lock exemption.

mod common;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use common::{body_json, get_auth, post_json_auth, put_json_auth};
use labelkit_core::types::DbId;
use serde_json::json;
use sqlx::PgPool;

/// An admin, an annotator with one category, and one assigned image.
struct Scenario {
    admin_token: String,
    worker_id: DbId,
    worker_token: String,
    category_id: DbId,
    option_ids: Vec<DbId>,
    image_id: DbId,
}

async fn seed_scenario(pool: &PgPool) -> Scenario {
    let (_, admin_token) = common::seed_admin(pool).await;
    let (worker, worker_token) = common::seed_annotator(pool, "worker1").await;
    let (category_id, option_ids) =
        common::seed_category(pool, "test_palette", false, &["red", "blue"]).await;
    common::assign_category(pool, worker.id, category_id).await;
    let image_id = common::seed_image(pool, "subject.jpg").await;
    common::assign_image(pool, worker.id, image_id).await;
    Scenario {
        admin_token,
        worker_id: worker.id,
        worker_token,
        category_id,
        option_ids,
        image_id,
    }
}

/// Submit the scenario category for an image as completed.
async fn submit(pool: &PgPool, s: &Scenario, image_id: DbId) -> Response<Body> {
    put_json_auth(
        common::build_test_app(pool.clone()),
        &format!(
            "/api/annotator/categories/{}/images/{image_id}/annotation",
            s.category_id
        ),
        json!({ "status": "completed", "selected_option_ids": [s.option_ids[0]] }),
        &s.worker_token,
    )
    .await
}

/// Submit and approve one record, locking the image for the worker.
/// Returns the annotation id.
async fn lock_image(pool: &PgPool, s: &Scenario, image_id: DbId) -> DbId {
    let response = submit(pool, s, image_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let annotation_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/review/{annotation_id}/approve"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    annotation_id
}

/// File an edit request for an image as the worker.
async fn file_request(pool: &PgPool, s: &Scenario, image_id: DbId, reason: &str) -> Response<Body> {
    post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/annotator/images/{image_id}/edit-requests"),
        json!({ "reason": reason }),
        &s.worker_token,
    )
    .await
}

/// Read the worker's edit-status payload for an image.
async fn edit_status(pool: &PgPool, s: &Scenario, image_id: DbId) -> serde_json::Value {
    let response = get_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/annotator/images/{image_id}/edit-status"),
        &s.worker_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Filing
// ---------------------------------------------------------------------------

/// Filing against an image with nothing locked is refused; the
/// annotator can just edit.
#[sqlx::test(migrations = "../../db/migrations")]
async fn edit_request_needs_a_locked_image(pool: PgPool) {
    let s = seed_scenario(&pool).await;

    let response = file_request(&pool, &s, s.image_id, "Please unlock").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "STATE_ERROR");
    assert_eq!(json["error"], "Image is not locked; you can edit it directly");
}

/// The reason is mandatory.
#[sqlx::test(migrations = "../../db/migrations")]
async fn blank_edit_request_reason_is_rejected(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    lock_image(&pool, &s, s.image_id).await;

    let response = file_request(&pool, &s, s.image_id, "   ").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Edit request reason must not be empty");
}

/// A locked image accepts one request; the stored reason is trimmed.
#[sqlx::test(migrations = "../../db/migrations")]
async fn filing_on_a_locked_image_creates_a_pending_request(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    lock_image(&pool, &s, s.image_id).await;

    let response = file_request(&pool, &s, s.image_id, "  Wrong color picked  ").await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["image_id"], s.image_id);
    assert_eq!(json["data"]["user_id"], s.worker_id);
    assert_eq!(json["data"]["reason"], "Wrong color picked");
}

/// Only one pending request per image and annotator.
#[sqlx::test(migrations = "../../db/migrations")]
async fn second_pending_request_is_a_conflict(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    lock_image(&pool, &s, s.image_id).await;
    let response = file_request(&pool, &s, s.image_id, "First").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = file_request(&pool, &s, s.image_id, "Second").await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["error"], "An edit request for this image is already pending");
}

/// Edit requests address real images.
#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_image_in_edit_flow_is_404(pool: PgPool) {
    let s = seed_scenario(&pool).await;

    let response = file_request(&pool, &s, 999999, "Please").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(
        common::build_test_app(pool),
        "/api/annotator/images/999999/edit-status",
        &s.worker_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Status and listings
// ---------------------------------------------------------------------------

/// The edit-status payload tracks lock, newest request, and exemption.
#[sqlx::test(migrations = "../../db/migrations")]
async fn edit_status_reports_lock_and_requests(pool: PgPool) {
    let s = seed_scenario(&pool).await;

    let json = edit_status(&pool, &s, s.image_id).await;
    assert_eq!(json["data"]["locked"], false);
    assert!(json["data"]["latest_request"].is_null());
    assert_eq!(json["data"]["has_active_exemption"], false);

    lock_image(&pool, &s, s.image_id).await;
    let response = file_request(&pool, &s, s.image_id, "Fix").await;
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let json = edit_status(&pool, &s, s.image_id).await;
    assert_eq!(json["data"]["locked"], true);
    assert_eq!(json["data"]["latest_request"]["status"], "pending");
    assert_eq!(json["data"]["has_active_exemption"], false);

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/edit-requests/{request_id}/approve"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = edit_status(&pool, &s, s.image_id).await;
    assert_eq!(json["data"]["latest_request"]["status"], "approved");
    assert_eq!(json["data"]["has_active_exemption"], true);
}

/// Annotators see their own requests only.
#[sqlx::test(migrations = "../../db/migrations")]
async fn own_requests_are_scoped_to_the_caller(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    lock_image(&pool, &s, s.image_id).await;
    let response = file_request(&pool, &s, s.image_id, "Mine").await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let (_, other_token) = common::seed_annotator(&pool, "worker2").await;

    let response = get_auth(
        common::build_test_app(pool.clone()),
        "/api/annotator/edit-requests",
        &s.worker_token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["reason"], "Mine");

    let response = get_auth(
        common::build_test_app(pool),
        "/api/annotator/edit-requests",
        &other_token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);
}

/// The admin listing joins requester and image context and filters by
/// status; the badge endpoint counts pending requests.
#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_listing_filters_by_status(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    let image_b = common::seed_image(&pool, "second.jpg").await;
    common::assign_image(&pool, s.worker_id, image_b).await;
    lock_image(&pool, &s, s.image_id).await;
    lock_image(&pool, &s, image_b).await;

    let response = file_request(&pool, &s, s.image_id, "First").await;
    let first_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let response = file_request(&pool, &s, image_b, "Second").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/edit-requests/{first_id}/approve"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(
        common::build_test_app(pool.clone()),
        "/api/admin/edit-requests",
        &s.admin_token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = get_auth(
        common::build_test_app(pool.clone()),
        "/api/admin/edit-requests?status=pending",
        &s.admin_token,
    )
    .await;
    let json = body_json(response).await;
    let pending = json["data"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["reason"], "Second");

    let response = get_auth(
        common::build_test_app(pool.clone()),
        "/api/admin/edit-requests?status=bogus",
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "Invalid edit request status 'bogus'. Must be one of: pending, approved, rejected"
    );

    let response = get_auth(
        common::build_test_app(pool),
        "/api/admin/edit-requests/pending-count",
        &s.admin_token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["pending"], 1);
}

// ---------------------------------------------------------------------------
// Decisions and the exemption
// ---------------------------------------------------------------------------

/// Approval grants exactly one exempted write: the locked record can be
/// resubmitted once, returns to pending review, and the next write
/// against a re-approved record is refused again.
#[sqlx::test(migrations = "../../db/migrations")]
async fn approval_grants_a_single_use_exemption(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    let annotation_id = lock_image(&pool, &s, s.image_id).await;

    let response = submit(&pool, &s, s.image_id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "This image is locked. Request edit permission from an admin."
    );

    let response = file_request(&pool, &s, s.image_id, "Need one more pass").await;
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/edit-requests/{request_id}/approve"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The exempted write lands and the record goes back to pending review.
    let response = submit(&pool, &s, s.image_id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["data"]["review_status"].is_null());

    let json = edit_status(&pool, &s, s.image_id).await;
    assert_eq!(json["data"]["locked"], false);
    assert_eq!(json["data"]["has_active_exemption"], false);

    // Once re-approved, the spent exemption no longer helps.
    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/review/{annotation_id}/approve"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = submit(&pool, &s, s.image_id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Rejection records the note, notifies the requester, and leaves the
/// image locked.
#[sqlx::test(migrations = "../../db/migrations")]
async fn rejection_leaves_the_image_locked(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    lock_image(&pool, &s, s.image_id).await;
    let response = file_request(&pool, &s, s.image_id, "Let me fix it").await;
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/edit-requests/{request_id}/reject"),
        json!({ "review_note": "Looks correct as is" }),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "rejected");
    assert_eq!(json["data"]["review_note"], "Looks correct as is");

    let response = submit(&pool, &s, s.image_id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (title, message): (String, String) = sqlx::query_as(
        "SELECT title, message FROM notifications
         WHERE user_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(s.worker_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(title, "Edit Request Rejected");
    assert_eq!(
        message,
        "Your edit request for image 'subject.jpg' was rejected."
    );
}

/// Approval notifies the requester with the one-time wording.
#[sqlx::test(migrations = "../../db/migrations")]
async fn approval_notifies_the_requester(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    lock_image(&pool, &s, s.image_id).await;
    let response = file_request(&pool, &s, s.image_id, "One more pass").await;
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/edit-requests/{request_id}/approve"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (title, message): (String, String) = sqlx::query_as(
        "SELECT title, message FROM notifications
         WHERE user_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(s.worker_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(title, "Edit Request Approved");
    assert_eq!(
        message,
        "Your edit request for image 'subject.jpg' was approved. You may edit your annotations once."
    );
}

/// A decision is final; the second one is a state error.
#[sqlx::test(migrations = "../../db/migrations")]
async fn decided_requests_cannot_be_redecided(pool: PgPool) {
    let s = seed_scenario(&pool).await;
    lock_image(&pool, &s, s.image_id).await;
    let response = file_request(&pool, &s, s.image_id, "Decide me").await;
    let request_id = body_json(response).await["data"]["id"].as_i64().unwrap();

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/edit-requests/{request_id}/approve"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = put_json_auth(
        common::build_test_app(pool),
        &format!("/api/admin/edit-requests/{request_id}/reject"),
        json!({}),
        &s.admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "STATE_ERROR");
    assert_eq!(json["error"], "Request is not pending");
}
