//! Integration tests for exclusive image allocation and category
//! assignment: batch claims, release, the admin overview, and the
//! per-annotator progress rollup.

mod common;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use common::{body_json, delete_auth, get_auth, post_json_auth, put_json_auth};
use labelkit_core::types::DbId;
use serde_json::json;
use sqlx::PgPool;

/// Claim a batch of images for a user through the admin endpoint.
async fn assign(pool: &PgPool, token: &str, user_id: DbId, count: i64) -> Response<Body> {
    post_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/users/{user_id}/images/assignments"),
        json!({ "count": count }),
        token,
    )
    .await
}

/// List the ids currently assigned to a user.
async fn assigned_ids(pool: &PgPool, token: &str, user_id: DbId) -> Vec<DbId> {
    let response = get_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/users/{user_id}/images"),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_i64().unwrap())
        .collect()
}

/// Submit one completed single-category annotation.
async fn complete_one(
    pool: &PgPool,
    token: &str,
    category_id: DbId,
    image_id: DbId,
    option_id: DbId,
) {
    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/annotator/categories/{category_id}/images/{image_id}/annotation"),
        json!({ "status": "completed", "selected_option_ids": [option_id] }),
        token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Image allocation
// ---------------------------------------------------------------------------

/// Batch assignment claims unassigned images lowest id first.
#[sqlx::test(migrations = "../../db/migrations")]
async fn assign_claims_lowest_ids_first(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker, _) = common::seed_annotator(&pool, "worker1").await;
    let img_a = common::seed_image(&pool, "a.jpg").await;
    let img_b = common::seed_image(&pool, "b.jpg").await;
    let _img_c = common::seed_image(&pool, "c.jpg").await;

    let response = assign(&pool, &admin_token, worker.id, 2).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["assigned_count"], 2);
    assert_eq!(json["data"]["requested_count"], 2);
    assert_eq!(json["data"]["remaining_unassigned"], 1);

    let ids = assigned_ids(&pool, &admin_token, worker.id).await;
    assert_eq!(ids, vec![img_a, img_b]);
}

/// Running out of unassigned images is an outcome, not an error.
#[sqlx::test(migrations = "../../db/migrations")]
async fn exhausted_pool_is_reported_not_an_error(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker, _) = common::seed_annotator(&pool, "worker1").await;

    let response = assign(&pool, &admin_token, worker.id, 5).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["assigned_count"], 0);
    assert_eq!(json["data"]["requested_count"], 5);
    assert_eq!(json["data"]["remaining_unassigned"], 0);
}

/// The batch size must be positive and bounded.
#[sqlx::test(migrations = "../../db/migrations")]
async fn assign_count_must_be_in_range(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker, _) = common::seed_annotator(&pool, "worker1").await;

    for count in [0, 1001] {
        let response = assign(&pool, &admin_token, worker.id, count).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"], "count must be between 1 and 1000");
    }
}

/// Only active annotators can receive work; admins and deactivated
/// users are refused, unknown users are a 404.
#[sqlx::test(migrations = "../../db/migrations")]
async fn work_goes_only_to_active_annotators(pool: PgPool) {
    let (admin, admin_token) = common::seed_admin(&pool).await;
    let (worker, _) = common::seed_annotator(&pool, "worker1").await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(worker.id)
        .execute(&pool)
        .await
        .unwrap();

    let response = assign(&pool, &admin_token, admin.id, 1).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Work can only be assigned to annotators");

    let response = assign(&pool, &admin_token, worker.id, 1).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Work cannot be assigned to a deactivated user");

    let response = assign(&pool, &admin_token, 999999, 1).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Two annotators claiming from the same pool never share an image.
#[sqlx::test(migrations = "../../db/migrations")]
async fn assigned_images_never_overlap(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker1, _) = common::seed_annotator(&pool, "worker1").await;
    let (worker2, _) = common::seed_annotator(&pool, "worker2").await;
    for i in 0..4 {
        common::seed_image(&pool, &format!("img_{i}.jpg")).await;
    }

    let response = assign(&pool, &admin_token, worker1.id, 3).await;
    assert_eq!(body_json(response).await["data"]["assigned_count"], 3);
    let response = assign(&pool, &admin_token, worker2.id, 3).await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["assigned_count"], 1);
    assert_eq!(json["data"]["remaining_unassigned"], 0);

    let first = assigned_ids(&pool, &admin_token, worker1.id).await;
    let second = assigned_ids(&pool, &admin_token, worker2.id).await;
    assert_eq!(first.len(), 3);
    assert_eq!(second.len(), 1);
    assert!(!first.contains(&second[0]));
}

/// Releasing assignments returns them to the pool; releasing twice is
/// a no-op, not an error.
#[sqlx::test(migrations = "../../db/migrations")]
async fn unassign_releases_everything_and_is_idempotent(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker1, _) = common::seed_annotator(&pool, "worker1").await;
    let (worker2, _) = common::seed_annotator(&pool, "worker2").await;
    common::seed_image(&pool, "a.jpg").await;
    common::seed_image(&pool, "b.jpg").await;
    let response = assign(&pool, &admin_token, worker1.id, 2).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = delete_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/users/{}/images/assignments", worker1.id),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["removed_count"], 2);

    let response = delete_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/users/{}/images/assignments", worker1.id),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["removed_count"], 0);

    // The released images are claimable again.
    let response = assign(&pool, &admin_token, worker2.id, 2).await;
    assert_eq!(body_json(response).await["data"]["assigned_count"], 2);
}

/// Asking for an unknown user's images is a 404, not an empty list.
#[sqlx::test(migrations = "../../db/migrations")]
async fn listing_images_for_unknown_user_is_404(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;

    let response = get_auth(
        common::build_test_app(pool),
        "/api/admin/users/999999/images",
        &admin_token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "User with id 999999 not found");
}

/// The overview reports one row per active annotator with assignment
/// and record-status counts; admins and deactivated users are omitted.
#[sqlx::test(migrations = "../../db/migrations")]
async fn overview_rolls_up_active_annotators(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker, worker_token) = common::seed_annotator(&pool, "worker1").await;
    let (ghost, _) = common::seed_annotator(&pool, "worker2").await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(ghost.id)
        .execute(&pool)
        .await
        .unwrap();

    let (category_id, option_ids) =
        common::seed_category(&pool, "test_palette", false, &["red", "blue"]).await;
    common::assign_category(&pool, worker.id, category_id).await;
    let img_a = common::seed_image(&pool, "a.jpg").await;
    common::seed_image(&pool, "b.jpg").await;
    let response = assign(&pool, &admin_token, worker.id, 2).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    complete_one(&pool, &worker_token, category_id, img_a, option_ids[0]).await;

    let response = get_auth(
        common::build_test_app(pool),
        "/api/admin/assignments",
        &admin_token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], worker.id);
    assert_eq!(rows[0]["username"], "worker1");
    assert_eq!(rows[0]["assigned_images"], 2);
    assert_eq!(rows[0]["completed"], 1);
    assert_eq!(rows[0]["in_progress"], 0);
    assert_eq!(rows[0]["skipped"], 0);
}

// ---------------------------------------------------------------------------
// Category assignment
// ---------------------------------------------------------------------------

/// Replacing the category set is exact: removed ids go away, new ids
/// appear, and the response lists the resulting set.
#[sqlx::test(migrations = "../../db/migrations")]
async fn replace_categories_sets_the_exact_set(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker, _) = common::seed_annotator(&pool, "worker1").await;
    let (cat_a, _) = common::seed_category(&pool, "test_palette", false, &["red"]).await;
    let (cat_b, _) = common::seed_category(&pool, "test_defects", true, &["blur"]).await;
    let (cat_c, _) = common::seed_category(&pool, "test_lighting", false, &["dark"]).await;

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/users/{}/categories", worker.id),
        json!({ "category_ids": [cat_a, cat_b] }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 2);

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/users/{}/categories", worker.id),
        json!({ "category_ids": [cat_b, cat_c] }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let mut names: Vec<String> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["test_defects", "test_lighting"]);

    let held: Vec<DbId> = sqlx::query_scalar(
        "SELECT category_id FROM annotator_categories WHERE user_id = $1 ORDER BY category_id",
    )
    .bind(worker.id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(held, vec![cat_b, cat_c]);
}

/// Category replacement checks both the target user and every id.
#[sqlx::test(migrations = "../../db/migrations")]
async fn replace_categories_validates_ids_and_target(pool: PgPool) {
    let (admin, admin_token) = common::seed_admin(&pool).await;
    let (worker, _) = common::seed_annotator(&pool, "worker1").await;

    let response = put_json_auth(
        common::build_test_app(pool.clone()),
        &format!("/api/admin/users/{}/categories", worker.id),
        json!({ "category_ids": [999999] }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Category with id 999999 not found");

    let response = put_json_auth(
        common::build_test_app(pool),
        &format!("/api/admin/users/{}/categories", admin.id),
        json!({ "category_ids": [] }),
        &admin_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Work can only be assigned to annotators");
}

// ---------------------------------------------------------------------------
// Progress dashboard
// ---------------------------------------------------------------------------

/// Progress reports overall record totals plus per-category queue
/// completion for each active annotator.
#[sqlx::test(migrations = "../../db/migrations")]
async fn progress_reports_totals_and_queue_completion(pool: PgPool) {
    let (_, admin_token) = common::seed_admin(&pool).await;
    let (worker, worker_token) = common::seed_annotator(&pool, "worker1").await;
    let (category_id, option_ids) =
        common::seed_category(&pool, "test_palette", false, &["red", "blue"]).await;
    common::assign_category(&pool, worker.id, category_id).await;
    let img_a = common::seed_image(&pool, "a.jpg").await;
    common::seed_image(&pool, "b.jpg").await;
    complete_one(&pool, &worker_token, category_id, img_a, option_ids[1]).await;

    let response = get_auth(
        common::build_test_app(pool),
        "/api/admin/progress",
        &admin_token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], worker.id);
    assert_eq!(rows[0]["display_name"], "worker1 (test)");
    assert_eq!(rows[0]["totals"]["completed"], 1);
    assert_eq!(rows[0]["totals"]["in_progress"], 0);
    assert_eq!(rows[0]["totals"]["skipped"], 0);

    let categories = rows[0]["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["name"], "test_palette");
    assert_eq!(categories[0]["completed"], 1);
    assert_eq!(categories[0]["total"], 2);
}
