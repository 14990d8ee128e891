//! Shared seed helpers for the repository integration tests.
//!
//! Tests here talk to the repositories directly, so unlike the API
//! suite there is no router and no tokens. Password hashing lives in
//! the API crate; seeded users carry a placeholder hash that nothing
//! in this suite ever verifies.

#![allow(dead_code)]

use labelkit_core::roles::{ROLE_ADMIN, ROLE_ANNOTATOR};
use labelkit_core::types::DbId;
use labelkit_db::models::user::{CreateUser, User};
use labelkit_db::repositories::UserRepo;
use sqlx::PgPool;

const PLACEHOLDER_HASH: &str = "unused-test-hash";

/// Create a user row and return it.
pub async fn seed_user(pool: &PgPool, username: &str, role: &str) -> User {
    let input = CreateUser {
        username: username.to_string(),
        display_name: format!("{username} (test)"),
        password_hash: PLACEHOLDER_HASH.to_string(),
        role: role.to_string(),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
}

/// Create an admin user.
pub async fn seed_admin(pool: &PgPool) -> User {
    seed_user(pool, "admin", ROLE_ADMIN).await
}

/// Create an annotator user.
pub async fn seed_annotator(pool: &PgPool, username: &str) -> User {
    seed_user(pool, username, ROLE_ANNOTATOR).await
}

/// Insert a category with the given option labels; returns the category
/// id and the option ids in label order.
pub async fn seed_category(
    pool: &PgPool,
    name: &str,
    allows_empty: bool,
    labels: &[&str],
) -> (DbId, Vec<DbId>) {
    let category_id: DbId = sqlx::query_scalar(
        "INSERT INTO categories (name, display_order, allows_empty)
         VALUES ($1, 100, $2)
         RETURNING id",
    )
    .bind(name)
    .bind(allows_empty)
    .fetch_one(pool)
    .await
    .expect("category insert should succeed");

    let mut option_ids = Vec::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO options (category_id, label, display_order)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(category_id)
        .bind(label)
        .bind(i as i32)
        .fetch_one(pool)
        .await
        .expect("option insert should succeed");
        option_ids.push(id);
    }
    (category_id, option_ids)
}

/// Insert an image and return its id.
pub async fn seed_image(pool: &PgPool, filename: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO images (filename, storage_path)
         VALUES ($1, $2)
         RETURNING id",
    )
    .bind(filename)
    .bind(format!("/data/images/{filename}"))
    .fetch_one(pool)
    .await
    .expect("image insert should succeed")
}

/// Put an annotator into a category's assignment set.
pub async fn assign_category(pool: &PgPool, user_id: DbId, category_id: DbId) {
    sqlx::query("INSERT INTO annotator_categories (user_id, category_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(category_id)
        .execute(pool)
        .await
        .expect("category assignment should succeed");
}

/// Exclusively assign an image to an annotator.
pub async fn assign_image(pool: &PgPool, user_id: DbId, image_id: DbId) {
    sqlx::query("INSERT INTO annotator_image_assignments (user_id, image_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(image_id)
        .execute(pool)
        .await
        .expect("image assignment should succeed");
}
