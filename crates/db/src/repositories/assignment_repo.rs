//! Repository for category membership and exclusive image assignment.
//!
//! Image exclusivity is enforced by `uq_image_assignments_image`, never
//! by application-level checks: concurrent assignment batches may pick
//! overlapping candidates, in which case the loser's insert fails with a
//! unique violation and is retried against the updated pool.

use labelkit_core::types::DbId;
use sqlx::PgPool;

use crate::models::assignment::{AnnotatorOverview, AssignImagesOutcome};
use crate::models::image::Image;

/// Attempts per assignment batch before surfacing the unique violation.
const MAX_ASSIGN_ATTEMPTS: u32 = 3;

/// Write and read operations for work allocation.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Replace an annotator's category set with `category_ids`.
    ///
    /// Removals and additions are applied in one transaction; categories
    /// already assigned are kept untouched so their `created_at` stands.
    pub async fn replace_categories(
        pool: &PgPool,
        user_id: DbId,
        category_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query(
            "DELETE FROM annotator_categories WHERE user_id = $1 AND category_id <> ALL($2)",
        )
        .bind(user_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO annotator_categories (user_id, category_id)
             SELECT $1, unnest($2::bigint[])
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    /// Assign up to `count` unassigned images (lowest ids first) to the
    /// annotator.
    ///
    /// The insert claims images straight out of the unassigned pool, so
    /// a concurrent batch racing for the same images makes this
    /// statement fail on `uq_image_assignments_image`; it is retried
    /// against the shrunken pool up to [`MAX_ASSIGN_ATTEMPTS`] times.
    /// An exhausted pool is not an error: `assigned_count` is simply
    /// lower than requested (possibly zero).
    pub async fn assign_images(
        pool: &PgPool,
        user_id: DbId,
        count: i64,
    ) -> Result<AssignImagesOutcome, sqlx::Error> {
        let mut attempts = 0;
        let assigned_count = loop {
            attempts += 1;
            let result = sqlx::query(
                "INSERT INTO annotator_image_assignments (user_id, image_id)
                 SELECT $1, id FROM images
                 WHERE id NOT IN (SELECT image_id FROM annotator_image_assignments)
                 ORDER BY id
                 LIMIT $2",
            )
            .bind(user_id)
            .bind(count)
            .execute(pool)
            .await;
            match result {
                Ok(done) => break done.rows_affected() as i64,
                Err(sqlx::Error::Database(db))
                    if db.code().as_deref() == Some("23505")
                        && attempts < MAX_ASSIGN_ATTEMPTS =>
                {
                    tracing::debug!(
                        user_id,
                        attempts,
                        "assignment batch lost a claim race, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        };
        let remaining = Self::count_unassigned(pool).await?;
        Ok(AssignImagesOutcome {
            assigned_count,
            requested_count: count,
            remaining_unassigned: remaining,
        })
    }

    /// Remove all of an annotator's image assignments, returning how
    /// many were removed.
    pub async fn unassign_all(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM annotator_image_assignments WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Images currently assigned to the annotator, lowest id first.
    pub async fn assigned_images(pool: &PgPool, user_id: DbId) -> Result<Vec<Image>, sqlx::Error> {
        sqlx::query_as::<_, Image>(
            "SELECT i.id, i.filename, i.storage_path, i.created_at
             FROM images i
             JOIN annotator_image_assignments aia ON aia.image_id = i.id
             WHERE aia.user_id = $1
             ORDER BY i.id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Whether the image is exclusively assigned to the annotator.
    pub async fn is_assigned(
        pool: &PgPool,
        user_id: DbId,
        image_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM annotator_image_assignments
                WHERE user_id = $1 AND image_id = $2
             )",
        )
        .bind(user_id)
        .bind(image_id)
        .fetch_one(pool)
        .await
    }

    /// Number of images with no assignment.
    pub async fn count_unassigned(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM images
             WHERE id NOT IN (SELECT image_id FROM annotator_image_assignments)",
        )
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Per-annotator allocation rollup for the admin overview: assigned
    /// image count plus completed/in-progress/skipped annotation counts.
    pub async fn overview(pool: &PgPool) -> Result<Vec<AnnotatorOverview>, sqlx::Error> {
        sqlx::query_as::<_, AnnotatorOverview>(
            "SELECT u.id AS user_id, u.username, u.display_name,
                    (SELECT COUNT(*) FROM annotator_image_assignments aia
                     WHERE aia.user_id = u.id) AS assigned_images,
                    (SELECT COUNT(*) FROM annotations a
                     WHERE a.annotator_id = u.id AND a.status = 'completed') AS completed,
                    (SELECT COUNT(*) FROM annotations a
                     WHERE a.annotator_id = u.id AND a.status = 'in_progress') AS in_progress,
                    (SELECT COUNT(*) FROM annotations a
                     WHERE a.annotator_id = u.id AND a.status = 'skipped') AS skipped
             FROM users u
             WHERE u.role = 'annotator' AND u.is_active = TRUE
             ORDER BY u.id",
        )
        .fetch_all(pool)
        .await
    }
}
