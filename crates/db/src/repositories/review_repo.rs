//! Review flows over the `annotations` table: the review queue
//! projection, approval transitions, and rework resets.
//!
//! Rework targets an image, not a single record: all of one annotator's
//! records for the image move to `rework_requested` together, and the
//! annotator is notified once, in the same transaction.

use std::collections::HashMap;

use labelkit_core::error::CoreError;
use labelkit_core::lifecycle;
use labelkit_core::notify::NOTIFY_REWORK_REQUEST;
use labelkit_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::annotation::{
    Annotation, ReviewDetail, ReviewFilter, ReviewRow, ReviewStats, SelectedOption,
};
use crate::repositories::annotation_repo::{record_state, AnnotationRepo, COLUMNS};
use crate::repositories::notification_repo::NotificationRepo;

/// SQL predicate for each review filter, over the completed set.
fn filter_predicate(filter: Option<ReviewFilter>) -> &'static str {
    match filter {
        Some(ReviewFilter::Pending) => {
            "AND (a.review_status IS NULL OR a.review_status = 'rework_completed')"
        }
        Some(ReviewFilter::Approved) => "AND a.review_status = 'approved'",
        Some(ReviewFilter::ReworkRequested) => "AND a.review_status = 'rework_requested'",
        Some(ReviewFilter::ReworkCompleted) => "AND a.review_status = 'rework_completed'",
        None => "",
    }
}

/// Review-side operations for admins.
pub struct ReviewRepo;

impl ReviewRepo {
    /// Page of the review queue: completed records, newest activity
    /// first, with context and selected options attached.
    pub async fn list(
        pool: &PgPool,
        filter: Option<ReviewFilter>,
        category_id: Option<DbId>,
        annotator_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ReviewDetail>, sqlx::Error> {
        let predicate = filter_predicate(filter);
        let query = format!(
            "SELECT a.id, a.image_id, i.filename, a.annotator_id,
                    u.display_name AS annotator_name,
                    a.category_id, c.name AS category_name,
                    a.status, a.review_status, a.review_note, a.is_duplicate,
                    a.is_rework, a.time_spent_seconds, a.updated_at
             FROM annotations a
             JOIN images i ON i.id = a.image_id
             JOIN users u ON u.id = a.annotator_id
             JOIN categories c ON c.id = a.category_id
             WHERE a.status = 'completed' {predicate}
               AND ($1::bigint IS NULL OR a.category_id = $1)
               AND ($2::bigint IS NULL OR a.annotator_id = $2)
             ORDER BY a.updated_at DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, ReviewRow>(&query)
            .bind(category_id)
            .bind(annotator_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let mut by_annotation: HashMap<DbId, Vec<SelectedOption>> = HashMap::new();
        for option in AnnotationRepo::selected_options(pool, &ids).await? {
            by_annotation
                .entry(option.annotation_id)
                .or_default()
                .push(option);
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                let selected_options = by_annotation.remove(&row.id).unwrap_or_default();
                ReviewDetail {
                    row,
                    selected_options,
                }
            })
            .collect())
    }

    /// Total size of the review queue under the same filters.
    pub async fn count(
        pool: &PgPool,
        filter: Option<ReviewFilter>,
        category_id: Option<DbId>,
        annotator_id: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        let predicate = filter_predicate(filter);
        let query = format!(
            "SELECT COUNT(*) FROM annotations a
             WHERE a.status = 'completed' {predicate}
               AND ($1::bigint IS NULL OR a.category_id = $1)
               AND ($2::bigint IS NULL OR a.annotator_id = $2)"
        );
        let count: Option<i64> = sqlx::query_scalar(&query)
            .bind(category_id)
            .bind(annotator_id)
            .fetch_one(pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Counts per review state for dashboard badges.
    pub async fn stats(pool: &PgPool) -> Result<ReviewStats, sqlx::Error> {
        sqlx::query_as::<_, ReviewStats>(
            "SELECT COUNT(*) FILTER (WHERE status = 'completed'
                        AND (review_status IS NULL OR review_status = 'rework_completed'))
                        AS pending,
                    COUNT(*) FILTER (WHERE review_status = 'approved') AS approved,
                    COUNT(*) FILTER (WHERE review_status = 'rework_requested')
                        AS rework_requested,
                    COUNT(*) FILTER (WHERE review_status = 'rework_completed')
                        AS rework_completed,
                    COUNT(*) FILTER (WHERE status = 'completed') AS total_completed
             FROM annotations",
        )
        .fetch_one(pool)
        .await
    }

    /// Approve a completed record, locking it against annotator writes.
    ///
    /// Approving a record that is not completed, already approved, or
    /// awaiting rework is an [`CoreError::InvalidState`]; approval also
    /// clears any lingering rework note.
    pub async fn approve(
        pool: &PgPool,
        admin_id: DbId,
        annotation_id: DbId,
    ) -> DbResult<Annotation> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM annotations WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, Annotation>(&query)
            .bind(annotation_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Annotation",
                id: annotation_id,
            })?;
        let state = record_state(&row)?;
        lifecycle::check_approve(&state)?;

        let query = format!(
            "UPDATE annotations
             SET review_status = 'approved', review_note = NULL,
                 reviewed_by = $2, reviewed_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let approved = sqlx::query_as::<_, Annotation>(&query)
            .bind(annotation_id)
            .bind(admin_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(approved)
    }

    /// Overwrite a record's content and approve it in one transaction.
    ///
    /// The selections must already be validated against the record's
    /// category; the approve guard still applies, so nothing is written
    /// when the record is not in an approvable state.
    pub async fn save_edits_and_approve(
        pool: &PgPool,
        admin_id: DbId,
        annotation_id: DbId,
        option_ids: &[DbId],
        is_duplicate: Option<bool>,
    ) -> DbResult<Annotation> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM annotations WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, Annotation>(&query)
            .bind(annotation_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Annotation",
                id: annotation_id,
            })?;
        let state = record_state(&row)?;
        lifecycle::check_approve(&state)?;

        AnnotationRepo::replace_selections_inner(&mut tx, annotation_id, option_ids).await?;
        let query = format!(
            "UPDATE annotations
             SET is_duplicate = $3, review_status = 'approved', review_note = NULL,
                 reviewed_by = $2, reviewed_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let approved = sqlx::query_as::<_, Annotation>(&query)
            .bind(annotation_id)
            .bind(admin_id)
            .bind(is_duplicate)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(approved)
    }

    /// Send an image back for rework: reset every record the annotator
    /// holds on the image that is not already awaiting rework, and
    /// notify the annotator once.
    ///
    /// When `target` names the record the admin acted on, its own state
    /// is guarded strictly, so re-requesting rework on the same record
    /// fails even while sibling records are still eligible. Returns the
    /// number of records reset.
    pub async fn request_rework(
        pool: &PgPool,
        admin_id: DbId,
        image_id: DbId,
        annotator_id: DbId,
        reason: &str,
        target: Option<DbId>,
    ) -> DbResult<u64> {
        lifecycle::check_rework_reason(reason)?;
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE image_id = $1 AND annotator_id = $2
             FOR UPDATE"
        );
        let rows = sqlx::query_as::<_, Annotation>(&query)
            .bind(image_id)
            .bind(annotator_id)
            .fetch_all(&mut *tx)
            .await?;
        if rows.is_empty() {
            return Err(CoreError::InvalidState(
                "No annotations to rework for this image".to_string(),
            )
            .into());
        }
        if let Some(target_id) = target {
            let row = rows.iter().find(|a| a.id == target_id).ok_or(
                CoreError::NotFound {
                    entity: "Annotation",
                    id: target_id,
                },
            )?;
            lifecycle::check_request_rework(&record_state(row)?, reason)?;
        }
        let any_eligible = rows
            .iter()
            .any(|a| a.review_status.as_deref() != Some("rework_requested"));
        if !any_eligible {
            return Err(CoreError::InvalidState(
                "All annotations for this image are already awaiting rework".to_string(),
            )
            .into());
        }

        let result = sqlx::query(
            "UPDATE annotations
             SET status = 'in_progress', review_status = 'rework_requested',
                 review_note = $3, reviewed_by = $4, reviewed_at = NOW(),
                 is_rework = TRUE, updated_at = NOW()
             WHERE image_id = $1 AND annotator_id = $2
               AND review_status IS DISTINCT FROM 'rework_requested'",
        )
        .bind(image_id)
        .bind(annotator_id)
        .bind(reason)
        .bind(admin_id)
        .execute(&mut *tx)
        .await?;
        let reset = result.rows_affected();

        let filename: String = sqlx::query_scalar("SELECT filename FROM images WHERE id = $1")
            .bind(image_id)
            .fetch_one(&mut *tx)
            .await?;
        let message = format!(
            "Image '{filename}' needs rework ({reset} categories). Reason: {reason}"
        );
        NotificationRepo::create_inner(
            &mut tx,
            annotator_id,
            NOTIFY_REWORK_REQUEST,
            "Rework Required",
            &message,
            Some(image_id),
        )
        .await?;

        tx.commit().await?;
        Ok(reset)
    }
}
