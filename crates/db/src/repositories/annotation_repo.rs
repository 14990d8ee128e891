//! Repository for the `annotations` and `annotation_selections` tables.
//!
//! Submission flows run inside a transaction that first locks the
//! affected rows (`SELECT ... FOR UPDATE`), then applies the lifecycle
//! guards from `labelkit_core`, then writes. A guard verdict therefore
//! always refers to the row version the write will replace.

use std::collections::HashMap;

use labelkit_core::error::CoreError;
use labelkit_core::lifecycle::{
    self, AnnotationStatus, RecordState, ReviewStatus,
};
use labelkit_core::queue::{AllocationMode, QueueEntry};
use labelkit_core::timing::{clamp_elapsed, TimeLimits};
use labelkit_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::DbResult;
use crate::models::annotation::{Annotation, QueueRow, SelectedOption, StatusCount};
use crate::models::image::Image;
use crate::repositories::edit_request_repo::EditRequestRepo;

/// Column list for `annotations` queries, shared with the review flows.
pub(crate) const COLUMNS: &str =
    "id, image_id, annotator_id, category_id, status, review_status, \
     review_note, reviewed_by, reviewed_at, is_duplicate, is_rework, \
     time_spent_seconds, created_at, updated_at";

/// One category's validated content within an image-wide submission.
#[derive(Debug, Clone)]
pub struct EntrySave {
    pub category_id: DbId,
    pub option_ids: Vec<DbId>,
    pub is_duplicate: Option<bool>,
}

/// Validated content for a single-category save.
#[derive(Debug, Clone)]
pub struct SingleSave {
    pub image_id: DbId,
    pub annotator_id: DbId,
    pub category_id: DbId,
    pub target: AnnotationStatus,
    pub option_ids: Vec<DbId>,
    pub is_duplicate: Option<bool>,
    pub elapsed_seconds: Option<i32>,
}

/// Lifecycle snapshot of a stored row, for the guards.
pub(crate) fn record_state(a: &Annotation) -> Result<RecordState, CoreError> {
    Ok(RecordState {
        status: AnnotationStatus::from_str(&a.status)?,
        review: ReviewStatus::from_opt(a.review_status.as_deref())?,
        is_rework: a.is_rework,
    })
}

/// Write and read operations for annotation records.
pub struct AnnotationRepo;

impl AnnotationRepo {
    // -----------------------------------------------------------------------
    // Plain reads
    // -----------------------------------------------------------------------

    /// Find an annotation by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM annotations WHERE id = $1");
        sqlx::query_as::<_, Annotation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the record for one (image, annotator, category) key.
    pub async fn find_by_key(
        pool: &PgPool,
        image_id: DbId,
        annotator_id: DbId,
        category_id: DbId,
    ) -> Result<Option<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE image_id = $1 AND annotator_id = $2 AND category_id = $3"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(image_id)
            .bind(annotator_id)
            .bind(category_id)
            .fetch_optional(pool)
            .await
    }

    /// All of one annotator's records for an image, by category.
    pub async fn list_for_image_user(
        pool: &PgPool,
        image_id: DbId,
        annotator_id: DbId,
    ) -> Result<Vec<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE image_id = $1 AND annotator_id = $2
             ORDER BY category_id"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(image_id)
            .bind(annotator_id)
            .fetch_all(pool)
            .await
    }

    /// One annotator's records across a page of images.
    pub async fn list_for_images_user(
        pool: &PgPool,
        image_ids: &[DbId],
        annotator_id: DbId,
    ) -> Result<Vec<Annotation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE image_id = ANY($1) AND annotator_id = $2
             ORDER BY image_id, category_id"
        );
        sqlx::query_as::<_, Annotation>(&query)
            .bind(image_ids)
            .bind(annotator_id)
            .fetch_all(pool)
            .await
    }

    /// Selected option ids of one annotation.
    pub async fn selection_ids(
        pool: &PgPool,
        annotation_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT option_id FROM annotation_selections
             WHERE annotation_id = $1
             ORDER BY option_id",
        )
        .bind(annotation_id)
        .fetch_all(pool)
        .await
    }

    /// Selected options, with labels, for a batch of annotations.
    pub async fn selected_options(
        pool: &PgPool,
        annotation_ids: &[DbId],
    ) -> Result<Vec<SelectedOption>, sqlx::Error> {
        sqlx::query_as::<_, SelectedOption>(
            "SELECT s.annotation_id, s.option_id, o.label
             FROM annotation_selections s
             JOIN options o ON o.id = s.option_id
             WHERE s.annotation_id = ANY($1)
             ORDER BY s.annotation_id, o.display_order, o.id",
        )
        .bind(annotation_ids)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Queue projections
    // -----------------------------------------------------------------------

    /// Compute the annotator's work queue for a category, ordered by
    /// image id.
    ///
    /// In shared-pool mode the queue spans every image; in
    /// assigned-only mode it holds exactly the annotator's exclusive
    /// assignments. Positions completed by a peer stay in the queue as
    /// satisfied rather than dropping out, so indices never shift under
    /// concurrent work. A position is satisfied when the task is
    /// completed by anyone or skipped by the caller.
    pub async fn category_queue(
        pool: &PgPool,
        annotator_id: DbId,
        category_id: DbId,
        mode: AllocationMode,
    ) -> Result<Vec<QueueEntry>, sqlx::Error> {
        let rows = match mode {
            AllocationMode::SharedPool => {
                sqlx::query_as::<_, QueueRow>(
                    "SELECT i.id AS image_id,
                            mine.status AS my_status,
                            EXISTS (
                                SELECT 1 FROM annotations a
                                WHERE a.image_id = i.id
                                  AND a.category_id = $2
                                  AND a.status = 'completed'
                            ) AS completed_any
                     FROM images i
                     LEFT JOIN annotations mine
                         ON mine.image_id = i.id
                        AND mine.category_id = $2
                        AND mine.annotator_id = $1
                     ORDER BY i.id",
                )
                .bind(annotator_id)
                .bind(category_id)
                .fetch_all(pool)
                .await?
            }
            AllocationMode::AssignedOnly => {
                sqlx::query_as::<_, QueueRow>(
                    "SELECT i.id AS image_id,
                            mine.status AS my_status,
                            EXISTS (
                                SELECT 1 FROM annotations a
                                WHERE a.image_id = i.id
                                  AND a.category_id = $2
                                  AND a.status = 'completed'
                            ) AS completed_any
                     FROM annotator_image_assignments aia
                     JOIN images i ON i.id = aia.image_id
                     LEFT JOIN annotations mine
                         ON mine.image_id = i.id
                        AND mine.category_id = $2
                        AND mine.annotator_id = $1
                     WHERE aia.user_id = $1
                     ORDER BY i.id",
                )
                .bind(annotator_id)
                .bind(category_id)
                .fetch_all(pool)
                .await?
            }
        };
        Ok(rows
            .into_iter()
            .map(|r| QueueEntry {
                image_id: r.image_id,
                satisfied: r.completed_any || r.my_status.as_deref() == Some("skipped"),
            })
            .collect())
    }

    /// Whether another annotator has completed this (image, category) task.
    pub async fn completed_by_other(
        pool: &PgPool,
        image_id: DbId,
        category_id: DbId,
        annotator_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM annotations
                WHERE image_id = $1 AND category_id = $2
                  AND annotator_id <> $3 AND status = 'completed'
             )",
        )
        .bind(image_id)
        .bind(category_id)
        .bind(annotator_id)
        .fetch_one(pool)
        .await
    }

    /// Page of images visible to the annotator on the image-scoped
    /// queue: their exclusive assignments plus any image they have
    /// annotation rows on.
    pub async fn annotator_images(
        pool: &PgPool,
        annotator_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Image>, sqlx::Error> {
        sqlx::query_as::<_, Image>(
            "SELECT i.id, i.filename, i.storage_path, i.created_at
             FROM images i
             WHERE EXISTS (
                       SELECT 1 FROM annotator_image_assignments aia
                       WHERE aia.image_id = i.id AND aia.user_id = $1
                   )
                OR EXISTS (
                       SELECT 1 FROM annotations a
                       WHERE a.image_id = i.id AND a.annotator_id = $1
                   )
             ORDER BY i.id
             LIMIT $2 OFFSET $3",
        )
        .bind(annotator_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Total size of [`Self::annotator_images`] for pagination.
    pub async fn count_annotator_images(
        pool: &PgPool,
        annotator_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM images i
             WHERE EXISTS (
                       SELECT 1 FROM annotator_image_assignments aia
                       WHERE aia.image_id = i.id AND aia.user_id = $1
                   )
                OR EXISTS (
                       SELECT 1 FROM annotations a
                       WHERE a.image_id = i.id AND a.annotator_id = $1
                   )",
        )
        .bind(annotator_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    /// Per-category, per-status record counts for one annotator.
    pub async fn status_counts(
        pool: &PgPool,
        annotator_id: DbId,
    ) -> Result<Vec<StatusCount>, sqlx::Error> {
        sqlx::query_as::<_, StatusCount>(
            "SELECT category_id, status, COUNT(*) AS count
             FROM annotations
             WHERE annotator_id = $1
             GROUP BY category_id, status",
        )
        .bind(annotator_id)
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Time tracking
    // -----------------------------------------------------------------------

    /// Fold an elapsed reading into every record the annotator holds on
    /// an image: `GREATEST(stored, LEAST(raw, cap))`, with the cap
    /// chosen per record by its rework flag.
    ///
    /// Updates existing rows only; reporting time never creates records.
    /// Returns the number of rows touched.
    pub async fn record_time(
        pool: &PgPool,
        image_id: DbId,
        annotator_id: DbId,
        raw_seconds: i32,
        limits: &TimeLimits,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE annotations
             SET time_spent_seconds = GREATEST(
                     time_spent_seconds,
                     LEAST($3, CASE WHEN is_rework THEN $4 ELSE $5 END)
                 ),
                 updated_at = NOW()
             WHERE image_id = $1 AND annotator_id = $2",
        )
        .bind(image_id)
        .bind(annotator_id)
        .bind(raw_seconds)
        .bind(limits.max_rework_secs)
        .bind(limits.max_annotation_secs)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    // -----------------------------------------------------------------------
    // Submission flows
    // -----------------------------------------------------------------------

    /// Save one category's annotation: draft, submit, or skip.
    ///
    /// Locks the existing row (if any), applies the transition guards,
    /// then upserts the record and rewrites its selections. A submit on
    /// a locked record spends the caller's edit-request exemption in the
    /// same transaction.
    pub async fn save_single(
        pool: &PgPool,
        input: &SingleSave,
        limits: &TimeLimits,
    ) -> DbResult<Annotation> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM annotations
             WHERE image_id = $1 AND annotator_id = $2 AND category_id = $3
             FOR UPDATE"
        );
        let existing = sqlx::query_as::<_, Annotation>(&query)
            .bind(input.image_id)
            .bind(input.annotator_id)
            .bind(input.category_id)
            .fetch_optional(&mut *tx)
            .await?;
        let state = existing.as_ref().map(record_state).transpose()?;

        let mut exemption_id = None;
        if input.target == AnnotationStatus::Skipped {
            lifecycle::check_skip(state.as_ref())?;
        } else {
            if state.is_some_and(|s| s.is_locked()) {
                exemption_id = EditRequestRepo::active_exemption_inner(
                    &mut tx,
                    input.image_id,
                    input.annotator_id,
                )
                .await?;
            }
            lifecycle::check_write(state.as_ref(), exemption_id.is_some())?;
        }

        // Review status only moves on a submit; drafts and skips keep it.
        let unchanged = existing
            .as_ref()
            .and_then(|a| a.review_status.as_deref().map(str::to_owned));
        let (next_review, consume) = if input.target == AnnotationStatus::Completed {
            let t = lifecycle::submit_transition(state.as_ref());
            let consume = if t.consumes_exemption {
                exemption_id
            } else {
                None
            };
            (t.next_review.map(|r| r.as_str().to_owned()), consume)
        } else {
            (unchanged, None)
        };

        let stored = existing.as_ref().map_or(0, |a| a.time_spent_seconds);
        let is_rework = existing.as_ref().is_some_and(|a| a.is_rework);
        let time = match input.elapsed_seconds {
            Some(raw) => clamp_elapsed(stored, raw, limits.cap_for(is_rework)),
            None => stored,
        };

        let saved = match &existing {
            Some(a) => {
                let query = format!(
                    "UPDATE annotations
                     SET status = $2, review_status = $3, is_duplicate = $4,
                         time_spent_seconds = $5, updated_at = NOW()
                     WHERE id = $1
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, Annotation>(&query)
                    .bind(a.id)
                    .bind(input.target.as_str())
                    .bind(next_review.as_deref())
                    .bind(input.is_duplicate)
                    .bind(time)
                    .fetch_one(&mut *tx)
                    .await?
            }
            None => {
                let query = format!(
                    "INSERT INTO annotations
                         (image_id, annotator_id, category_id, status, review_status,
                          is_duplicate, time_spent_seconds)
                     VALUES ($1, $2, $3, $4, $5, $6, $7)
                     RETURNING {COLUMNS}"
                );
                sqlx::query_as::<_, Annotation>(&query)
                    .bind(input.image_id)
                    .bind(input.annotator_id)
                    .bind(input.category_id)
                    .bind(input.target.as_str())
                    .bind(next_review.as_deref())
                    .bind(input.is_duplicate)
                    .bind(time)
                    .fetch_one(&mut *tx)
                    .await?
            }
        };

        // A skip clears the record's picks regardless of what was sent.
        let selections: &[DbId] = if input.target == AnnotationStatus::Skipped {
            &[]
        } else {
            &input.option_ids
        };
        Self::replace_selections_inner(&mut tx, saved.id, selections).await?;

        if let Some(request_id) = consume {
            EditRequestRepo::consume_inner(&mut tx, request_id).await?;
        }

        tx.commit().await?;
        Ok(saved)
    }

    /// Submit an image's full category set in one transaction.
    ///
    /// `entries` must already be validated against the annotator's
    /// assigned categories. Every entry is written as `completed`; each
    /// record's review transition is computed from its own prior state.
    /// Writing any approved record requires (and spends, once) the
    /// caller's edit-request exemption. Returns the saved category ids.
    pub async fn submit_image_wide(
        pool: &PgPool,
        image_id: DbId,
        annotator_id: DbId,
        entries: &[EntrySave],
        elapsed_seconds: Option<i32>,
        limits: &TimeLimits,
    ) -> DbResult<Vec<DbId>> {
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
        let mut by_category: HashMap<DbId, Annotation> =
            rows.into_iter().map(|a| (a.category_id, a)).collect();

        let touches_locked = entries.iter().any(|e| {
            by_category
                .get(&e.category_id)
                .is_some_and(|a| a.review_status.as_deref() == Some("approved"))
        });
        let mut exemption_id = None;
        if touches_locked {
            exemption_id =
                EditRequestRepo::active_exemption_inner(&mut tx, image_id, annotator_id).await?;
            if exemption_id.is_none() {
                return Err(CoreError::Forbidden(
                    "This image is locked. Request edit permission from an admin.".to_string(),
                )
                .into());
            }
        }

        let mut saved_categories = Vec::with_capacity(entries.len());
        let mut spent_exemption = false;
        for entry in entries {
            let existing = by_category.remove(&entry.category_id);
            let state = existing.as_ref().map(record_state).transpose()?;
            let t = lifecycle::submit_transition(state.as_ref());
            if t.consumes_exemption {
                spent_exemption = true;
            }

            let stored = existing.as_ref().map_or(0, |a| a.time_spent_seconds);
            let is_rework = existing.as_ref().is_some_and(|a| a.is_rework);
            let time = match elapsed_seconds {
                Some(raw) => clamp_elapsed(stored, raw, limits.cap_for(is_rework)),
                None => stored,
            };
            let next_review = t.next_review.map(|r| r.as_str());

            let annotation_id = match &existing {
                Some(a) => {
                    let query = format!(
                        "UPDATE annotations
                         SET status = 'completed', review_status = $2, is_duplicate = $3,
                             time_spent_seconds = $4, updated_at = NOW()
                         WHERE id = $1
                         RETURNING id"
                    );
                    sqlx::query_scalar::<_, DbId>(&query)
                        .bind(a.id)
                        .bind(next_review)
                        .bind(entry.is_duplicate)
                        .bind(time)
                        .fetch_one(&mut *tx)
                        .await?
                }
                None => {
                    sqlx::query_scalar::<_, DbId>(
                        "INSERT INTO annotations
                             (image_id, annotator_id, category_id, status, review_status,
                              is_duplicate, time_spent_seconds)
                         VALUES ($1, $2, $3, 'completed', $4, $5, $6)
                         RETURNING id",
                    )
                    .bind(image_id)
                    .bind(annotator_id)
                    .bind(entry.category_id)
                    .bind(next_review)
                    .bind(entry.is_duplicate)
                    .bind(time)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };
            Self::replace_selections_inner(&mut tx, annotation_id, &entry.option_ids).await?;
            saved_categories.push(entry.category_id);
        }

        if spent_exemption {
            if let Some(request_id) = exemption_id {
                EditRequestRepo::consume_inner(&mut tx, request_id).await?;
            }
        }

        tx.commit().await?;
        Ok(saved_categories)
    }

    /// Rewrite an annotation's selections inside an open transaction.
    pub(crate) async fn replace_selections_inner(
        tx: &mut Transaction<'_, Postgres>,
        annotation_id: DbId,
        option_ids: &[DbId],
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM annotation_selections WHERE annotation_id = $1")
            .bind(annotation_id)
            .execute(&mut **tx)
            .await?;
        if !option_ids.is_empty() {
            sqlx::query(
                "INSERT INTO annotation_selections (annotation_id, option_id)
                 SELECT $1, unnest($2::bigint[])",
            )
            .bind(annotation_id)
            .bind(option_ids)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}
