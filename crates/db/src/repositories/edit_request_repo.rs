//! Repository for the `edit_requests` table.
//!
//! `uq_edit_requests_one_pending` (partial, WHERE status='pending')
//! enforces the one-pending-request-per-(image, annotator) invariant at
//! commit time; creation treats the violation as an expected conflict.

use labelkit_core::error::CoreError;
use labelkit_core::lifecycle::EditRequestStatus;
use labelkit_core::notify::{NOTIFY_EDIT_REQUEST_APPROVED, NOTIFY_EDIT_REQUEST_REJECTED};
use labelkit_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::DbResult;
use crate::models::edit_request::{EditRequest, EditRequestDetail};
use crate::repositories::notification_repo::NotificationRepo;

/// Column list for `edit_requests` queries.
const COLUMNS: &str = "id, image_id, user_id, reason, status, reviewed_by, reviewed_at, \
                       review_note, consumed_at, created_at, updated_at";

/// Write and read operations for edit requests.
pub struct EditRequestRepo;

impl EditRequestRepo {
    /// File an edit request for a locked image.
    ///
    /// A concurrent or repeated request while one is still pending hits
    /// the partial unique index and surfaces as [`CoreError::Conflict`].
    pub async fn create(
        pool: &PgPool,
        image_id: DbId,
        user_id: DbId,
        reason: &str,
    ) -> DbResult<EditRequest> {
        let query = format!(
            "INSERT INTO edit_requests (image_id, user_id, reason)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let result = sqlx::query_as::<_, EditRequest>(&query)
            .bind(image_id)
            .bind(user_id)
            .bind(reason)
            .fetch_one(pool)
            .await;
        match result {
            Ok(request) => Ok(request),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => {
                Err(CoreError::Conflict(
                    "An edit request for this image is already pending".to_string(),
                )
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find an edit request by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EditRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM edit_requests WHERE id = $1");
        sqlx::query_as::<_, EditRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All requests filed by one annotator, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<EditRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM edit_requests
             WHERE user_id = $1
             ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, EditRequest>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// The newest request one annotator has for an image, if any.
    pub async fn latest_for_image_user(
        pool: &PgPool,
        image_id: DbId,
        user_id: DbId,
    ) -> Result<Option<EditRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM edit_requests
             WHERE image_id = $1 AND user_id = $2
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, EditRequest>(&query)
            .bind(image_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Admin listing with requester and image context, optionally
    /// filtered by status, newest first.
    pub async fn list_detailed(
        pool: &PgPool,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EditRequestDetail>, sqlx::Error> {
        let filter = if status.is_some() {
            "AND er.status = $3"
        } else {
            ""
        };
        let query = format!(
            "SELECT er.id, er.image_id, i.filename, er.user_id, u.username, u.display_name,
                    er.reason, er.status, er.reviewed_by, er.reviewed_at, er.review_note,
                    er.consumed_at, er.created_at
             FROM edit_requests er
             JOIN images i ON i.id = er.image_id
             JOIN users u ON u.id = er.user_id
             WHERE TRUE {filter}
             ORDER BY er.created_at DESC
             LIMIT $1 OFFSET $2"
        );
        let mut q = sqlx::query_as::<_, EditRequestDetail>(&query)
            .bind(limit)
            .bind(offset);
        if let Some(status) = status {
            q = q.bind(status);
        }
        q.fetch_all(pool).await
    }

    /// Number of requests still awaiting a decision.
    pub async fn pending_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT COUNT(*) FROM edit_requests WHERE status = 'pending'")
                .fetch_one(pool)
                .await?;
        Ok(count.unwrap_or(0))
    }

    /// Whether the annotator holds an active (approved, unconsumed)
    /// exemption for the image.
    pub async fn active_exemption(
        pool: &PgPool,
        image_id: DbId,
        user_id: DbId,
    ) -> Result<Option<EditRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM edit_requests
             WHERE image_id = $1 AND user_id = $2
               AND status = 'approved' AND consumed_at IS NULL
             ORDER BY reviewed_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, EditRequest>(&query)
            .bind(image_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Locked-row variant of [`Self::active_exemption`] for submission
    /// transactions: the returned id stays valid until commit.
    pub(crate) async fn active_exemption_inner(
        tx: &mut Transaction<'_, Postgres>,
        image_id: DbId,
        user_id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM edit_requests
             WHERE image_id = $1 AND user_id = $2
               AND status = 'approved' AND consumed_at IS NULL
             ORDER BY reviewed_at DESC
             LIMIT 1
             FOR UPDATE",
        )
        .bind(image_id)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
    }

    /// Stamp an exemption as spent, inside an open transaction.
    pub(crate) async fn consume_inner(
        tx: &mut Transaction<'_, Postgres>,
        request_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE edit_requests
             SET consumed_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(request_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Decide a pending request, notifying the requester in the same
    /// transaction.
    ///
    /// Deciding a request that is no longer pending is an
    /// [`CoreError::InvalidState`].
    pub async fn decide(
        pool: &PgPool,
        admin_id: DbId,
        request_id: DbId,
        approve: bool,
        review_note: Option<&str>,
    ) -> DbResult<EditRequest> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM edit_requests WHERE id = $1 FOR UPDATE");
        let request = sqlx::query_as::<_, EditRequest>(&query)
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Edit request",
                id: request_id,
            })?;
        if EditRequestStatus::from_str(&request.status)? != EditRequestStatus::Pending {
            return Err(CoreError::InvalidState("Request is not pending".to_string()).into());
        }

        let next = if approve {
            EditRequestStatus::Approved
        } else {
            EditRequestStatus::Rejected
        };
        let query = format!(
            "UPDATE edit_requests
             SET status = $2, reviewed_by = $3, reviewed_at = NOW(),
                 review_note = $4, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let decided = sqlx::query_as::<_, EditRequest>(&query)
            .bind(request_id)
            .bind(next.as_str())
            .bind(admin_id)
            .bind(review_note)
            .fetch_one(&mut *tx)
            .await?;

        let filename: String = sqlx::query_scalar("SELECT filename FROM images WHERE id = $1")
            .bind(decided.image_id)
            .fetch_one(&mut *tx)
            .await?;
        let (notification_type, title, message) = if approve {
            (
                NOTIFY_EDIT_REQUEST_APPROVED,
                "Edit Request Approved",
                format!(
                    "Your edit request for image '{filename}' was approved. \
                     You may edit your annotations once."
                ),
            )
        } else {
            (
                NOTIFY_EDIT_REQUEST_REJECTED,
                "Edit Request Rejected",
                format!("Your edit request for image '{filename}' was rejected."),
            )
        };
        NotificationRepo::create_inner(
            &mut tx,
            decided.user_id,
            notification_type,
            title,
            &message,
            Some(decided.image_id),
        )
        .await?;

        tx.commit().await?;
        Ok(decided)
    }
}
