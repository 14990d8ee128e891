//! Repository for the `images` table.

use labelkit_core::types::DbId;
use sqlx::PgPool;

use crate::models::image::Image;

/// Column list for `images` queries.
const COLUMNS: &str = "id, filename, storage_path, created_at";

/// Read operations over the image inventory.
pub struct ImageRepo;

impl ImageRepo {
    /// Find an image by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Image>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM images WHERE id = $1");
        sqlx::query_as::<_, Image>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Page through the inventory, optionally filtered by whether an
    /// image currently has an exclusive assignment.
    pub async fn list(
        pool: &PgPool,
        assigned: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Image>, sqlx::Error> {
        let filter = match assigned {
            Some(true) => "WHERE id IN (SELECT image_id FROM annotator_image_assignments)",
            Some(false) => "WHERE id NOT IN (SELECT image_id FROM annotator_image_assignments)",
            None => "",
        };
        let query = format!(
            "SELECT {COLUMNS} FROM images {filter}
             ORDER BY id
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Image>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Inventory size under the same filter as [`Self::list`].
    pub async fn count(pool: &PgPool, assigned: Option<bool>) -> Result<i64, sqlx::Error> {
        let filter = match assigned {
            Some(true) => "WHERE id IN (SELECT image_id FROM annotator_image_assignments)",
            Some(false) => "WHERE id NOT IN (SELECT image_id FROM annotator_image_assignments)",
            None => "",
        };
        let query = format!("SELECT COUNT(*) FROM images {filter}");
        let count: Option<i64> = sqlx::query_scalar(&query).fetch_one(pool).await?;
        Ok(count.unwrap_or(0))
    }
}
