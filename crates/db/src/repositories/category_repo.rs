//! Repository for the `categories` and `options` tables.
//!
//! The taxonomy is seeded by migrations and read-only at runtime, so
//! this repository has no write paths.

use std::collections::HashMap;

use labelkit_core::types::DbId;
use sqlx::PgPool;

use crate::models::category::{Category, CategoryOption, CategoryWithOptions};

/// Column list for `categories` queries.
const COLUMNS: &str = "id, name, description, display_order, allows_empty, created_at";

/// Column list for `options` queries.
const OPTION_COLUMNS: &str = "id, category_id, label, is_typical, display_order";

/// Read operations over the category taxonomy.
pub struct CategoryRepo;

impl CategoryRepo {
    /// List all categories in display order.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories ORDER BY display_order, id");
        sqlx::query_as::<_, Category>(&query).fetch_all(pool).await
    }

    /// Find a category by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Category>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
        sqlx::query_as::<_, Category>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Options of one category in display order.
    pub async fn options_for(
        pool: &PgPool,
        category_id: DbId,
    ) -> Result<Vec<CategoryOption>, sqlx::Error> {
        let query = format!(
            "SELECT {OPTION_COLUMNS} FROM options
             WHERE category_id = $1
             ORDER BY display_order, id"
        );
        sqlx::query_as::<_, CategoryOption>(&query)
            .bind(category_id)
            .fetch_all(pool)
            .await
    }

    /// Options of several categories at once, in display order.
    pub async fn options_for_categories(
        pool: &PgPool,
        category_ids: &[DbId],
    ) -> Result<Vec<CategoryOption>, sqlx::Error> {
        let query = format!(
            "SELECT {OPTION_COLUMNS} FROM options
             WHERE category_id = ANY($1)
             ORDER BY category_id, display_order, id"
        );
        sqlx::query_as::<_, CategoryOption>(&query)
            .bind(category_ids)
            .fetch_all(pool)
            .await
    }

    /// All categories with their option sets attached.
    pub async fn list_with_options(pool: &PgPool) -> Result<Vec<CategoryWithOptions>, sqlx::Error> {
        let categories = Self::list_all(pool).await?;
        let ids: Vec<DbId> = categories.iter().map(|c| c.id).collect();
        let options = Self::options_for_categories(pool, &ids).await?;
        Ok(Self::attach_options(categories, options))
    }

    /// Categories assigned to one annotator, with options, in display order.
    pub async fn assigned_with_options(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<CategoryWithOptions>, sqlx::Error> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT c.id, c.name, c.description, c.display_order, c.allows_empty, c.created_at
             FROM categories c
             JOIN annotator_categories ac ON ac.category_id = c.id
             WHERE ac.user_id = $1
             ORDER BY c.display_order, c.id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        let ids: Vec<DbId> = categories.iter().map(|c| c.id).collect();
        let options = Self::options_for_categories(pool, &ids).await?;
        Ok(Self::attach_options(categories, options))
    }

    /// Categories assigned to one annotator, without options, in display order.
    pub async fn assigned_categories(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT c.id, c.name, c.description, c.display_order, c.allows_empty, c.created_at
             FROM categories c
             JOIN annotator_categories ac ON ac.category_id = c.id
             WHERE ac.user_id = $1
             ORDER BY c.display_order, c.id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Whether the annotator is assigned to the category.
    pub async fn has_assignment(
        pool: &PgPool,
        user_id: DbId,
        category_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM annotator_categories
                WHERE user_id = $1 AND category_id = $2
             )",
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_one(pool)
        .await
    }

    fn attach_options(
        categories: Vec<Category>,
        options: Vec<CategoryOption>,
    ) -> Vec<CategoryWithOptions> {
        let mut by_category: HashMap<DbId, Vec<CategoryOption>> = HashMap::new();
        for option in options {
            by_category.entry(option.category_id).or_default().push(option);
        }
        categories
            .into_iter()
            .map(|c| {
                let opts = by_category.remove(&c.id).unwrap_or_default();
                CategoryWithOptions::new(c, opts)
            })
            .collect()
    }
}
