//! Category and option entity models.

use labelkit_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub allows_empty: bool,
    pub created_at: Timestamp,
}

/// A row from the `options` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryOption {
    pub id: DbId,
    pub category_id: DbId,
    pub label: String,
    pub is_typical: bool,
    pub display_order: i32,
}

/// A category with its option set attached, for listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithOptions {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub allows_empty: bool,
    pub options: Vec<CategoryOption>,
}

impl CategoryWithOptions {
    pub fn new(category: Category, options: Vec<CategoryOption>) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            display_order: category.display_order,
            allows_empty: category.allows_empty,
            options,
        }
    }
}
