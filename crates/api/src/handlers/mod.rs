//! HTTP request handlers, grouped by resource.

pub mod assignments;
pub mod categories;
pub mod edit_requests;
pub mod images;
pub mod notifications;
pub mod review;
pub mod settings;
pub mod tasks;
pub mod users;

use serde::Deserialize;

/// Default page size for paginated listings.
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size for paginated listings.
const MAX_PAGE_SIZE: i64 = 100;

/// Common `?page=&page_size=` query parameters (1-based pages).
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageQuery {
    /// The effective page number (>= 1).
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// The effective page size, clamped to `1..=100`.
    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    /// SQL `LIMIT`/`OFFSET` pair for the effective page.
    pub fn limit_offset(&self) -> (i64, i64) {
        let size = self.page_size();
        (size, (self.page() - 1) * size)
    }
}
