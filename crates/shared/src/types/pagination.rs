//! Pagination types for list endpoints.
//!
//! Page parameters arriving from clients are untrusted: they are clamped here,
//! once, so every store sees a sane `(offset, limit)` pair.

use serde::{Deserialize, Serialize};

/// Page size used when the caller asks for less than one row per page.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u64 = 1000;

/// Largest row offset a query may carry. Databases bind offsets as signed
/// 64-bit integers.
pub const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

/// Normalized parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Builds a page request from raw client input.
    ///
    /// - `page < 1` clamps to 1
    /// - `page_size < 1` falls back to [`DEFAULT_PAGE_SIZE`]
    /// - `page_size > MAX_PAGE_SIZE` clamps to [`MAX_PAGE_SIZE`]
    /// - `page` is capped so the offset never exceeds [`MAX_OFFSET`]
    #[must_use]
    pub fn new(page: i64, page_size: i64) -> Self {
        let page_size = match u64::try_from(page_size).unwrap_or(0) {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        };
        let last_page = MAX_OFFSET / page_size + 1;
        let page = u64::try_from(page).unwrap_or(0).clamp(1, last_page);

        Self { page, page_size }
    }

    /// Builds a page request from optional query parameters.
    #[must_use]
    pub fn from_query(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(0))
    }

    /// Calculates the offset for database queries, at most [`MAX_OFFSET`].
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(MAX_OFFSET)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub items: Vec<T>,
    /// Pagination metadata.
    #[serde(flatten)]
    pub meta: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Current page number.
    pub page_number: u64,
    /// Items per page.
    pub page_size: u64,
    /// Total number of items across all pages.
    pub total_count: u64,
    /// Total number of pages (0 when there are no items).
    pub total_pages: u64,
    /// Whether a page precedes this one.
    pub has_previous_page: bool,
    /// Whether a page follows this one.
    pub has_next_page: bool,
}

impl PageMeta {
    /// Computes metadata for a normalized request and a total row count.
    #[must_use]
    pub fn new(request: PageRequest, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(request.page_size.max(1));

        Self {
            page_number: request.page,
            page_size: request.page_size,
            total_count,
            total_pages,
            has_previous_page: request.page > 1,
            has_next_page: request.page < total_pages,
        }
    }
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        Self {
            items,
            meta: PageMeta::new(request, total_count),
        }
    }
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod tests;
