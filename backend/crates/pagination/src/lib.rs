//! Query filters and paged result envelopes shared by list operations.
//!
//! List operations accept an optional [`QueryFilter`] describing the page to
//! fetch and any creation or update time bounds. Results come back wrapped in
//! a [`QueryFilteredResult`], which echoes the page window alongside the
//! number of rows matching the filter and the number of rows in scope.
//!
//! Offsets are always derived from the page and limit; callers never supply a
//! raw offset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page used when a filter does not name one.
pub const DEFAULT_PAGE: u16 = 1;

/// Page size used when a filter does not name one.
pub const DEFAULT_LIMIT: u8 = 20;

/// Largest page size a filter may request.
pub const MAX_LIMIT: u8 = 250;

/// Pagination and time-window constraints for list operations.
///
/// # Examples
/// ```
/// use pagination::QueryFilter;
///
/// let filter = QueryFilter::default().with_page(3).with_limit(10);
/// assert_eq!(filter.offset(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    /// One-based page number.
    pub page: Option<u16>,
    /// Maximum number of rows returned.
    pub limit: Option<u8>,
    /// Only include rows created strictly before this instant.
    pub created_before: Option<DateTime<Utc>>,
    /// Only include rows created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
    /// Only include rows last updated strictly before this instant.
    pub updated_before: Option<DateTime<Utc>>,
    /// Only include rows last updated strictly after this instant.
    pub updated_after: Option<DateTime<Utc>>,
}

impl QueryFilter {
    /// Return a copy of the filter targeting `page`.
    #[must_use]
    pub const fn with_page(mut self, page: u16) -> Self {
        self.page = Some(page);
        self
    }

    /// Return a copy of the filter with an explicit page size.
    #[must_use]
    pub const fn with_limit(mut self, limit: u8) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Fill in `limit` when the caller left it unset.
    #[must_use]
    pub const fn with_default_limit(mut self, limit: u8) -> Self {
        if self.limit.is_none() {
            self.limit = Some(limit);
        }
        self
    }

    /// The effective one-based page. Zero is treated as the first page.
    #[must_use]
    pub fn page(&self) -> u16 {
        self.page.filter(|page| *page > 0).unwrap_or(DEFAULT_PAGE)
    }

    /// The effective page size, clamped to [`MAX_LIMIT`].
    #[must_use]
    pub fn limit(&self) -> u8 {
        self.limit
            .filter(|limit| *limit > 0)
            .map_or(DEFAULT_LIMIT, |limit| limit.min(MAX_LIMIT))
    }

    /// Number of rows skipped before the current page: `(page - 1) * limit`.
    #[must_use]
    pub fn offset(&self) -> u32 {
        u32::from(self.page().saturating_sub(1)) * u32::from(self.limit())
    }

    /// Whether any time bound is set.
    #[must_use]
    pub const fn has_time_bounds(&self) -> bool {
        self.created_before.is_some()
            || self.created_after.is_some()
            || self.updated_before.is_some()
            || self.updated_after.is_some()
    }
}

/// Page window echoed back with list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// One-based page that was fetched.
    pub page: u16,
    /// Page size that was applied.
    pub limit: u8,
    /// Rows matching the filter's time bounds.
    pub filtered_count: u64,
    /// Rows in scope before time bounds were applied.
    pub total_count: u64,
}

/// A page of rows plus the counts needed to render paging controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilteredResult<T> {
    /// Rows on the requested page.
    pub data: Vec<T>,
    /// Page window and counts.
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl<T> QueryFilteredResult<T> {
    /// Wrap `data` fetched with `filter`.
    #[must_use]
    pub fn new(data: Vec<T>, filter: &QueryFilter, filtered_count: u64, total_count: u64) -> Self {
        Self {
            data,
            pagination: Pagination {
                page: filter.page(),
                limit: filter.limit(),
                filtered_count,
                total_count,
            },
        }
    }

    /// Convert every row while keeping the page window.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> QueryFilteredResult<U> {
        QueryFilteredResult {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit coverage for filter defaults and offsets.

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_filter_reads_first_page_of_twenty() {
        let filter = QueryFilter::default();

        assert_eq!(filter.page(), 1);
        assert_eq!(filter.limit(), 20);
        assert_eq!(filter.offset(), 0);
        assert!(!filter.has_time_bounds());
    }

    #[rstest]
    #[case(1, 20, 0)]
    #[case(2, 20, 20)]
    #[case(5, 50, 200)]
    #[case(0, 10, 0)]
    fn offset_is_derived_from_page_and_limit(
        #[case] page: u16,
        #[case] limit: u8,
        #[case] expected: u32,
    ) {
        let filter = QueryFilter::default().with_page(page).with_limit(limit);

        assert_eq!(filter.offset(), expected);
    }

    #[rstest]
    fn limit_is_clamped() {
        let filter = QueryFilter::default().with_limit(u8::MAX);

        assert_eq!(filter.limit(), MAX_LIMIT);
    }

    #[rstest]
    fn default_limit_only_fills_missing_values() {
        let unset = QueryFilter::default().with_default_limit(50);
        let explicit = QueryFilter::default().with_limit(5).with_default_limit(50);

        assert_eq!(unset.limit(), 50);
        assert_eq!(explicit.limit(), 5);
    }

    #[rstest]
    fn result_echoes_page_window() {
        let filter = QueryFilter::default().with_page(2).with_limit(3);
        let result = QueryFilteredResult::new(vec![1, 2, 3], &filter, 7, 9).map(|n| n * 2);

        assert_eq!(result.data, vec![2, 4, 6]);
        assert_eq!(result.pagination.page, 2);
        assert_eq!(result.pagination.limit, 3);
        assert_eq!(result.pagination.filtered_count, 7);
        assert_eq!(result.pagination.total_count, 9);
    }

    #[rstest]
    fn serialises_with_flattened_pagination() {
        let result = QueryFilteredResult::new(vec!["a"], &QueryFilter::default(), 1, 1);
        let value = serde_json::to_value(&result).unwrap_or_default();

        assert_eq!(value["filteredCount"], 1);
        assert_eq!(value["data"][0], "a");
    }
}
