//! Pagination types
//!
//! Listings never fail because of the requested page number: a missing or
//! malformed number selects the first page, while a number below 1 or past
//! the end selects the last one.

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Turn a raw `page` query value into a page that exists for `total` items
    pub fn resolve(raw: Option<&str>, per_page: u32, total: i64) -> Self {
        let per_page = per_page.max(1);
        let last = num_pages(total, per_page);

        let page = match raw.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
            None => 1,
            Some(n) if n < 1 || n > last as i64 => last,
            Some(n) => n as u32,
        };

        Self { page, per_page }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Number of pages needed for `total` items; an empty listing still has one page
pub fn num_pages(total: i64, per_page: u32) -> u32 {
    let per_page = per_page.max(1) as i64;
    let total = total.max(0);
    (((total + per_page - 1) / per_page).max(1)) as u32
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        num_pages(self.total, self.per_page)
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Template-facing view of this page
    pub fn page_obj(&self) -> PageObj<'_, T> {
        let has_next = self.has_next();
        let has_previous = self.has_prev();
        let start_index = if self.items.is_empty() {
            0
        } else {
            (self.page as i64 - 1) * self.per_page as i64 + 1
        };

        PageObj {
            object_list: &self.items,
            number: self.page,
            num_pages: self.total_pages(),
            count: self.total,
            has_next,
            has_previous,
            has_other_pages: has_next || has_previous,
            next_page_number: has_next.then(|| self.page + 1),
            previous_page_number: has_previous.then(|| self.page - 1),
            page_range: (1..=self.total_pages()).collect(),
            start_index,
            end_index: start_index + self.items.len().saturating_sub(1) as i64,
        }
    }
}

/// Serialized as `page_obj` in listing templates
#[derive(Debug, Serialize)]
pub struct PageObj<'a, T> {
    pub object_list: &'a [T],
    pub number: u32,
    pub num_pages: u32,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub has_other_pages: bool,
    pub next_page_number: Option<u32>,
    pub previous_page_number: Option<u32>,
    pub page_range: Vec<u32>,
    pub start_index: i64,
    pub end_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolve_missing_or_garbage_page() {
        assert_eq!(ListParams::resolve(None, 10, 13).page, 1);
        assert_eq!(ListParams::resolve(Some("abc"), 10, 13).page, 1);
        assert_eq!(ListParams::resolve(Some(""), 10, 13).page, 1);
    }

    #[test]
    fn test_resolve_out_of_range_page() {
        assert_eq!(ListParams::resolve(Some("0"), 10, 13).page, 2);
        assert_eq!(ListParams::resolve(Some("-3"), 10, 13).page, 2);
        assert_eq!(ListParams::resolve(Some("0"), 10, 0).page, 1);
        assert_eq!(ListParams::resolve(Some("2"), 10, 13).page, 2);
        assert_eq!(ListParams::resolve(Some("99"), 10, 13).page, 2);
    }

    #[test]
    fn test_resolve_empty_listing() {
        let params = ListParams::resolve(Some("5"), 10, 0);
        assert_eq!(params.page, 1);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_and_limit() {
        let params = ListParams::new(3, 10);
        assert_eq!(params.offset(), 20);
        assert_eq!(params.limit(), 10);
    }

    #[test]
    fn test_page_obj_for_second_of_two_pages() {
        let params = ListParams::new(2, 10);
        let result = PagedResult::new(vec![11, 12, 13], 13, &params);
        let page = result.page_obj();

        assert_eq!(page.number, 2);
        assert_eq!(page.num_pages, 2);
        assert_eq!(page.count, 13);
        assert!(!page.has_next);
        assert!(page.has_previous);
        assert_eq!(page.previous_page_number, Some(1));
        assert_eq!(page.next_page_number, None);
        assert_eq!(page.page_range, vec![1, 2]);
        assert_eq!(page.start_index, 11);
        assert_eq!(page.end_index, 13);
    }

    #[test]
    fn test_page_obj_for_empty_listing() {
        let result: PagedResult<i32> = PagedResult::new(vec![], 0, &ListParams::default());
        let page = result.page_obj();

        assert_eq!(page.num_pages, 1);
        assert!(!page.has_other_pages);
        assert_eq!(page.start_index, 0);
        assert_eq!(page.end_index, 0);
    }

    proptest! {
        #[test]
        fn resolved_page_always_exists(
            raw in proptest::option::of(any::<i64>().prop_map(|n| n.to_string())),
            per_page in 1u32..50,
            total in 0i64..1000,
        ) {
            let params = ListParams::resolve(raw.as_deref(), per_page, total);
            prop_assert!(params.page >= 1);
            prop_assert!(params.page <= num_pages(total, per_page));
        }

        #[test]
        fn first_two_pages_split_items(total in 0i64..500, per_page in 1u32..50) {
            let first = ListParams::resolve(Some("1"), per_page, total);
            let first_len = (total - first.offset()).clamp(0, per_page as i64);
            prop_assert_eq!(first_len, total.min(per_page as i64));

            if total > per_page as i64 {
                let second = ListParams::resolve(Some("2"), per_page, total);
                let second_len = (total - second.offset()).clamp(0, per_page as i64);
                prop_assert_eq!(second_len, (total - per_page as i64).min(per_page as i64));
            }
        }
    }
}
