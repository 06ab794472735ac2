//! Offset pagination shared by every listing endpoint.

use serde::{Deserialize, Serialize};

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A zero-based page index and a page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Build from optional query values, falling back to page 0 and
    /// `default_size`. Range checks belong to the caller's validation.
    pub fn from_query(page: Option<u32>, size: Option<u32>, default_size: u32) -> Self {
        Self {
            page: page.unwrap_or(0),
            size: size.unwrap_or(default_size),
        }
    }

    /// Whether a caller supplied page size is acceptable; absent is fine.
    pub fn size_in_range(size: Option<u32>) -> bool {
        size.is_none_or(|size| (1..=MAX_PAGE_SIZE).contains(&size))
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }
}

/// One page of results plus the totals needed to render pagination controls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let total_pages = if request.size == 0 {
            0
        } else {
            total_elements.div_ceil(u64::from(request.size))
        };

        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0,
            last: u64::from(request.page) + 1 >= total_pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(vec![1, 2, 3], PageRequest::new(0, 3), 7);
        assert_eq!(page.total_pages, 3);
        assert!(page.first);
        assert!(!page.last);
    }

    #[test]
    fn last_page_is_flagged() {
        let page = Page::new(vec![7], PageRequest::new(2, 3), 7);
        assert!(page.last);
        assert!(!page.first);
    }

    #[test]
    fn empty_result_is_first_and_last() {
        let page: Page<i32> = Page::new(vec![], PageRequest::new(0, 20), 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.first && page.last);
    }

    #[test]
    fn offset_multiplies_page_and_size() {
        assert_eq!(PageRequest::new(3, 25).offset(), 75);
        assert_eq!(PageRequest::new(3, 25).limit(), 25);
    }

    #[test]
    fn query_values_fall_back_to_defaults() {
        assert_eq!(PageRequest::from_query(None, None, 20), PageRequest::new(0, 20));
        assert_eq!(PageRequest::from_query(Some(2), Some(5), 20), PageRequest::new(2, 5));
        assert!(PageRequest::size_in_range(None));
        assert!(!PageRequest::size_in_range(Some(0)));
        assert!(!PageRequest::size_in_range(Some(MAX_PAGE_SIZE + 1)));
    }

    #[test]
    fn page_serializes_camel_case() {
        let page = Page::new(vec!["a"], PageRequest::new(0, 10), 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["totalElements"], 1);
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["content"][0], "a");
    }

    #[test]
    fn direction_accepts_upper_case_alias() {
        let dir: SortDirection = serde_json::from_str("\"DESC\"").unwrap();
        assert_eq!(dir, SortDirection::Desc);
        assert_eq!(dir.as_sql(), "DESC");
    }
}
