use serde::{Deserialize, Serialize};
use shelf_db::{Page, PageRequest, SortDirection, MAX_PAGE_SIZE};
use shelf_http::{AppResult, FieldErrors, Validate};

use super::providers::ExternalApiHealthStatus;
use crate::modules::books::models::{Book, BookSortField, CatalogQuery, ExternalBook, Rating, MAX_YEAR};
use crate::modules::library::models::ReadingStatus;
use crate::utils::clean_query;

pub const MAX_QUERY_LEN: usize = 200;
pub const DEFAULT_SUGGESTIONS: u32 = 10;
pub const MAX_SUGGESTIONS: u32 = 20;
/// Shorter queries get no suggestions
pub const MIN_SUGGESTION_CHARS: usize = 2;
pub const DEFAULT_POPULAR: u32 = 10;
pub const MAX_POPULAR: u32 = 50;
pub const MAX_EXTERNAL_LIMIT: u32 = 40;

/// Query string of the local catalog search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_rating: Option<f64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<BookSortField>,
    pub direction: Option<SortDirection>,
}

impl SearchParams {
    fn check(&self, errors: &mut FieldErrors) {
        errors.check(
            PageRequest::size_in_range(self.size),
            "size",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        );
        if let Some(q) = &self.q {
            errors.check(
                q.chars().count() <= MAX_QUERY_LEN,
                "q",
                format!("must be at most {MAX_QUERY_LEN} characters"),
            );
        }
        if let Some(rating) = self.min_rating {
            errors.check(
                (1.0..=5.0).contains(&rating),
                "minRating",
                "must be between 1 and 5",
            );
        }
        for (field, year) in [("yearFrom", self.year_from), ("yearTo", self.year_to)] {
            if let Some(year) = year {
                errors.check(
                    (0..=MAX_YEAR).contains(&year),
                    field,
                    format!("must be between 0 and {MAX_YEAR}"),
                );
            }
        }
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            errors.check(from <= to, "yearFrom", "must not be after yearTo");
        }
    }

    pub fn catalog_query(&self) -> CatalogQuery {
        CatalogQuery {
            text: clean_query(self.q.as_deref()),
            category: clean_query(self.category.as_deref()),
            min_rating: self.min_rating,
            year_from: self.year_from,
            year_to: self.year_to,
            sort: self.sort.unwrap_or_default(),
            direction: self.direction.unwrap_or_default(),
        }
    }

    pub fn page_request(&self, default_size: u32) -> PageRequest {
        PageRequest::from_query(self.page, self.size, default_size)
    }
}

impl Validate for SearchParams {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        self.check(&mut errors);
        errors.into_result("invalid search request")
    }
}

/// Query string of the enhanced search: the local search plus fallback knobs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_rating: Option<f64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<BookSortField>,
    pub direction: Option<SortDirection>,
    pub include_external: Option<bool>,
    pub min_local_results: Option<u32>,
    pub external_limit: Option<u32>,
}

impl EnhancedSearchParams {
    pub fn local(&self) -> SearchParams {
        SearchParams {
            q: self.q.clone(),
            category: self.category.clone(),
            min_rating: self.min_rating,
            year_from: self.year_from,
            year_to: self.year_to,
            page: self.page,
            size: self.size,
            sort: self.sort,
            direction: self.direction,
        }
    }
}

impl Validate for EnhancedSearchParams {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        self.local().check(&mut errors);
        if let Some(limit) = self.external_limit {
            errors.check(
                (1..=MAX_EXTERNAL_LIMIT).contains(&limit),
                "externalLimit",
                format!("must be between 1 and {MAX_EXTERNAL_LIMIT}"),
            );
        }
        if let Some(min) = self.min_local_results {
            errors.check(
                min <= MAX_PAGE_SIZE,
                "minLocalResults",
                format!("must be at most {MAX_PAGE_SIZE}"),
            );
        }
        errors.into_result("invalid search request")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuggestionParams {
    pub q: Option<String>,
    pub limit: Option<u32>,
}

impl Validate for SuggestionParams {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(limit) = self.limit {
            errors.check(
                (1..=MAX_SUGGESTIONS).contains(&limit),
                "limit",
                format!("must be between 1 and {MAX_SUGGESTIONS}"),
            );
        }
        if let Some(q) = &self.q {
            errors.check(
                q.chars().count() <= MAX_QUERY_LEN,
                "q",
                format!("must be at most {MAX_QUERY_LEN} characters"),
            );
        }
        errors.into_result("invalid suggestion request")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PopularParams {
    pub limit: Option<u32>,
}

impl Validate for PopularParams {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(limit) = self.limit {
            errors.check(
                (1..=MAX_POPULAR).contains(&limit),
                "limit",
                format!("must be between 1 and {MAX_POPULAR}"),
            );
        }
        errors.into_result("invalid popular request")
    }
}

/// A catalog book with the caller's own rating and library status, when known.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub user_rating: Option<Rating>,
    pub library_status: Option<ReadingStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedSearchResponse {
    pub local_results: Page<Book>,
    pub external_results: Vec<ExternalBook>,
    pub total_local_results: u64,
    pub total_external_results: usize,
    pub external_search_performed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_api_health: Option<ExternalApiHealthStatus>,
    pub search_time_ms: u64,
    pub query: Option<String>,
}
