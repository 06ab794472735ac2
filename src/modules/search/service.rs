use std::time::Instant;

use shelf_db::Page;
use shelf_http::{AppError, AppResult};
use shelf_kernel::settings::SearchSettings;

use super::models::{
    BookDetails, EnhancedSearchParams, EnhancedSearchResponse, SearchParams, SuggestionParams,
    DEFAULT_POPULAR, DEFAULT_SUGGESTIONS, MAX_EXTERNAL_LIMIT, MIN_SUGGESTION_CHARS,
};
use super::providers::{ExternalApiHealthStatus, ExternalLookup};
use crate::modules::books::models::{Book, ExternalBook};
use crate::modules::books::repository::BookRepository;
use crate::modules::library::repository::LibraryRepository;
use crate::utils::{clean_query, isbn};

/// Local catalog queries and the external fallback composed on top of them.
#[derive(Clone)]
pub struct SearchService {
    books: BookRepository,
    library: LibraryRepository,
    lookup: ExternalLookup,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(
        books: BookRepository,
        library: LibraryRepository,
        lookup: ExternalLookup,
        settings: SearchSettings,
    ) -> Self {
        Self {
            books,
            library,
            lookup,
            settings,
        }
    }

    pub fn lookup(&self) -> &ExternalLookup {
        &self.lookup
    }

    /// One page of catalog books matching already validated parameters.
    pub async fn search(&self, params: &SearchParams) -> AppResult<Page<Book>> {
        let query = params.catalog_query();
        let page = params.page_request(self.settings.default_page_size);

        let (books, total) = self.books.search(&query, page).await?;
        tracing::debug!(text = ?query.text, total, page = page.page, "catalog search");
        Ok(Page::new(books, page, total))
    }

    /// Local search, topped up from external providers when the catalog has
    /// fewer than `minLocalResults` matches.
    pub async fn enhanced_search(
        &self,
        params: &EnhancedSearchParams,
    ) -> AppResult<EnhancedSearchResponse> {
        let started = Instant::now();
        let local = self.search(&params.local()).await?;
        let query = clean_query(params.q.as_deref());

        let min_local = params
            .min_local_results
            .unwrap_or(self.settings.min_local_results);
        let wants_external = params.include_external.unwrap_or(true)
            && local.total_elements < u64::from(min_local)
            && !self.lookup.is_empty();

        let mut external_results = Vec::new();
        let mut external_api_health = None;
        if let Some(text) = query.as_deref().filter(|_| wants_external) {
            let limit = params
                .external_limit
                .unwrap_or(self.settings.external_limit)
                .clamp(1, MAX_EXTERNAL_LIMIT);
            let outcome = self.lookup.search(text, limit).await;
            external_results = self.drop_known(outcome.books).await?;
            external_api_health = Some(outcome.health);
        }

        let response = EnhancedSearchResponse {
            total_local_results: local.total_elements,
            total_external_results: external_results.len(),
            external_search_performed: external_api_health.is_some(),
            local_results: local,
            external_results,
            external_api_health,
            search_time_ms: started.elapsed().as_millis() as u64,
            query,
        };

        tracing::info!(
            query = ?response.query,
            local = response.total_local_results,
            external = response.total_external_results,
            external_search_performed = response.external_search_performed,
            search_time_ms = response.search_time_ms,
            "enhanced search"
        );
        Ok(response)
    }

    /// Remove external results whose ISBN already belongs to a catalog book.
    async fn drop_known(&self, books: Vec<ExternalBook>) -> AppResult<Vec<ExternalBook>> {
        let key = |book: &ExternalBook| book.isbn.as_deref().and_then(isbn::normalize);

        let isbns: Vec<String> = books.iter().filter_map(key).collect();
        let known = self.books.existing_isbns(&isbns).await?;

        Ok(books
            .into_iter()
            .filter(|book| key(book).is_none_or(|isbn| !known.contains(&isbn)))
            .collect())
    }

    /// A catalog book, with the caller's rating and library status when identified.
    pub async fn details(&self, book_id: i64, user_id: Option<i64>) -> AppResult<BookDetails> {
        let book = self
            .books
            .find(book_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("book {book_id} not found")))?;

        let (user_rating, library_status) = match user_id {
            Some(user_id) => {
                let rating = self.books.find_rating(user_id, book_id).await?;
                let status = self
                    .library
                    .statuses(user_id, &[book_id])
                    .await?
                    .into_iter()
                    .next()
                    .map(|(_, status)| status);
                (rating, status)
            }
            None => (None, None),
        };

        Ok(BookDetails {
            book,
            user_rating,
            library_status,
        })
    }

    pub async fn suggestions(&self, params: &SuggestionParams) -> AppResult<Vec<String>> {
        let Some(text) = clean_query(params.q.as_deref())
            .filter(|q| q.chars().count() >= MIN_SUGGESTION_CHARS)
        else {
            return Ok(Vec::new());
        };
        let limit = params.limit.unwrap_or(DEFAULT_SUGGESTIONS);
        Ok(self.books.suggestions(&text, limit).await?)
    }

    pub async fn popular(&self, limit: Option<u32>) -> AppResult<Vec<Book>> {
        Ok(self.books.popular(limit.unwrap_or(DEFAULT_POPULAR)).await?)
    }

    pub async fn categories(&self) -> AppResult<Vec<String>> {
        Ok(self.books.categories().await?)
    }

    pub async fn provider_health(&self) -> ExternalApiHealthStatus {
        self.lookup.health().await
    }
}
