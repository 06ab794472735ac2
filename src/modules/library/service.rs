use chrono::Utc;
use shelf_db::{Page, PageRequest};
use shelf_http::{AppError, AppResult};

use super::models::{
    AddEntry, LibraryEntry, LibraryListParams, LibraryQuery, LibraryStats, ReadingStatus,
    UpdateEntry,
};
use super::repository::{EntryChanges, LibraryRepository};
use crate::modules::books::models::RatingInput;
use crate::modules::books::BookService;
use crate::utils::clean_query;

const DEFAULT_LIBRARY_PAGE_SIZE: u32 = 20;

/// A user's personal library on top of the shared catalog.
#[derive(Clone)]
pub struct LibraryService {
    entries: LibraryRepository,
    books: BookService,
}

impl LibraryService {
    pub fn new(entries: LibraryRepository, books: BookService) -> Self {
        Self { entries, books }
    }

    pub async fn get(&self, user_id: i64, book_id: i64) -> AppResult<LibraryEntry> {
        self.entries
            .find(user_id, book_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("book {book_id} is not in your library")))
    }

    /// Add a catalog book to the user's library. A second add is a conflict.
    pub async fn add(&self, user_id: i64, book_id: i64, add: AddEntry) -> AppResult<LibraryEntry> {
        let book = self.books.get(book_id).await?;

        if self.entries.find(user_id, book_id).await?.is_some() {
            return Err(AppError::conflict(
                vec![serde_json::json!({ "field": "bookId", "error": "already in library" })],
                format!("book {book_id} is already in your library"),
            ));
        }

        let mut changes = EntryChanges {
            status: ReadingStatus::Unread,
            current_page: None,
            notes: tidy(add.notes),
            location: tidy(add.location),
            date_started: None,
            date_completed: None,
        };
        apply_status(&mut changes, add.status.unwrap_or_default(), book.page_count);

        self.entries.insert(user_id, book_id, &changes).await?;
        tracing::info!(user_id, book_id, status = ?changes.status, "book added to library");
        self.get(user_id, book_id).await
    }

    pub async fn update(
        &self,
        user_id: i64,
        book_id: i64,
        update: UpdateEntry,
    ) -> AppResult<LibraryEntry> {
        let entry = self.get(user_id, book_id).await?;
        let page_count = entry.book.page_count;

        if let (Some(page), Some(pages)) = (update.current_page, page_count) {
            if page > pages {
                return Err(AppError::validation(
                    vec![serde_json::json!({
                        "field": "currentPage",
                        "error": format!("must not exceed the book's {pages} pages"),
                    })],
                    "invalid library update",
                ));
            }
        }

        let mut changes = EntryChanges {
            status: entry.status,
            current_page: update.current_page.or(entry.current_page),
            notes: match update.notes {
                Some(notes) => tidy(Some(notes)),
                None => entry.notes,
            },
            location: match update.location {
                Some(location) => tidy(Some(location)),
                None => entry.location,
            },
            date_started: entry.date_started,
            date_completed: entry.date_completed,
        };
        if let Some(status) = update.status.filter(|s| *s != entry.status) {
            apply_status(&mut changes, status, page_count);
        }

        // A rejected rating must leave the entry untouched
        if let Some(rating) = update.user_rating {
            // Keep any review the user already wrote
            let review = self
                .books
                .user_rating(user_id, book_id)
                .await?
                .and_then(|existing| existing.review);
            self.books
                .rate(user_id, book_id, RatingInput { rating, review })
                .await?;
        }

        self.entries.update(entry.id, &changes).await?;

        tracing::info!(user_id, book_id, status = ?changes.status, "library entry updated");
        self.get(user_id, book_id).await
    }

    pub async fn remove(&self, user_id: i64, book_id: i64) -> AppResult<()> {
        if !self.entries.delete(user_id, book_id).await? {
            return Err(AppError::not_found(format!(
                "book {book_id} is not in your library"
            )));
        }
        tracing::info!(user_id, book_id, "book removed from library");
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: i64,
        params: LibraryListParams,
    ) -> AppResult<Page<LibraryEntry>> {
        let sort = params.sort.unwrap_or_default();
        let query = LibraryQuery {
            status: params.status,
            text: clean_query(params.q.as_deref()),
            sort,
            direction: params.direction.unwrap_or_else(|| sort.default_direction()),
        };
        let page = PageRequest::from_query(params.page, params.size, DEFAULT_LIBRARY_PAGE_SIZE);

        let (entries, total) = self.entries.list(user_id, &query, page).await?;
        Ok(Page::new(entries, page, total))
    }

    pub async fn stats(&self, user_id: i64) -> AppResult<LibraryStats> {
        Ok(self.entries.stats(user_id).await?)
    }
}

/// Apply the date and page bookkeeping of moving to `status`.
fn apply_status(changes: &mut EntryChanges, status: ReadingStatus, page_count: Option<i32>) {
    let now = Utc::now();
    match status {
        ReadingStatus::Unread => {
            changes.date_started = None;
            changes.date_completed = None;
            changes.current_page = None;
        }
        ReadingStatus::Reading => {
            changes.date_started.get_or_insert(now);
        }
        ReadingStatus::Read => {
            changes.date_started.get_or_insert(now);
            changes.date_completed = Some(now);
            if let Some(pages) = page_count {
                changes.current_page = Some(pages);
            }
        }
        ReadingStatus::Dnf => {}
    }
    changes.status = status;
}

fn tidy(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
