use serde::Serialize;
use shelf_db::{Page, PageRequest};
use shelf_http::{AppError, AppResult, Validate};

use super::models::{Book, ExternalBook, NewBook, Rating, RatingInput, RatingSummary};
use super::repository::{ratings, BookRepository};

/// Outcome of a bulk catalog import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

/// Catalog ingestion and ratings.
#[derive(Clone)]
pub struct BookService {
    books: BookRepository,
}

impl BookService {
    pub fn new(books: BookRepository) -> Self {
        Self { books }
    }

    pub fn repository(&self) -> &BookRepository {
        &self.books
    }

    pub async fn get(&self, id: i64) -> AppResult<Book> {
        self.books
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("book {id} not found")))
    }

    /// Add a validated book to the catalog. Duplicate ISBNs are a conflict.
    pub async fn create(&self, book: NewBook) -> AppResult<Book> {
        let book = book.normalized();

        if let Some(isbn) = &book.isbn {
            if let Some(existing) = self.books.find_by_isbn(isbn).await? {
                return Err(AppError::conflict(
                    vec![serde_json::json!({ "field": "isbn", "existingBookId": existing.id })],
                    format!("a book with ISBN {isbn} already exists"),
                ));
            }
        }

        let created = self.books.insert(&book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "book added to catalog");
        Ok(created)
    }

    /// Add many books, skipping invalid entries and ISBNs already present.
    pub async fn import_catalog(&self, books: Vec<NewBook>) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        for (index, book) in books.into_iter().enumerate() {
            if let Err(err) = book.validate() {
                tracing::warn!(index, title = %book.title, error = %err, "skipping invalid book");
                report.invalid += 1;
                continue;
            }
            match self.create(book).await {
                Ok(_) => report.created += 1,
                Err(AppError::Conflict { .. }) => report.duplicates += 1,
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            created = report.created,
            duplicates = report.duplicates,
            invalid = report.invalid,
            "catalog import finished"
        );
        Ok(report)
    }

    /// Persist a provider result. Returns the catalog book and whether it is new;
    /// an ISBN already in the catalog yields the existing book.
    pub async fn import_external(&self, external: ExternalBook) -> AppResult<(Book, bool)> {
        let source = external.source.clone();
        let book = external.into_new_book();
        book.validate()?;
        let book = book.normalized();

        if let Some(isbn) = &book.isbn {
            if let Some(existing) = self.books.find_by_isbn(isbn).await? {
                tracing::debug!(book_id = existing.id, %source, "external book already in catalog");
                return Ok((existing, false));
            }
        }

        let created = self.books.insert(&book).await?;
        tracing::info!(book_id = created.id, %source, "external book imported");
        Ok((created, true))
    }

    pub async fn user_rating(&self, user_id: i64, book_id: i64) -> AppResult<Option<Rating>> {
        Ok(self.books.find_rating(user_id, book_id).await?)
    }

    pub async fn ratings(&self, book_id: i64, page: PageRequest) -> AppResult<Page<Rating>> {
        self.get(book_id).await?;
        let (ratings, total) = self.books.ratings_for_book(book_id, page).await?;
        Ok(Page::new(ratings, page, total))
    }

    /// Create or replace the user's rating. The flag is true when it was created.
    pub async fn rate(
        &self,
        user_id: i64,
        book_id: i64,
        input: RatingInput,
    ) -> AppResult<(RatingSummary, bool)> {
        input.validate()?;
        self.get(book_id).await?;

        let review = tidy_review(input.review.as_deref());
        let mut tx = self.books.pool().begin().await?;
        let (rating, created) =
            ratings::upsert(&mut tx, user_id, book_id, input.rating, review).await?;
        let (average_rating, rating_count) = ratings::refresh_aggregate(&mut tx, book_id).await?;
        tx.commit().await?;

        tracing::info!(
            user_id,
            book_id,
            rating = rating.rating,
            created,
            average_rating,
            "rating saved"
        );

        Ok((
            RatingSummary {
                book_id,
                rating: Some(rating),
                average_rating,
                rating_count,
            },
            created,
        ))
    }

    /// Change an existing rating; 404 when the user has not rated the book.
    pub async fn update_rating(
        &self,
        user_id: i64,
        book_id: i64,
        input: RatingInput,
    ) -> AppResult<RatingSummary> {
        input.validate()?;
        if self.books.find_rating(user_id, book_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "no rating by this user for book {book_id}"
            )));
        }
        let (summary, _) = self.rate(user_id, book_id, input).await?;
        Ok(summary)
    }

    pub async fn delete_rating(&self, user_id: i64, book_id: i64) -> AppResult<RatingSummary> {
        self.get(book_id).await?;

        let mut tx = self.books.pool().begin().await?;
        if !ratings::delete(&mut tx, user_id, book_id).await? {
            return Err(AppError::not_found(format!(
                "no rating by this user for book {book_id}"
            )));
        }
        let (average_rating, rating_count) = ratings::refresh_aggregate(&mut tx, book_id).await?;
        tx.commit().await?;

        tracing::info!(user_id, book_id, average_rating, "rating removed");

        Ok(RatingSummary {
            book_id,
            rating: None,
            average_rating,
            rating_count,
        })
    }
}

fn tidy_review(review: Option<&str>) -> Option<&str> {
    review.map(str::trim).filter(|r| !r.is_empty())
}
