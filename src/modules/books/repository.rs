//! SQL access to the `books` and `ratings` tables.

use std::collections::HashSet;

use chrono::Utc;
use shelf_db::PageRequest;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use super::models::{Book, CatalogQuery, NewBook, Rating};
use crate::utils::{escape_like, isbn};

const BOOK_COLUMNS: &str = "id, title, author, isbn, publisher, publication_year, page_count, \
     description, cover_image_url, category, average_rating, rating_count, created_at";

#[derive(Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn count(&self) -> sqlx::Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await
    }

    pub async fn find(&self, id: i64) -> sqlx::Result<Option<Book>> {
        sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_isbn(&self, isbn: &str) -> sqlx::Result<Option<Book>> {
        sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE isbn = ?"))
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert an already validated and normalized book.
    pub async fn insert(&self, book: &NewBook) -> sqlx::Result<Book> {
        sqlx::query_as(&format!(
            "INSERT INTO books (title, author, isbn, publisher, publication_year, page_count, \
             description, cover_image_url, category, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {BOOK_COLUMNS}"
        ))
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(book.page_count)
        .bind(&book.description)
        .bind(&book.cover_image_url)
        .bind(&book.category)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
    }

    /// One page of books matching `query`, plus the total match count.
    pub async fn search(
        &self,
        query: &CatalogQuery,
        page: PageRequest,
    ) -> sqlx::Result<(Vec<Book>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books");
        push_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {BOOK_COLUMNS} FROM books"));
        push_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.sort.column())
            .push(" ")
            .push(query.direction.as_sql())
            .push(", id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok((books, total.max(0) as u64))
    }

    /// Which of `isbns` already belong to a catalog book.
    pub async fn existing_isbns(&self, isbns: &[String]) -> sqlx::Result<HashSet<String>> {
        if isbns.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT isbn FROM books WHERE isbn IN (");
        let mut separated = query.separated(", ");
        for isbn in isbns {
            separated.push_bind(isbn.clone());
        }
        separated.push_unseparated(")");

        let found = query
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        Ok(found.into_iter().collect())
    }

    /// Distinct titles and authors containing `text`, prefix matches first.
    pub async fn suggestions(&self, text: &str, limit: u32) -> sqlx::Result<Vec<String>> {
        let escaped = escape_like(text);
        let prefix = format!("{escaped}%");
        let contains = format!("%{escaped}%");

        sqlx::query_scalar(
            "SELECT value FROM ( \
                 SELECT title AS value FROM books WHERE title LIKE ? ESCAPE '\\' \
                 UNION \
                 SELECT author AS value FROM books WHERE author LIKE ? ESCAPE '\\' \
             ) \
             ORDER BY CASE WHEN value LIKE ? ESCAPE '\\' THEN 0 ELSE 1 END, value COLLATE NOCASE \
             LIMIT ?",
        )
        .bind(contains.clone())
        .bind(contains)
        .bind(prefix)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn popular(&self, limit: u32) -> sqlx::Result<Vec<Book>> {
        sqlx::query_as(&format!(
            "SELECT {BOOK_COLUMNS} FROM books \
             ORDER BY rating_count DESC, average_rating DESC, id ASC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
    }

    pub async fn categories(&self) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT category FROM books \
             WHERE category IS NOT NULL AND category <> '' \
             ORDER BY category COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn find_rating(&self, user_id: i64, book_id: i64) -> sqlx::Result<Option<Rating>> {
        sqlx::query_as(
            "SELECT id, user_id, book_id, rating, review, created_at, updated_at \
             FROM ratings WHERE user_id = ? AND book_id = ?",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Reviews for a book, newest first.
    pub async fn ratings_for_book(
        &self,
        book_id: i64,
        page: PageRequest,
    ) -> sqlx::Result<(Vec<Rating>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE book_id = ?")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;

        let ratings = sqlx::query_as(
            "SELECT id, user_id, book_id, rating, review, created_at, updated_at \
             FROM ratings WHERE book_id = ? \
             ORDER BY updated_at DESC, id DESC LIMIT ? OFFSET ?",
        )
        .bind(book_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((ratings, total.max(0) as u64))
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &CatalogQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(text) = &query.text {
        let pattern = format!("%{}%", escape_like(text));
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR author LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
        if let Some(isbn) = isbn::normalize(text) {
            builder.push(" OR isbn = ").push_bind(isbn);
        }
        builder.push(")");
    }
    if let Some(category) = &query.category {
        builder
            .push(" AND category = ")
            .push_bind(category.clone())
            .push(" COLLATE NOCASE");
    }
    if let Some(min_rating) = query.min_rating {
        builder.push(" AND average_rating >= ").push_bind(min_rating);
    }
    if let Some(year_from) = query.year_from {
        builder.push(" AND publication_year >= ").push_bind(year_from);
    }
    if let Some(year_to) = query.year_to {
        builder.push(" AND publication_year <= ").push_bind(year_to);
    }
}

/// Rating writes run inside the caller's transaction so the aggregate on
/// `books` is always recomputed together with the change.
pub mod ratings {
    use super::*;

    /// Insert or replace the user's rating. Returns the row and whether it was new.
    pub async fn upsert(
        conn: &mut SqliteConnection,
        user_id: i64,
        book_id: i64,
        rating: i32,
        review: Option<&str>,
    ) -> sqlx::Result<(Rating, bool)> {
        let existed: Option<i64> =
            sqlx::query_scalar("SELECT id FROM ratings WHERE user_id = ? AND book_id = ?")
                .bind(user_id)
                .bind(book_id)
                .fetch_optional(&mut *conn)
                .await?;

        let now = Utc::now();
        let row: Rating = sqlx::query_as(
            "INSERT INTO ratings (user_id, book_id, rating, review, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, book_id) DO UPDATE SET \
                 rating = excluded.rating, \
                 review = excluded.review, \
                 updated_at = excluded.updated_at \
             RETURNING id, user_id, book_id, rating, review, created_at, updated_at",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(rating)
        .bind(review)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Ok((row, existed.is_none()))
    }

    /// Returns whether a rating was removed.
    pub async fn delete(
        conn: &mut SqliteConnection,
        user_id: i64,
        book_id: i64,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM ratings WHERE user_id = ? AND book_id = ?")
            .bind(user_id)
            .bind(book_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Recompute `average_rating`/`rating_count` from the ratings table and
    /// return the new values.
    pub async fn refresh_aggregate(
        conn: &mut SqliteConnection,
        book_id: i64,
    ) -> sqlx::Result<(f64, i64)> {
        sqlx::query_as(
            "UPDATE books SET \
                 average_rating = COALESCE((SELECT AVG(rating) FROM ratings WHERE book_id = ?), 0.0), \
                 rating_count = (SELECT COUNT(*) FROM ratings WHERE book_id = ?) \
             WHERE id = ? \
             RETURNING average_rating, rating_count",
        )
        .bind(book_id)
        .bind(book_id)
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await
    }
}
