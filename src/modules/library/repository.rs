//! SQL access to `library_entries`, joined with `books` and `ratings`.

use chrono::{DateTime, Utc};
use shelf_db::PageRequest;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::models::{LibraryEntry, LibraryQuery, LibraryStats, ReadingStatus};
use crate::utils::escape_like;

const ENTRY_SELECT: &str = "SELECT e.id AS entry_id, e.user_id, e.status, e.current_page, \
     e.notes, e.location, e.date_added, e.date_started, e.date_completed, e.updated_at, \
     r.rating AS user_rating, \
     b.id, b.title, b.author, b.isbn, b.publisher, b.publication_year, b.page_count, \
     b.description, b.cover_image_url, b.category, b.average_rating, b.rating_count, b.created_at \
     FROM library_entries e \
     JOIN books b ON b.id = e.book_id \
     LEFT JOIN ratings r ON r.user_id = e.user_id AND r.book_id = e.book_id";

/// Mutable columns of an entry, written back as a whole.
#[derive(Debug, Clone)]
pub struct EntryChanges {
    pub status: ReadingStatus,
    pub current_page: Option<i32>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_completed: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct LibraryRepository {
    pool: SqlitePool,
}

impl LibraryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, user_id: i64, book_id: i64) -> sqlx::Result<Option<LibraryEntry>> {
        sqlx::query_as(&format!(
            "{ENTRY_SELECT} WHERE e.user_id = ? AND e.book_id = ?"
        ))
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Library statuses of `book_ids` for one user, used to annotate search results.
    pub async fn statuses(
        &self,
        user_id: i64,
        book_ids: &[i64],
    ) -> sqlx::Result<Vec<(i64, ReadingStatus)>> {
        if book_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT book_id, status FROM library_entries WHERE user_id = ",
        );
        query.push_bind(user_id).push(" AND book_id IN (");
        let mut separated = query.separated(", ");
        for id in book_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query
            .build_query_as::<(i64, ReadingStatus)>()
            .fetch_all(&self.pool)
            .await
    }

    pub async fn insert(
        &self,
        user_id: i64,
        book_id: i64,
        changes: &EntryChanges,
    ) -> sqlx::Result<()> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO library_entries \
             (user_id, book_id, status, current_page, notes, location, \
              date_added, date_started, date_completed, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(changes.status)
        .bind(changes.current_page)
        .bind(&changes.notes)
        .bind(&changes.location)
        .bind(now)
        .bind(changes.date_started)
        .bind(changes.date_completed)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update(&self, entry_id: i64, changes: &EntryChanges) -> sqlx::Result<()> {
        sqlx::query(
            "UPDATE library_entries SET status = ?, current_page = ?, notes = ?, location = ?, \
             date_started = ?, date_completed = ?, updated_at = ? WHERE id = ?",
        )
        .bind(changes.status)
        .bind(changes.current_page)
        .bind(&changes.notes)
        .bind(&changes.location)
        .bind(changes.date_started)
        .bind(changes.date_completed)
        .bind(Utc::now())
        .bind(entry_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns whether an entry was removed.
    pub async fn delete(&self, user_id: i64, book_id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("DELETE FROM library_entries WHERE user_id = ? AND book_id = ?")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of a user's library plus the total match count.
    pub async fn list(
        &self,
        user_id: i64,
        query: &LibraryQuery,
        page: PageRequest,
    ) -> sqlx::Result<(Vec<LibraryEntry>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM library_entries e JOIN books b ON b.id = e.book_id",
        );
        push_filters(&mut count, user_id, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let mut select = QueryBuilder::<Sqlite>::new(ENTRY_SELECT);
        push_filters(&mut select, user_id, query);
        select
            .push(" ORDER BY ")
            .push(query.sort.column())
            .push(" ")
            .push(query.direction.as_sql())
            .push(", e.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let entries = select
            .build_query_as::<LibraryEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok((entries, total.max(0) as u64))
    }

    pub async fn stats(&self, user_id: i64) -> sqlx::Result<LibraryStats> {
        let counts: Vec<(ReadingStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM library_entries WHERE user_id = ? GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let pages_read: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_page), 0) FROM library_entries WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let mut stats = LibraryStats {
            pages_read,
            ..LibraryStats::default()
        };
        for (status, count) in counts {
            stats.total_books += count;
            match status {
                ReadingStatus::Unread => stats.unread = count,
                ReadingStatus::Reading => stats.reading = count,
                ReadingStatus::Read => stats.read = count,
                ReadingStatus::Dnf => stats.dnf = count,
            }
        }
        Ok(stats)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, user_id: i64, query: &LibraryQuery) {
    builder.push(" WHERE e.user_id = ").push_bind(user_id);

    if let Some(status) = query.status {
        builder.push(" AND e.status = ").push_bind(status);
    }
    if let Some(text) = &query.text {
        let pattern = format!("%{}%", escape_like(text));
        builder
            .push(" AND (b.title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR b.author LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}
