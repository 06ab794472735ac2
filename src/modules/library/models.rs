use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_db::{PageRequest, SortDirection, MAX_PAGE_SIZE};
use shelf_http::{AppResult, FieldErrors, Validate};

use crate::modules::books::models::Book;

pub const MAX_NOTES_LEN: usize = 5000;
pub const MAX_LOCATION_LEN: usize = 200;
pub const MAX_QUERY_LEN: usize = 200;

/// Where a user is with a book. Serialized in one canonical uppercase form.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadingStatus {
    #[default]
    Unread,
    Reading,
    Read,
    Dnf,
}


/// A user's library entry joined with its catalog book and the user's rating.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    #[sqlx(rename = "entry_id")]
    pub id: i64,
    pub user_id: i64,
    pub status: ReadingStatus,
    pub current_page: Option<i32>,
    pub notes: Option<String>,
    pub location: Option<String>,
    pub date_added: DateTime<Utc>,
    pub date_started: Option<DateTime<Utc>>,
    pub date_completed: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Read from the ratings table, never stored on the entry
    pub user_rating: Option<i32>,
    #[sqlx(flatten)]
    pub book: Book,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEntry {
    #[serde(default)]
    pub status: Option<ReadingStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Validate for AddEntry {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        check_text(&mut errors, &self.notes, &self.location);
        errors.into_result("invalid library entry")
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntry {
    #[serde(default)]
    pub status: Option<ReadingStatus>,
    #[serde(default)]
    pub current_page: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_rating: Option<i32>,
}

impl Validate for UpdateEntry {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(page) = self.current_page {
            errors.check(page >= 0, "currentPage", "must not be negative");
        }
        if let Some(rating) = self.user_rating {
            errors.check(
                (1..=5).contains(&rating),
                "userRating",
                "must be between 1 and 5",
            );
        }
        check_text(&mut errors, &self.notes, &self.location);
        errors.into_result("invalid library update")
    }
}

fn check_text(errors: &mut FieldErrors, notes: &Option<String>, location: &Option<String>) {
    if let Some(notes) = notes {
        errors.check(
            notes.chars().count() <= MAX_NOTES_LEN,
            "notes",
            format!("must be at most {MAX_NOTES_LEN} characters"),
        );
    }
    if let Some(location) = location {
        errors.check(
            location.chars().count() <= MAX_LOCATION_LEN,
            "location",
            format!("must be at most {MAX_LOCATION_LEN} characters"),
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LibrarySortField {
    #[default]
    DateAdded,
    Title,
    Author,
    UserRating,
    DateCompleted,
}

impl LibrarySortField {
    pub fn column(self) -> &'static str {
        match self {
            LibrarySortField::DateAdded => "e.date_added",
            LibrarySortField::Title => "b.title COLLATE NOCASE",
            LibrarySortField::Author => "b.author COLLATE NOCASE",
            LibrarySortField::UserRating => "r.rating",
            LibrarySortField::DateCompleted => "e.date_completed",
        }
    }

    /// Dates and ratings read newest/highest first, names alphabetically.
    pub fn default_direction(self) -> SortDirection {
        match self {
            LibrarySortField::Title | LibrarySortField::Author => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

/// Query string of `GET /library/books`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryListParams {
    pub status: Option<ReadingStatus>,
    pub q: Option<String>,
    pub sort: Option<LibrarySortField>,
    pub direction: Option<SortDirection>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl Validate for LibraryListParams {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
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
        errors.into_result("invalid library query")
    }
}

/// Resolved filters for a library listing.
#[derive(Debug, Clone, Default)]
pub struct LibraryQuery {
    pub status: Option<ReadingStatus>,
    pub text: Option<String>,
    pub sort: LibrarySortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total_books: i64,
    pub unread: i64,
    pub reading: i64,
    pub read: i64,
    pub dnf: i64,
    pub pages_read: i64,
}
