use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelf_db::SortDirection;
use shelf_http::{AppResult, FieldErrors, Validate};

use crate::utils::isbn;

pub const MAX_TITLE_LEN: usize = 500;
pub const MAX_REVIEW_LEN: usize = 5000;
pub const MAX_YEAR: i32 = 9999;
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Canonical catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    /// Normalized: digits only, plus a trailing `X` for ISBN-10
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub page_count: Option<i32>,
    pub description: Option<String>,
    pub cover_image_url: Option<String>,
    pub category: Option<String>,
    pub average_rating: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Payload for adding a book to the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl NewBook {
    /// Trim text fields, drop blanks and normalize the ISBN.
    /// Call after [`Validate::validate`].
    pub fn normalized(mut self) -> Self {
        fn tidy(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        self.title = self.title.trim().to_string();
        self.author = self.author.trim().to_string();
        self.isbn = tidy(self.isbn).and_then(|raw| isbn::normalize(&raw));
        self.publisher = tidy(self.publisher);
        self.description = tidy(self.description);
        self.cover_image_url = tidy(self.cover_image_url);
        self.category = tidy(self.category);
        self
    }
}

impl Validate for NewBook {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        errors.check(
            !title.is_empty() && title.chars().count() <= MAX_TITLE_LEN,
            "title",
            format!("must be 1-{MAX_TITLE_LEN} characters"),
        );
        let author = self.author.trim();
        errors.check(
            !author.is_empty() && author.chars().count() <= MAX_TITLE_LEN,
            "author",
            format!("must be 1-{MAX_TITLE_LEN} characters"),
        );
        if let Some(raw) = self.isbn.as_deref().filter(|raw| !raw.trim().is_empty()) {
            errors.check(
                isbn::is_valid(raw),
                "isbn",
                "must be a valid ISBN-10 or ISBN-13",
            );
        }
        if let Some(year) = self.publication_year {
            errors.check(
                (0..=MAX_YEAR).contains(&year),
                "publicationYear",
                format!("must be between 0 and {MAX_YEAR}"),
            );
        }
        if let Some(pages) = self.page_count {
            errors.check(pages >= 1, "pageCount", "must be at least 1");
        }

        errors.into_result("invalid book")
    }
}

/// A provider result normalized to the catalog's shape, tagged with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBook {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Provider tag, e.g. `OPEN_LIBRARY`
    pub source: String,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl ExternalBook {
    /// Convert to a catalog payload. Provider data is often sloppy, so an ISBN
    /// that fails its checksum and out-of-range numbers are dropped instead
    /// of rejecting the import.
    pub fn into_new_book(self) -> NewBook {
        NewBook {
            title: self.title,
            author: self
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            isbn: self.isbn.filter(|raw| isbn::is_valid(raw)),
            publisher: self.publisher,
            publication_year: self
                .publication_year
                .filter(|y| (0..=MAX_YEAR).contains(y)),
            page_count: self.page_count.filter(|p| *p >= 1),
            description: self.description,
            cover_image_url: self.cover_image_url,
            category: self.category,
        }
    }
}

impl Validate for ExternalBook {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        let title = self.title.trim();
        errors.check(
            !title.is_empty() && title.chars().count() <= MAX_TITLE_LEN,
            "title",
            format!("must be 1-{MAX_TITLE_LEN} characters"),
        );
        errors.check(!self.source.trim().is_empty(), "source", "is required");
        errors.into_result("invalid external book")
    }
}

/// Columns the catalog can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BookSortField {
    #[default]
    Title,
    Author,
    PublicationYear,
    AverageRating,
    RatingCount,
    CreatedAt,
}

impl BookSortField {
    pub fn column(self) -> &'static str {
        match self {
            BookSortField::Title => "title COLLATE NOCASE",
            BookSortField::Author => "author COLLATE NOCASE",
            BookSortField::PublicationYear => "publication_year",
            BookSortField::AverageRating => "average_rating",
            BookSortField::RatingCount => "rating_count",
            BookSortField::CreatedAt => "created_at",
        }
    }
}

/// Filters for a catalog query. All present filters must match.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    /// Substring of title or author, or an exact ISBN
    pub text: Option<String>,
    pub category: Option<String>,
    pub min_rating: Option<f64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub sort: BookSortField,
    pub direction: SortDirection,
}

/// One user's rating and optional review of a book.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub rating: i32,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    pub rating: i32,
    #[serde(default)]
    pub review: Option<String>,
}

impl Validate for RatingInput {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors.check(
            (1..=5).contains(&self.rating),
            "rating",
            "must be between 1 and 5",
        );
        if let Some(review) = &self.review {
            errors.check(
                review.chars().count() <= MAX_REVIEW_LEN,
                "review",
                format!("must be at most {MAX_REVIEW_LEN} characters"),
            );
        }
        errors.into_result("invalid rating")
    }
}

/// A book's aggregate after a rating change, with the caller's own rating.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub book_id: i64,
    pub rating: Option<Rating>,
    pub average_rating: f64,
    pub rating_count: i64,
}
