pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use shelf_kernel::{InitCtx, Migration, Module};

pub use service::BookService;

/// Catalog ingestion and ratings, mounted at `/api/books`.
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(service: BookService) -> Self {
        Self { service }
    }
}

/// Schema for the `books` and `ratings` tables.
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_books",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    title            TEXT NOT NULL,
                    author           TEXT NOT NULL,
                    isbn             TEXT UNIQUE,
                    publisher        TEXT,
                    publication_year INTEGER,
                    page_count       INTEGER,
                    description      TEXT,
                    cover_image_url  TEXT,
                    category         TEXT,
                    average_rating   REAL NOT NULL DEFAULT 0,
                    rating_count     INTEGER NOT NULL DEFAULT 0,
                    created_at       TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_books_title ON books (title COLLATE NOCASE);
                CREATE INDEX IF NOT EXISTS idx_books_author ON books (author COLLATE NOCASE);
                CREATE INDEX IF NOT EXISTS idx_books_category ON books (category COLLATE NOCASE);
                "#,
        },
        Migration {
            id: "002_ratings",
            up: r#"
                CREATE TABLE IF NOT EXISTS ratings (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id    INTEGER NOT NULL,
                    book_id    INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
                    rating     INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                    review     TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (user_id, book_id)
                );
                CREATE INDEX IF NOT EXISTS idx_ratings_book ON ratings (book_id, updated_at);
                "#,
        },
    ]
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = self.service.repository().count().await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", post(handlers::create_book))
            .route("/import", post(handlers::import_book))
            .route(
                "/{id}/ratings",
                get(handlers::list_ratings)
                    .post(handlers::rate_book)
                    .put(handlers::update_rating)
                    .delete(handlers::delete_rating),
            )
            .with_state(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            serde_json::json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let book_id = serde_json::json!({
            "name": "id", "in": "path", "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let user_id = serde_json::json!({
            "name": "x-user-id", "in": "header", "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let rating_body = serde_json::json!({
            "required": true,
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/RatingInput" }
                }
            }
        });
        let summary = serde_json::json!({
            "description": "Recomputed rating aggregate",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/RatingSummary" }
                }
            }
        });

        Some(serde_json::json!({
            "paths": {
                "/": {
                    "post": {
                        "summary": "Add a book to the catalog",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/NewBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "409": error("A book with this ISBN already exists"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/import": {
                    "post": {
                        "summary": "Import an external search result",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/ExternalBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Book with this ISBN already in catalog" },
                            "201": { "description": "Book imported" },
                            "422": error("Validation error")
                        }
                    }
                },
                "/{id}/ratings": {
                    "get": {
                        "summary": "List a book's ratings and reviews, newest first",
                        "tags": ["Ratings"],
                        "parameters": [
                            book_id.clone(),
                            { "name": "page", "in": "query", "schema": { "type": "integer" } },
                            { "name": "size", "in": "query", "schema": { "type": "integer" } }
                        ],
                        "responses": {
                            "200": { "description": "Page of ratings" },
                            "404": error("Unknown book")
                        }
                    },
                    "post": {
                        "summary": "Rate a book (create or replace)",
                        "tags": ["Ratings"],
                        "parameters": [book_id.clone(), user_id.clone()],
                        "requestBody": rating_body.clone(),
                        "responses": {
                            "200": summary.clone(),
                            "201": summary.clone(),
                            "401": error("Missing user identity"),
                            "404": error("Unknown book"),
                            "422": error("Validation error")
                        }
                    },
                    "put": {
                        "summary": "Update an existing rating",
                        "tags": ["Ratings"],
                        "parameters": [book_id.clone(), user_id.clone()],
                        "requestBody": rating_body,
                        "responses": {
                            "200": summary.clone(),
                            "404": error("Unknown book or no rating"),
                            "422": error("Validation error")
                        }
                    },
                    "delete": {
                        "summary": "Remove the caller's rating",
                        "tags": ["Ratings"],
                        "parameters": [book_id, user_id],
                        "responses": {
                            "200": summary,
                            "404": error("Unknown book or no rating")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "isbn": { "type": "string", "nullable": true },
                            "publisher": { "type": "string", "nullable": true },
                            "publicationYear": { "type": "integer", "nullable": true },
                            "pageCount": { "type": "integer", "nullable": true },
                            "description": { "type": "string", "nullable": true },
                            "coverImageUrl": { "type": "string", "nullable": true },
                            "category": { "type": "string", "nullable": true },
                            "averageRating": { "type": "number" },
                            "ratingCount": { "type": "integer" },
                            "createdAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "averageRating", "ratingCount", "createdAt"]
                    },
                    "NewBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "maxLength": 500 },
                            "author": { "type": "string", "maxLength": 500 },
                            "isbn": { "type": "string", "description": "ISBN-10 or ISBN-13, hyphens allowed" },
                            "publisher": { "type": "string" },
                            "publicationYear": { "type": "integer", "minimum": 0, "maximum": 9999 },
                            "pageCount": { "type": "integer", "minimum": 1 },
                            "description": { "type": "string" },
                            "coverImageUrl": { "type": "string" },
                            "category": { "type": "string" }
                        },
                        "required": ["title", "author"]
                    },
                    "ExternalBook": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "isbn": { "type": "string" },
                            "publisher": { "type": "string" },
                            "publicationYear": { "type": "integer" },
                            "pageCount": { "type": "integer" },
                            "description": { "type": "string" },
                            "coverImageUrl": { "type": "string" },
                            "category": { "type": "string" },
                            "source": { "type": "string", "enum": ["OPEN_LIBRARY", "GOOGLE_BOOKS"] },
                            "externalId": { "type": "string" }
                        },
                        "required": ["title", "source"]
                    },
                    "RatingInput": {
                        "type": "object",
                        "properties": {
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "review": { "type": "string", "maxLength": 5000 }
                        },
                        "required": ["rating"]
                    },
                    "RatingSummary": {
                        "type": "object",
                        "properties": {
                            "bookId": { "type": "integer", "format": "int64" },
                            "rating": { "type": "object", "nullable": true },
                            "averageRating": { "type": "number" },
                            "ratingCount": { "type": "integer" }
                        },
                        "required": ["bookId", "averageRating", "ratingCount"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}
