pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

use async_trait::async_trait;
use axum::{routing::get, Router};
use shelf_kernel::{InitCtx, Migration, Module};

pub use service::LibraryService;

/// Per-user reading list, mounted at `/api/library`.
pub struct LibraryModule {
    service: LibraryService,
}

impl LibraryModule {
    pub fn new(service: LibraryService) -> Self {
        Self { service }
    }
}

pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_library_entries",
        up: r#"
            CREATE TABLE IF NOT EXISTS library_entries (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id        INTEGER NOT NULL,
                book_id        INTEGER NOT NULL REFERENCES books (id) ON DELETE CASCADE,
                status         TEXT NOT NULL DEFAULT 'UNREAD'
                               CHECK (status IN ('UNREAD', 'READING', 'READ', 'DNF')),
                current_page   INTEGER CHECK (current_page >= 0),
                notes          TEXT,
                location       TEXT,
                date_added     TEXT NOT NULL,
                date_started   TEXT,
                date_completed TEXT,
                updated_at     TEXT NOT NULL,
                UNIQUE (user_id, book_id)
            );
            CREATE INDEX IF NOT EXISTS idx_library_user_status ON library_entries (user_id, status);
            "#,
    }]
}

#[async_trait]
impl Module for LibraryModule {
    fn name(&self) -> &'static str {
        "library"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "library module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/books", get(handlers::list_entries))
            .route("/stats", get(handlers::stats))
            .route(
                "/books/{book_id}",
                get(handlers::get_entry)
                    .post(handlers::add_entry)
                    .put(handlers::update_entry)
                    .delete(handlers::remove_entry),
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
        let user_id = serde_json::json!({
            "name": "x-user-id", "in": "header", "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let book_id = serde_json::json!({
            "name": "book_id", "in": "path", "required": true,
            "schema": { "type": "integer", "format": "int64" }
        });
        let entry = serde_json::json!({
            "description": "Library entry",
            "content": {
                "application/json": {
                    "schema": { "$ref": "#/components/schemas/LibraryEntry" }
                }
            }
        });
        let status_schema = serde_json::json!({
            "type": "string",
            "enum": ["UNREAD", "READING", "READ", "DNF"]
        });

        Some(serde_json::json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "List the caller's library",
                        "tags": ["Library"],
                        "parameters": [
                            user_id.clone(),
                            { "name": "status", "in": "query", "schema": status_schema.clone() },
                            { "name": "q", "in": "query", "schema": { "type": "string" } },
                            {
                                "name": "sort", "in": "query",
                                "schema": {
                                    "type": "string",
                                    "enum": ["dateAdded", "title", "author", "userRating", "dateCompleted"]
                                }
                            },
                            { "name": "direction", "in": "query", "schema": { "type": "string", "enum": ["asc", "desc"] } },
                            { "name": "page", "in": "query", "schema": { "type": "integer" } },
                            { "name": "size", "in": "query", "schema": { "type": "integer" } }
                        ],
                        "responses": {
                            "200": { "description": "Page of library entries" },
                            "401": error("Missing user identity"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/stats": {
                    "get": {
                        "summary": "Reading statistics for the caller",
                        "tags": ["Library"],
                        "parameters": [user_id.clone()],
                        "responses": {
                            "200": { "description": "Counts per status and pages read" },
                            "401": error("Missing user identity")
                        }
                    }
                },
                "/books/{book_id}": {
                    "get": {
                        "summary": "Get one library entry",
                        "tags": ["Library"],
                        "parameters": [user_id.clone(), book_id.clone()],
                        "responses": {
                            "200": entry.clone(),
                            "404": error("Book is not in the library")
                        }
                    },
                    "post": {
                        "summary": "Add a catalog book to the library",
                        "tags": ["Library"],
                        "parameters": [user_id.clone(), book_id.clone()],
                        "requestBody": {
                            "required": false,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/AddEntry" }
                                }
                            }
                        },
                        "responses": {
                            "201": entry.clone(),
                            "404": error("Unknown book"),
                            "409": error("Book already in library")
                        }
                    },
                    "put": {
                        "summary": "Update status, progress, notes or rating",
                        "tags": ["Library"],
                        "parameters": [user_id.clone(), book_id.clone()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateEntry" }
                                }
                            }
                        },
                        "responses": {
                            "200": entry,
                            "404": error("Book is not in the library"),
                            "422": error("Validation error")
                        }
                    },
                    "delete": {
                        "summary": "Remove a book from the library",
                        "tags": ["Library"],
                        "parameters": [user_id, book_id],
                        "responses": {
                            "200": { "description": "Removed" },
                            "404": error("Book is not in the library")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "ReadingStatus": status_schema,
                    "LibraryEntry": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "userId": { "type": "integer", "format": "int64" },
                            "status": { "$ref": "#/components/schemas/ReadingStatus" },
                            "currentPage": { "type": "integer", "nullable": true },
                            "notes": { "type": "string", "nullable": true },
                            "location": { "type": "string", "nullable": true },
                            "dateAdded": { "type": "string", "format": "date-time" },
                            "dateStarted": { "type": "string", "format": "date-time", "nullable": true },
                            "dateCompleted": { "type": "string", "format": "date-time", "nullable": true },
                            "updatedAt": { "type": "string", "format": "date-time" },
                            "userRating": { "type": "integer", "nullable": true },
                            "book": { "$ref": "#/components/schemas/Book" }
                        },
                        "required": ["id", "userId", "status", "dateAdded", "updatedAt", "book"]
                    },
                    "AddEntry": {
                        "type": "object",
                        "properties": {
                            "status": { "$ref": "#/components/schemas/ReadingStatus" },
                            "notes": { "type": "string" },
                            "location": { "type": "string" }
                        }
                    },
                    "UpdateEntry": {
                        "type": "object",
                        "properties": {
                            "status": { "$ref": "#/components/schemas/ReadingStatus" },
                            "currentPage": { "type": "integer", "minimum": 0 },
                            "notes": { "type": "string" },
                            "location": { "type": "string" },
                            "userRating": { "type": "integer", "minimum": 1, "maximum": 5 }
                        }
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "library module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "library module stopped");
        Ok(())
    }
}
