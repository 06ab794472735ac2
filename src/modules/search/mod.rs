pub mod handlers;
pub mod models;
pub mod providers;
pub mod service;

use async_trait::async_trait;
use axum::{routing::get, Router};
use shelf_kernel::{InitCtx, Module};

pub use service::SearchService;

/// Catalog search with external fallback, mounted at `/api/search`.
pub struct SearchModule {
    service: SearchService,
}

impl SearchModule {
    pub fn new(service: SearchService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Module for SearchModule {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            providers = ?self.service.lookup().provider_names(),
            min_local_results = ctx.settings.search.min_local_results,
            "search module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/books", get(handlers::search_books))
            .route("/books/enhanced", get(handlers::enhanced_search))
            .route("/books/suggestions", get(handlers::suggestions))
            .route("/books/popular", get(handlers::popular))
            .route("/books/{id}", get(handlers::book_details))
            .route("/categories", get(handlers::categories))
            .route("/external-apis/health", get(handlers::provider_health))
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
        let query = |name: &str, schema: serde_json::Value| {
            serde_json::json!({ "name": name, "in": "query", "required": false, "schema": schema })
        };
        let local_params = vec![
            query("q", serde_json::json!({ "type": "string", "maxLength": 200 })),
            query("category", serde_json::json!({ "type": "string" })),
            query("minRating", serde_json::json!({ "type": "number", "minimum": 1, "maximum": 5 })),
            query("yearFrom", serde_json::json!({ "type": "integer" })),
            query("yearTo", serde_json::json!({ "type": "integer" })),
            query("page", serde_json::json!({ "type": "integer", "minimum": 0 })),
            query("size", serde_json::json!({ "type": "integer", "minimum": 1, "maximum": 100 })),
            query(
                "sort",
                serde_json::json!({
                    "type": "string",
                    "enum": ["title", "author", "publicationYear", "averageRating", "ratingCount", "createdAt"]
                }),
            ),
            query("direction", serde_json::json!({ "type": "string", "enum": ["asc", "desc"] })),
        ];
        let mut enhanced_params = local_params.clone();
        enhanced_params.extend([
            query("includeExternal", serde_json::json!({ "type": "boolean", "default": true })),
            query("minLocalResults", serde_json::json!({ "type": "integer", "default": 5 })),
            query("externalLimit", serde_json::json!({ "type": "integer", "minimum": 1, "maximum": 40 })),
        ]);

        Some(serde_json::json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "Search the local catalog",
                        "tags": ["Search"],
                        "parameters": local_params,
                        "responses": {
                            "200": { "description": "Page of catalog books" },
                            "400": error("Malformed query"),
                            "422": error("Validation error")
                        }
                    }
                },
                "/books/enhanced": {
                    "get": {
                        "summary": "Search the catalog, falling back to external providers",
                        "tags": ["Search"],
                        "parameters": enhanced_params,
                        "responses": {
                            "200": {
                                "description": "Local and external results",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/EnhancedSearchResponse" }
                                    }
                                }
                            },
                            "422": error("Validation error")
                        }
                    }
                },
                "/books/suggestions": {
                    "get": {
                        "summary": "Title and author completions",
                        "tags": ["Search"],
                        "parameters": [
                            query("q", serde_json::json!({ "type": "string" })),
                            query("limit", serde_json::json!({ "type": "integer", "minimum": 1, "maximum": 20 }))
                        ],
                        "responses": { "200": { "description": "Suggestions" } }
                    }
                },
                "/books/popular": {
                    "get": {
                        "summary": "Most rated books",
                        "tags": ["Search"],
                        "parameters": [
                            query("limit", serde_json::json!({ "type": "integer", "minimum": 1, "maximum": 50 }))
                        ],
                        "responses": { "200": { "description": "Books" } }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Book details, personalized when x-user-id is sent",
                        "tags": ["Search"],
                        "parameters": [
                            {
                                "name": "id", "in": "path", "required": true,
                                "schema": { "type": "integer", "format": "int64" }
                            },
                            {
                                "name": "x-user-id", "in": "header", "required": false,
                                "schema": { "type": "integer", "format": "int64" }
                            }
                        ],
                        "responses": {
                            "200": { "description": "Book details" },
                            "404": error("Unknown book")
                        }
                    }
                },
                "/categories": {
                    "get": {
                        "summary": "Distinct catalog categories",
                        "tags": ["Search"],
                        "responses": { "200": { "description": "Category names" } }
                    }
                },
                "/external-apis/health": {
                    "get": {
                        "summary": "Probe the external metadata providers",
                        "tags": ["Search"],
                        "responses": {
                            "200": {
                                "description": "Provider reachability",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ExternalApiHealthStatus" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "ExternalApiHealthStatus": {
                        "type": "object",
                        "properties": {
                            "providers": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "name": { "type": "string" },
                                        "available": { "type": "boolean" },
                                        "responseTimeMs": { "type": "integer" },
                                        "error": { "type": "string" }
                                    }
                                }
                            },
                            "allAvailable": { "type": "boolean" },
                            "checkedAt": { "type": "string", "format": "date-time" }
                        }
                    },
                    "EnhancedSearchResponse": {
                        "type": "object",
                        "properties": {
                            "localResults": { "type": "object" },
                            "externalResults": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/ExternalBook" }
                            },
                            "totalLocalResults": { "type": "integer" },
                            "totalExternalResults": { "type": "integer" },
                            "externalSearchPerformed": { "type": "boolean" },
                            "externalApiHealth": { "$ref": "#/components/schemas/ExternalApiHealthStatus" },
                            "searchTimeMs": { "type": "integer" },
                            "query": { "type": "string", "nullable": true }
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "search module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "search module stopped");
        Ok(())
    }
}
