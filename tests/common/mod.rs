#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shelf_app::modules::books::models::ExternalBook;
use shelf_app::modules::search::providers::{ExternalLookup, MetadataProvider, ProviderError};
use shelf_app::Application;
use shelf_kernel::settings::Settings;
use tower::ServiceExt;

/// In-process provider returning canned results, or failing when it has none.
pub struct StubProvider {
    name: &'static str,
    books: Option<Vec<ExternalBook>>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn returning(name: &'static str, books: Vec<ExternalBook>) -> Arc<Self> {
        Arc::new(Self {
            name,
            books: Some(books),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            books: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StubProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _query: &str, limit: u32) -> Result<Vec<ExternalBook>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.books {
            Some(books) => Ok(books.iter().take(limit as usize).cloned().collect()),
            None => Err(ProviderError::Timeout(Duration::from_millis(1))),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match self.books {
            Some(_) => Ok(()),
            None => Err(ProviderError::Timeout(Duration::from_millis(1))),
        }
    }
}

pub fn external(title: &str, author: &str, isbn: Option<&str>, source: &str) -> ExternalBook {
    ExternalBook {
        title: title.to_string(),
        author: Some(author.to_string()),
        isbn: isbn.map(str::to_string),
        publisher: None,
        publication_year: None,
        page_count: None,
        description: None,
        cover_image_url: None,
        category: None,
        source: source.to_string(),
        external_id: None,
    }
}

pub struct TestApp {
    pub app: Application,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_providers(Vec::new()).await
    }

    pub async fn with_providers(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        let pool = shelf_db::connect_in_memory().await.unwrap();
        let lookup = ExternalLookup::new(providers, Duration::from_secs(2));
        let app = Application::with_parts(Settings::default(), pool, lookup)
            .await
            .unwrap();
        let router = app.router();
        Self { app, router }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<i64>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(shelf_authz::USER_ID_HEADER, user.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: Option<i64>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, user, None).await
    }

    /// Add a catalog book and return its id.
    pub async fn add_book(&self, title: &str, author: &str, isbn: Option<&str>, pages: Option<i32>) -> i64 {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/books",
                None,
                Some(json!({
                    "title": title,
                    "author": author,
                    "isbn": isbn,
                    "pageCount": pages
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }
}
