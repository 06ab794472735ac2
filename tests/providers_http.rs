//! Provider clients against a local stand-in for the remote APIs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use shelf_app::modules::search::providers::{
    ExternalLookup, GoogleBooksProvider, MetadataProvider, OpenLibraryProvider,
};

type Params = Query<HashMap<String, String>>;

async fn open_library_search(Query(params): Params) -> Json<Value> {
    let docs = match (params.get("isbn"), params.get("q")) {
        (Some(isbn), _) => json!([{
            "key": "/works/OL1W",
            "title": format!("Edition {isbn}"),
            "isbn": [isbn]
        }]),
        (None, Some(q)) if q == "dune" => json!([
            {
                "key": "/works/OL893415W",
                "title": "Dune",
                "author_name": ["Frank Herbert"],
                "isbn": ["0441013597", "9780441013593"],
                "first_publish_year": 1965,
                "number_of_pages_median": 896,
                "cover_i": 11481354
            },
            { "key": "/works/OL0W", "title": "  " }
        ]),
        _ => json!([]),
    };
    Json(json!({ "numFound": 2, "docs": docs }))
}

async fn google_volumes(Query(params): Params) -> Json<Value> {
    let authorized = params.get("key").map(String::as_str) == Some("secret");
    let by_isbn = params.get("q").is_some_and(|q| q.starts_with("isbn:"));
    let items = if authorized && by_isbn {
        json!([{
            "id": "B1",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert"],
                "publishedDate": "1990-09-01",
                "industryIdentifiers": [{ "type": "ISBN_13", "identifier": "9780441172719" }],
                "imageLinks": { "smallThumbnail": "http://books.google.com/thumb?id=B1" }
            }
        }])
    } else {
        json!([])
    };
    Json(json!({ "totalItems": 1, "items": items }))
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn stalled() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "docs": [] }))
}

async fn serve() -> String {
    let app = Router::new()
        .route("/search.json", get(open_library_search))
        .route("/volumes", get(google_volumes))
        .route("/broken/volumes", get(broken))
        .route("/slow/search.json", get(stalled));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn open_library_results_are_normalized() {
    let base = serve().await;
    let provider = OpenLibraryProvider::new(reqwest::Client::new(), &format!("{base}/"));

    let books = provider.search("dune", 10).await.unwrap();
    assert_eq!(books.len(), 1);
    let dune = &books[0];
    assert_eq!(dune.title, "Dune");
    assert_eq!(dune.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(dune.isbn.as_deref(), Some("9780441013593"));
    assert_eq!(dune.publication_year, Some(1965));
    assert_eq!(dune.source, "OPEN_LIBRARY");
    assert_eq!(
        dune.cover_image_url.as_deref(),
        Some("https://covers.openlibrary.org/b/id/11481354-M.jpg")
    );

    let by_isbn = provider.search("978-0-441-01359-3", 10).await.unwrap();
    assert_eq!(by_isbn[0].title, "Edition 9780441013593");

    assert!(provider.health_check().await.is_ok());
}

#[tokio::test]
async fn google_books_sends_isbn_queries_and_key() {
    let base = serve().await;
    let client = reqwest::Client::new();

    let keyed = GoogleBooksProvider::new(client.clone(), &base, Some("secret".to_string()));
    let books = keyed.search("9780441172719", 5).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].publication_year, Some(1990));
    assert_eq!(books[0].isbn.as_deref(), Some("9780441172719"));
    assert_eq!(
        books[0].cover_image_url.as_deref(),
        Some("https://books.google.com/thumb?id=B1")
    );

    let anonymous = GoogleBooksProvider::new(client, &base, Some("  ".to_string()));
    assert!(anonymous.search("9780441172719", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_and_stalled_providers_are_reported() {
    let base = serve().await;
    let client = reqwest::Client::new();
    let lookup = ExternalLookup::new(
        vec![
            Arc::new(OpenLibraryProvider::new(client.clone(), &format!("{base}/slow")))
                as Arc<dyn MetadataProvider>,
            Arc::new(GoogleBooksProvider::new(client, &format!("{base}/broken"), None))
                as Arc<dyn MetadataProvider>,
        ],
        Duration::from_millis(200),
    );

    let outcome = lookup.search("dune", 10).await;
    assert!(outcome.books.is_empty());
    assert!(!outcome.health.all_available);

    let open_library = &outcome.health.providers[0];
    assert_eq!(open_library.name, "OPEN_LIBRARY");
    assert!(open_library.error.as_deref().unwrap().contains("timed out"));
    assert!(open_library.response_time_ms < 5000);

    let google = &outcome.health.providers[1];
    assert_eq!(google.name, "GOOGLE_BOOKS");
    assert!(google.error.as_deref().unwrap().contains("500"));

    let health = lookup.health().await;
    assert_eq!(health.is_available("GOOGLE_BOOKS"), Some(false));
    assert_eq!(health.is_available("OPEN_LIBRARY"), Some(false));
}
