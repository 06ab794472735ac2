mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use shelf_app::modules::search::providers::MetadataProvider;

use common::{external, StubProvider, TestApp};

#[tokio::test]
async fn gatsby_is_topped_up_from_providers() {
    let open_library = StubProvider::returning(
        "OPEN_LIBRARY",
        vec![
            external("The Great Gatsby", "F. Scott Fitzgerald", Some("9780743273565"), "OPEN_LIBRARY"),
            external("Gatsby's Girl", "Caroline Preston", Some("9780618068722"), "OPEN_LIBRARY"),
        ],
    );
    let google = StubProvider::returning(
        "GOOGLE_BOOKS",
        vec![external("Gatsby's Girl", "Caroline Preston", Some("978-0-618-06872-2"), "GOOGLE_BOOKS")],
    );
    let app = TestApp::with_providers(vec![
        open_library.clone() as Arc<dyn MetadataProvider>,
        google.clone() as Arc<dyn MetadataProvider>,
    ])
    .await;
    app.add_book("The Great Gatsby", "F. Scott Fitzgerald", Some("9780743273565"), Some(180))
        .await;

    let (status, body) = app.get("/api/search/books/enhanced?q=Gatsby", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let data = &body["data"];
    assert_eq!(data["totalLocalResults"], 1);
    assert_eq!(data["localResults"]["content"][0]["title"], "The Great Gatsby");
    assert_eq!(data["externalSearchPerformed"], true);
    assert_eq!(data["totalExternalResults"], 1);
    assert_eq!(data["externalResults"][0]["title"], "Gatsby's Girl");
    assert_eq!(data["externalResults"][0]["source"], "OPEN_LIBRARY");
    assert_eq!(data["externalApiHealth"]["allAvailable"], true);
    assert_eq!(data["query"], "Gatsby");
    assert_eq!(open_library.calls(), 1);
    assert_eq!(google.calls(), 1);
}

#[tokio::test]
async fn enough_local_results_skip_providers() {
    let provider = StubProvider::returning("OPEN_LIBRARY", Vec::new());
    let app = TestApp::with_providers(vec![provider.clone() as Arc<dyn MetadataProvider>]).await;
    app.add_book("Dune", "Frank Herbert", None, None).await;
    app.add_book("Dune Messiah", "Frank Herbert", None, None).await;

    let (status, body) = app
        .get("/api/search/books/enhanced?q=dune&minLocalResults=2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["externalSearchPerformed"], false);
    assert!(body["data"].get("externalApiHealth").is_none());
    assert_eq!(body["data"]["externalResults"], json!([]));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn failing_provider_still_answers() {
    let broken = StubProvider::failing("GOOGLE_BOOKS");
    let working = StubProvider::returning(
        "OPEN_LIBRARY",
        vec![external("Neuromancer", "William Gibson", None, "OPEN_LIBRARY")],
    );
    let app = TestApp::with_providers(vec![
        working as Arc<dyn MetadataProvider>,
        broken as Arc<dyn MetadataProvider>,
    ])
    .await;

    let (status, body) = app.get("/api/search/books/enhanced?q=neuromancer", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let data = &body["data"];
    assert_eq!(data["totalLocalResults"], 0);
    assert_eq!(data["externalResults"][0]["title"], "Neuromancer");
    assert_eq!(data["externalApiHealth"]["allAvailable"], false);

    let statuses = data["externalApiHealth"]["providers"].as_array().unwrap();
    let google = statuses
        .iter()
        .find(|p| p["name"] == "GOOGLE_BOOKS")
        .unwrap();
    assert_eq!(google["available"], false);
    assert!(google["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn local_search_pages_and_sorts() {
    let app = TestApp::new().await;
    for title in ["Foundation", "Foundation and Empire", "Second Foundation"] {
        app.add_book(title, "Isaac Asimov", None, None).await;
    }

    let (status, body) = app
        .get("/api/search/books?q=foundation&size=2&page=1&sort=title&direction=desc", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let page = &body["data"];
    assert_eq!(page["totalElements"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["last"], true);
    assert_eq!(page["content"].as_array().unwrap().len(), 1);
    assert_eq!(page["content"][0]["title"], "Foundation");
}

#[tokio::test]
async fn bad_search_parameters() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/search/books?size=0", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/api/search/books?minRating=7", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.get("/api/search/books/enhanced?externalLimit=41", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.get("/api/search/books?sort=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/search/books?page=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_ascii_queries_search_as_text() {
    let app = TestApp::new().await;
    app.add_book("12345678é", "Anonyme", None, None).await;

    let (status, body) = app.get("/api/search/books?q=12345678%C3%A9", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["totalElements"], 1);

    let (status, _) = app
        .get("/api/search/books/enhanced?q=12345678%C3%A9", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn details_are_personalized_for_known_users() {
    let app = TestApp::new().await;
    let id = app.add_book("Emma", "Jane Austen", None, Some(474)).await;

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/library/books/{id}"),
            Some(7),
            Some(json!({ "status": "READING" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/books/{id}/ratings"),
            Some(7),
            Some(json!({ "rating": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get(&format!("/api/search/books/{id}"), Some(7)).await;
    assert_eq!(body["data"]["title"], "Emma");
    assert_eq!(body["data"]["libraryStatus"], "READING");
    assert_eq!(body["data"]["userRating"]["rating"], 4);

    let (_, anonymous) = app.get(&format!("/api/search/books/{id}"), None).await;
    assert_eq!(anonymous["data"]["libraryStatus"], serde_json::Value::Null);

    let (status, _) = app.get("/api/search/books/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn suggestions_popular_and_categories() {
    let app = TestApp::new().await;
    let (status, _) = app
        .request(
            Method::POST,
            "/api/books",
            None,
            Some(json!({ "title": "Persuasion", "author": "Jane Austen", "category": "Fiction" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.add_book("Pride and Prejudice", "Jane Austen", None, None).await;

    let (_, body) = app.get("/api/search/books/suggestions?q=pr", None).await;
    assert_eq!(body["data"], json!(["Pride and Prejudice"]));

    let (_, body) = app.get("/api/search/books/suggestions?q=p", None).await;
    assert_eq!(body["data"], json!([]));

    let (_, body) = app.get("/api/search/books/popular?limit=1", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/search/categories", None).await;
    assert_eq!(body["data"], json!(["Fiction"]));
}

#[tokio::test]
async fn provider_health_endpoint() {
    let app = TestApp::with_providers(vec![
        StubProvider::returning("OPEN_LIBRARY", Vec::new()) as Arc<dyn MetadataProvider>,
        StubProvider::failing("GOOGLE_BOOKS") as Arc<dyn MetadataProvider>,
    ])
    .await;

    let (status, body) = app.get("/api/search/external-apis/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["allAvailable"], false);
    assert_eq!(body["data"]["providers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn openapi_document_lists_module_routes() {
    let app = TestApp::new().await;
    let (status, doc) = app.get("/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);

    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/api/search/books/enhanced",
        "/api/library/books/{book_id}",
        "/api/books/{id}/ratings",
    ] {
        assert!(paths.contains_key(path), "missing {path}");
    }
}
