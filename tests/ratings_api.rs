mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn ratings_upsert_and_recompute_aggregates() {
    let app = TestApp::new().await;
    let id = app.add_book("Kindred", "Octavia E. Butler", None, None).await;
    let uri = format!("/api/books/{id}/ratings");

    let (status, body) = app
        .request(Method::POST, &uri, Some(1), Some(json!({ "rating": 4, "review": "Gripping" })))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["averageRating"], 4.0);
    assert_eq!(body["data"]["ratingCount"], 1);
    assert_eq!(body["data"]["rating"]["review"], "Gripping");

    let (status, body) = app
        .request(Method::POST, &uri, Some(1), Some(json!({ "rating": 2 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["averageRating"], 2.0);
    assert_eq!(body["data"]["ratingCount"], 1);

    let (status, body) = app
        .request(Method::POST, &uri, Some(2), Some(json!({ "rating": 5 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["averageRating"], 3.5);
    assert_eq!(body["data"]["ratingCount"], 2);

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalElements"], 2);

    let (status, body) = app.request(Method::DELETE, &uri, Some(1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["averageRating"], 5.0);
    assert_eq!(body["data"]["ratingCount"], 1);

    let (status, _) = app.request(Method::DELETE, &uri, Some(1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn updating_requires_an_existing_rating() {
    let app = TestApp::new().await;
    let id = app.add_book("Parable of the Sower", "Octavia E. Butler", None, None).await;
    let uri = format!("/api/books/{id}/ratings");

    let (status, _) = app
        .request(Method::PUT, &uri, Some(3), Some(json!({ "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.request(Method::POST, &uri, Some(3), Some(json!({ "rating": 3 })))
        .await;
    let (status, body) = app
        .request(Method::PUT, &uri, Some(3), Some(json!({ "rating": 4 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["rating"]["rating"], 4);
}

#[tokio::test]
async fn rating_validation_and_identity() {
    let app = TestApp::new().await;
    let id = app.add_book("Dawn", "Octavia E. Butler", None, None).await;
    let uri = format!("/api/books/{id}/ratings");

    let (status, body) = app
        .request(Method::POST, &uri, Some(1), Some(json!({ "rating": 0 })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"][0]["field"], "rating");

    let (status, _) = app
        .request(Method::POST, &uri, None, Some(json!({ "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::POST, "/api/books/999/ratings", Some(1), Some(json!({ "rating": 3 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_creation_and_import() {
    let app = TestApp::new().await;
    app.add_book("Lilith's Brood", "Octavia E. Butler", Some("9780446676106"), None)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/books",
            None,
            Some(json!({ "title": "Copy", "author": "Someone", "isbn": "978-0-446-67610-6" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = app
        .request(Method::POST, "/api/books", None, Some(json!({ "title": "", "author": "" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);

    let long_title = "書".repeat(200);
    let (status, body) = app
        .request(
            Method::POST,
            "/api/books",
            None,
            Some(json!({ "title": long_title, "author": "夏目漱石" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let external = json!({
        "title": "Fledgling",
        "isbn": "9780446696166",
        "publicationYear": 2005,
        "pageCount": 0,
        "source": "OPEN_LIBRARY",
        "externalId": "/works/OL2654029W"
    });
    let (status, body) = app
        .request(Method::POST, "/api/books/import", None, Some(external.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["author"], "Unknown Author");
    assert_eq!(body["data"]["pageCount"], serde_json::Value::Null);
    let imported_id = body["data"]["id"].clone();

    let (status, body) = app
        .request(Method::POST, "/api/books/import", None, Some(external))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], imported_id);
}
