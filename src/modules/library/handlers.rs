use axum::{extract::State, http::StatusCode};
use shelf_authz::CurrentUser;
use shelf_db::Page;
use shelf_http::{ApiPath, ApiResponse, AppResult, ValidJson, ValidQuery};

use super::models::{AddEntry, LibraryEntry, LibraryListParams, LibraryStats, UpdateEntry};
use super::service::LibraryService;

pub async fn list_entries(
    State(library): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    ValidQuery(params): ValidQuery<LibraryListParams>,
) -> AppResult<ApiResponse<Page<LibraryEntry>>> {
    Ok(ApiResponse::ok(library.list(user_id, params).await?))
}

pub async fn stats(
    State(library): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
) -> AppResult<ApiResponse<LibraryStats>> {
    Ok(ApiResponse::ok(library.stats(user_id).await?))
}

pub async fn get_entry(
    State(library): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
) -> AppResult<ApiResponse<LibraryEntry>> {
    Ok(ApiResponse::ok(library.get(user_id, book_id).await?))
}

pub async fn add_entry(
    State(library): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
    body: Option<ValidJson<AddEntry>>,
) -> AppResult<(StatusCode, ApiResponse<LibraryEntry>)> {
    let add = body.map(|ValidJson(add)| add).unwrap_or_default();
    let entry = library.add(user_id, book_id, add).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(entry).with_message("Book added to library"),
    ))
}

pub async fn update_entry(
    State(library): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
    ValidJson(update): ValidJson<UpdateEntry>,
) -> AppResult<ApiResponse<LibraryEntry>> {
    let entry = library.update(user_id, book_id, update).await?;
    Ok(ApiResponse::ok(entry).with_message("Library entry updated"))
}

pub async fn remove_entry(
    State(library): State<LibraryService>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
) -> AppResult<ApiResponse<()>> {
    library.remove(user_id, book_id).await?;
    Ok(ApiResponse::message("Book removed from library"))
}
