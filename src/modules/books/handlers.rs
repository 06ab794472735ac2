use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use shelf_authz::CurrentUser;
use shelf_db::{Page, PageRequest};
use shelf_http::{
    ApiPath, ApiResponse, AppResult, FieldErrors, Validate, ValidJson, ValidQuery,
};

use super::models::{Book, ExternalBook, NewBook, Rating, RatingInput, RatingSummary};
use super::service::BookService;

const DEFAULT_REVIEW_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct ReviewsQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl Validate for ReviewsQuery {
    fn validate(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        errors.check(
            PageRequest::size_in_range(self.size),
            "size",
            format!("must be between 1 and {}", shelf_db::MAX_PAGE_SIZE),
        );
        errors.into_result("invalid paging")
    }
}

pub async fn create_book(
    State(service): State<BookService>,
    ValidJson(book): ValidJson<NewBook>,
) -> AppResult<(StatusCode, ApiResponse<Book>)> {
    let book = service.create(book).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(book).with_message("Book added to catalog"),
    ))
}

pub async fn import_book(
    State(service): State<BookService>,
    ValidJson(external): ValidJson<ExternalBook>,
) -> AppResult<(StatusCode, ApiResponse<Book>)> {
    let (book, created) = service.import_external(external).await?;
    let response = if created {
        (
            StatusCode::CREATED,
            ApiResponse::ok(book).with_message("Book imported"),
        )
    } else {
        (
            StatusCode::OK,
            ApiResponse::ok(book).with_message("Book already in catalog"),
        )
    };
    Ok(response)
}

pub async fn list_ratings(
    State(service): State<BookService>,
    ApiPath(book_id): ApiPath<i64>,
    ValidQuery(query): ValidQuery<ReviewsQuery>,
) -> AppResult<ApiResponse<Page<Rating>>> {
    let page = PageRequest::from_query(query.page, query.size, DEFAULT_REVIEW_PAGE_SIZE);
    Ok(ApiResponse::ok(service.ratings(book_id, page).await?))
}

pub async fn rate_book(
    State(service): State<BookService>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
    ValidJson(input): ValidJson<RatingInput>,
) -> AppResult<(StatusCode, ApiResponse<RatingSummary>)> {
    let (summary, created) = service.rate(user_id, book_id, input).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ApiResponse::ok(summary).with_message("Rating saved")))
}

pub async fn update_rating(
    State(service): State<BookService>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
    ValidJson(input): ValidJson<RatingInput>,
) -> AppResult<ApiResponse<RatingSummary>> {
    let summary = service.update_rating(user_id, book_id, input).await?;
    Ok(ApiResponse::ok(summary).with_message("Rating updated"))
}

pub async fn delete_rating(
    State(service): State<BookService>,
    CurrentUser(user_id): CurrentUser,
    ApiPath(book_id): ApiPath<i64>,
) -> AppResult<ApiResponse<RatingSummary>> {
    let summary = service.delete_rating(user_id, book_id).await?;
    Ok(ApiResponse::ok(summary).with_message("Rating removed"))
}
