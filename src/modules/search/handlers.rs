use axum::extract::State;
use shelf_authz::MaybeUser;
use shelf_db::Page;
use shelf_http::{ApiPath, ApiResponse, AppResult, ValidQuery};

use super::models::{
    BookDetails, EnhancedSearchParams, EnhancedSearchResponse, PopularParams, SearchParams,
    SuggestionParams,
};
use super::providers::ExternalApiHealthStatus;
use super::service::SearchService;
use crate::modules::books::models::Book;

pub async fn search_books(
    State(search): State<SearchService>,
    ValidQuery(params): ValidQuery<SearchParams>,
) -> AppResult<ApiResponse<Page<Book>>> {
    Ok(ApiResponse::ok(search.search(&params).await?))
}

pub async fn enhanced_search(
    State(search): State<SearchService>,
    ValidQuery(params): ValidQuery<EnhancedSearchParams>,
) -> AppResult<ApiResponse<EnhancedSearchResponse>> {
    Ok(ApiResponse::ok(search.enhanced_search(&params).await?))
}

pub async fn book_details(
    State(search): State<SearchService>,
    MaybeUser(user_id): MaybeUser,
    ApiPath(book_id): ApiPath<i64>,
) -> AppResult<ApiResponse<BookDetails>> {
    Ok(ApiResponse::ok(search.details(book_id, user_id).await?))
}

pub async fn suggestions(
    State(search): State<SearchService>,
    ValidQuery(params): ValidQuery<SuggestionParams>,
) -> AppResult<ApiResponse<Vec<String>>> {
    Ok(ApiResponse::ok(search.suggestions(&params).await?))
}

pub async fn popular(
    State(search): State<SearchService>,
    ValidQuery(params): ValidQuery<PopularParams>,
) -> AppResult<ApiResponse<Vec<Book>>> {
    Ok(ApiResponse::ok(search.popular(params.limit).await?))
}

pub async fn categories(
    State(search): State<SearchService>,
) -> AppResult<ApiResponse<Vec<String>>> {
    Ok(ApiResponse::ok(search.categories().await?))
}

pub async fn provider_health(
    State(search): State<SearchService>,
) -> ApiResponse<ExternalApiHealthStatus> {
    ApiResponse::ok(search.provider_health().await)
}
