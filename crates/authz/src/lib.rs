//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user's numeric id in the `x-user-id` header. These extractors only parse
//! that header.

use axum::{extract::FromRequestParts, http::request::Parts};
use shelf_http::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

pub type UserId = i64;

/// An identified caller. Rejects the request with 401 when the header is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

/// An optionally identified caller, for endpoints that personalize but do not
/// require a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeUser(pub Option<UserId>);

fn parse_user_id(parts: &Parts) -> Result<Option<UserId>, AppError> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let id = value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<UserId>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            tracing::debug!(header = USER_ID_HEADER, "malformed user id header");
            AppError::bad_request(format!("{USER_ID_HEADER} must be a positive integer"))
        })?;

    Ok(Some(id))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_user_id(parts)?
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("this endpoint requires an identified user"))
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parse_user_id(parts).map(MaybeUser)
    }
}
