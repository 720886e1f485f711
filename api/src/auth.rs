use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use rota_core::principal::Principal;

use crate::state::AppState;

/// The principal carried by the request, if any.
///
/// The token travels as `Authorization: Bearer <jwt>`. A missing, malformed,
/// expired, or tampered token resolves to `None` rather than rejecting the
/// request; the access gate decides per operation whether absence is fatal.
pub struct CurrentUser(pub Option<Principal>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = bearer_token(&parts.headers).and_then(|token| state.tokens.verify(token));
        Ok(CurrentUser(principal))
    }
}

/// Extract the bearer token from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
