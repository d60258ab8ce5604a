use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::services::auth::VerifiedIdentity;
use crate::state::AppState;

/// Hands the identity verified by `middleware::auth::access` to a handler.
/// Without that middleware in front of the route the request is rejected with 401.
pub struct IdentityExtractor(pub VerifiedIdentity);

impl FromRequestParts<AppState> for IdentityExtractor
where
    AppState: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedIdentity>()
            .cloned()
            .map(IdentityExtractor)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
