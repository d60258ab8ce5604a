//! Bearer access-token verification → `VerifiedIdentity` in request extensions.
//!
//! Every failure collapses to the same 401 with the `WWW-Authenticate`
//! challenge. The concrete `TokenError` is only logged, next to a token
//! fingerprint.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::token::fingerprint;
use crate::state::AppState;

/// Put token verification in front of every route of `router`.
///
/// ```ignore
/// let mcp = Router::new().route("/mcp", post(post_mcp));
/// let mcp = middleware::auth::access::apply(mcp, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(req: &Request<Body>) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(&req) else {
        tracing::debug!(path = %req.uri().path(), "missing bearer token");
        return Err(AppError::unauthorized(state.challenge()));
    };

    let identity = match state.verifier.verify(token).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(
                error = ?err,
                token = %fingerprint(token),
                "access token verification failed"
            );
            return Err(AppError::unauthorized(state.challenge()));
        }
    };

    tracing::debug!(subject = %identity.subject, "access token verified");

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
