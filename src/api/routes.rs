/*
 * Responsibility
 * - URL 構造を定義
 * - 公開: /health, /.well-known/... (認証なし)
 * - 保護: /mcp (Bearer 検証を route 単位で適用)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::handlers::{
    health::health,
    mcp::{delete_mcp, post_mcp},
    well_known::{authorization_server_metadata, protected_resource_metadata},
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route(
            "/.well-known/oauth-authorization-server",
            get(authorization_server_metadata),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(protected_resource_metadata),
        );

    let protected = Router::new().route("/mcp", post(post_mcp).delete(delete_mcp));
    let protected = middleware::auth::access::apply(protected, state);

    public.merge(protected)
}
