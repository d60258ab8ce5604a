//! Discovery documents. Both are served without authentication.

use axum::{Json, extract::State};

use crate::error::AppError;
use crate::services::auth::{AuthorizationServerMetadata, ProtectedResourceMetadata, Scope};
use crate::state::AppState;

/// GET /.well-known/oauth-authorization-server
pub async fn authorization_server_metadata(
    State(state): State<AppState>,
) -> Result<Json<AuthorizationServerMetadata>, AppError> {
    let metadata = state.metadata.get().await.map_err(|err| {
        tracing::warn!(
            error = %err,
            url = %state.metadata.url(),
            "authorization server metadata unavailable"
        );
        AppError::BadGateway
    })?;
    Ok(Json(metadata.as_ref().clone()))
}

/// GET /.well-known/oauth-protected-resource
pub async fn protected_resource_metadata(
    State(state): State<AppState>,
) -> Json<ProtectedResourceMetadata> {
    let base = &state.config.public_base_url;
    Json(ProtectedResourceMetadata::new(
        base,
        vec![base.clone()],
        Scope::all_strings(),
    ))
}
