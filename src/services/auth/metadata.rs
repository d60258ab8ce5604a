//! Authorization-server discovery metadata (RFC 8414) and the protected-resource
//! document (RFC 9728) this server publishes about itself.
//!
//! The upstream metadata is fetched once and then served from memory. A failed
//! fetch leaves the cache empty so the next caller tries again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("metadata request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("metadata has no jwks_uri")]
    MissingJwksUri,
}

/// Typed projection of the upstream discovery document.
///
/// Only the fields below are carried; unknown upstream fields are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    #[serde(default)]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modes_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_types_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_signing_alg_values_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_uri_parameter_supported: Option<bool>,
}

/// Protected-resource metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
    pub resource_documentation: String,
    pub scopes_supported: Vec<String>,
}

impl ProtectedResourceMetadata {
    pub fn new(resource: &str, authorization_servers: Vec<String>, scopes: Vec<String>) -> Self {
        let resource = resource.trim_end_matches('/');
        Self {
            resource: resource.to_string(),
            authorization_servers,
            bearer_methods_supported: vec!["header".to_string()],
            resource_documentation: format!("{resource}/docs"),
            scopes_supported: scopes,
        }
    }
}

/// Process-wide holder of the upstream discovery document.
#[derive(Debug)]
pub struct MetadataProvider {
    client: reqwest::Client,
    url: String,
    cached: RwLock<Option<Arc<AuthorizationServerMetadata>>>,
}

impl MetadataProvider {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            cached: RwLock::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cached document, fetched on first use.
    pub async fn get(&self) -> Result<Arc<AuthorizationServerMetadata>, MetadataError> {
        if let Some(metadata) = self.cached.read().await.as_ref() {
            return Ok(metadata.clone());
        }
        self.refresh().await
    }

    /// Fetch the document unconditionally and replace the cached copy.
    pub async fn refresh(&self) -> Result<Arc<AuthorizationServerMetadata>, MetadataError> {
        let metadata: AuthorizationServerMetadata = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let metadata = Arc::new(metadata);
        *self.cached.write().await = Some(metadata.clone());
        tracing::debug!(
            url = %self.url,
            issuer = %metadata.issuer,
            "authorization server metadata loaded"
        );
        Ok(metadata)
    }

    pub async fn jwks_uri(&self) -> Result<String, MetadataError> {
        self.get()
            .await?
            .jwks_uri
            .clone()
            .ok_or(MetadataError::MissingJwksUri)
    }
}
