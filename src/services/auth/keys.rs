//! Signing-key resolution against the authorization server's JWKS.
//!
//! Keys are cached per `kid` for a bounded TTL. A lookup that misses the cache
//! (unknown or expired `kid`) always re-fetches the key set, so rotated keys
//! become visible on the first token that uses them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::jwk::JwkSet;
use thiserror::Error;

use super::metadata::{MetadataError, MetadataProvider};

#[derive(Debug, Error)]
pub enum KeyResolutionError {
    #[error("metadata unavailable: {0}")]
    Metadata(#[from] MetadataError),
    #[error("jwks request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no key with kid {0}")]
    NotFound(String),
    #[error("unusable jwk: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
}

#[async_trait]
pub trait SigningKeyResolver: Send + Sync {
    async fn resolve(&self, key_id: &str) -> Result<DecodingKey, KeyResolutionError>;
}

#[derive(Clone)]
struct CachedKey {
    key: DecodingKey,
    expires_at: Instant,
}

/// JWKS-backed resolver. The JWKS location comes from the discovery metadata.
pub struct JwksKeyResolver {
    client: reqwest::Client,
    metadata: Arc<MetadataProvider>,
    keys: DashMap<String, CachedKey>,
    ttl: Duration,
}

impl std::fmt::Debug for JwksKeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwksKeyResolver")
            .field("metadata_url", &self.metadata.url())
            .field("cached_keys", &self.keys.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl JwksKeyResolver {
    /// `ttl` of zero disables caching: every resolution fetches the key set.
    pub fn new(client: reqwest::Client, metadata: Arc<MetadataProvider>, ttl: Duration) -> Self {
        Self {
            client,
            metadata,
            keys: DashMap::new(),
            ttl,
        }
    }

    fn cached(&self, key_id: &str) -> Option<DecodingKey> {
        let entry = self.keys.get(key_id)?;
        (entry.expires_at > Instant::now()).then(|| entry.key.clone())
    }

    async fn fetch(&self) -> Result<JwkSet, KeyResolutionError> {
        let jwks_uri = self.metadata.jwks_uri().await?;
        let jwks: JwkSet = self
            .client
            .get(&jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!(%jwks_uri, keys = jwks.keys.len(), "jwks fetched");
        Ok(jwks)
    }
}

#[async_trait]
impl SigningKeyResolver for JwksKeyResolver {
    async fn resolve(&self, key_id: &str) -> Result<DecodingKey, KeyResolutionError> {
        if let Some(key) = self.cached(key_id) {
            return Ok(key);
        }

        let jwks = self.fetch().await?;
        let expires_at = Instant::now() + self.ttl;

        // The fetched set replaces whatever was cached; keys dropped upstream go too.
        self.keys.clear();
        let mut found = None;
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                continue;
            };
            let key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(err) if kid == key_id => return Err(err.into()),
                Err(err) => {
                    tracing::debug!(kid, error = %err, "skipping unusable jwk");
                    continue;
                }
            };
            if kid == key_id {
                found = Some(key.clone());
            }
            if !self.ttl.is_zero() {
                self.keys.insert(kid.to_string(), CachedKey { key, expires_at });
            }
        }

        found.ok_or_else(|| KeyResolutionError::NotFound(key_id.to_string()))
    }
}
