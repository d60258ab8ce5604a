/// Factory: build the auth services from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{JwksKeyResolver, MetadataProvider, ScopeAuthorizer, TokenVerifier};

#[derive(Debug, Clone)]
pub struct AuthServices {
    pub metadata: Arc<MetadataProvider>,
    pub verifier: Arc<TokenVerifier>,
    pub authorizer: Arc<ScopeAuthorizer>,
}

pub fn build_auth_services(config: &Config, client: reqwest::Client) -> AuthServices {
    let metadata = Arc::new(MetadataProvider::new(
        client.clone(),
        config.auth_metadata_url.clone(),
    ));

    let resolver = JwksKeyResolver::new(client, metadata.clone(), config.jwks_cache_ttl);

    let verifier = TokenVerifier::new(
        config.auth_issuer.clone(),
        config.auth_audience.clone(),
        config.access_token_leeway_seconds,
        config.algorithm_policy,
        Arc::new(resolver),
    );

    let authorizer = ScopeAuthorizer::new(
        config.authorization_policy,
        config.access_token_leeway_seconds,
    );

    AuthServices {
        metadata,
        verifier: Arc::new(verifier),
        authorizer: Arc::new(authorizer),
    }
}
