/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - config, token verifier, scope authorizer, metadata provider,
 *     session store, management API client
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{MetadataProvider, ScopeAuthorizer, TokenVerifier};
use crate::services::management::ManagementApi;
use crate::services::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<TokenVerifier>,
    pub authorizer: Arc<ScopeAuthorizer>,
    pub metadata: Arc<MetadataProvider>,
    pub sessions: Arc<SessionStore>,
    pub management: Arc<dyn ManagementApi>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        verifier: Arc<TokenVerifier>,
        authorizer: Arc<ScopeAuthorizer>,
        metadata: Arc<MetadataProvider>,
        management: Arc<dyn ManagementApi>,
    ) -> Self {
        let sessions = Arc::new(SessionStore::new(config.session_idle_ttl));
        Self {
            config,
            verifier,
            authorizer,
            metadata,
            sessions,
            management,
        }
    }

    /// `WWW-Authenticate` value sent with every 401.
    pub fn challenge(&self) -> String {
        let mut challenge = format!(
            r#"Bearer realm="OAuth", resource_metadata="{}""#,
            self.config.protected_resource_metadata_url()
        );
        if self.config.challenge_authorization_uri {
            challenge.push_str(&format!(
                r#", authorization_uri="{}""#,
                self.config.authorization_server_metadata_url()
            ));
        }
        challenge
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("transport_mode", &self.config.transport_mode)
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
