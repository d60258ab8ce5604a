/*
 * Responsibility
 * - AuthContext: verified identity + the environment selected for this connection
 * - The only writer of the selection is `select_environment`
 *
 * States
 *   (no context)          Unauthenticated
 *   environment == None   Authenticated, no environment
 *   environment == Some   Authenticated, environment selected
 */
use thiserror::Error;

use crate::services::auth::VerifiedIdentity;
use crate::services::management::{self, ManagementApi, UpstreamError, ids};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedEnvironment {
    pub id: String,
    /// Routing domain sent in the tenant header.
    pub domain: String,
    pub display_name: Option<String>,
}

impl SelectedEnvironment {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("invalid environment identifier")]
    InvalidIdentifier,
    #[error("environment lookup failed: {0}")]
    Lookup(#[from] UpstreamError),
    #[error("environment has no routing domain")]
    MissingDomain,
}

/// Look up an environment and its routing domain. Nothing is stored.
pub async fn resolve_environment(
    api: &dyn ManagementApi,
    bearer_token: &str,
    environment_id: &str,
) -> Result<SelectedEnvironment, SelectionError> {
    if !ids::is_environment_id(environment_id) {
        return Err(SelectionError::InvalidIdentifier);
    }
    let environment = management::get_environment(api, bearer_token, environment_id).await?;
    let domain = environment
        .domain
        .filter(|d| !d.trim().is_empty())
        .ok_or(SelectionError::MissingDomain)?;
    Ok(SelectedEnvironment {
        id: environment_id.to_string(),
        domain,
        display_name: environment.display_name,
    })
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    identity: VerifiedIdentity,
    environment: Option<SelectedEnvironment>,
}

impl AuthContext {
    pub fn new(identity: VerifiedIdentity) -> Self {
        Self {
            identity,
            environment: None,
        }
    }

    pub fn identity(&self) -> &VerifiedIdentity {
        &self.identity
    }

    /// Raw bearer token, forwarded to the management API.
    pub fn token(&self) -> &str {
        &self.identity.token
    }

    pub fn subject(&self) -> &str {
        &self.identity.subject
    }

    /// Swap in the identity verified for the current request. The selection is kept.
    pub fn refresh_identity(&mut self, identity: VerifiedIdentity) {
        self.identity = identity;
    }

    pub fn selected_environment(&self) -> Option<&SelectedEnvironment> {
        self.environment.as_ref()
    }

    /// Tenant header value: the selected domain, or empty.
    pub fn tenant_domain(&self) -> &str {
        self.environment
            .as_ref()
            .map(|env| env.domain.as_str())
            .unwrap_or("")
    }

    /// Select an environment. The selection changes only after the lookup
    /// succeeded; on any error the previous selection is left as it was.
    pub async fn select_environment(
        &mut self,
        environment_id: &str,
        api: &dyn ManagementApi,
    ) -> Result<&SelectedEnvironment, SelectionError> {
        let selected = resolve_environment(api, self.token(), environment_id).await?;
        tracing::info!(
            subject = %self.identity.subject,
            environment_id = %selected.id,
            "environment selected"
        );
        Ok(self.environment.insert(selected))
    }
}
