//! Scope vocabulary and the per-operation scope check.

use std::fmt;

use super::token::{TokenError, check_expiry, decode_unverified, extract_scopes};
use crate::config::AuthorizationPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    WorkspaceRead,
    WorkspaceWrite,
    EnvironmentRead,
    EnvironmentWrite,
    OrganizationRead,
    OrganizationWrite,
}

impl Scope {
    pub const ALL: [Scope; 6] = [
        Scope::WorkspaceRead,
        Scope::WorkspaceWrite,
        Scope::EnvironmentRead,
        Scope::EnvironmentWrite,
        Scope::OrganizationRead,
        Scope::OrganizationWrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::WorkspaceRead => "workspace:read",
            Scope::WorkspaceWrite => "workspace:write",
            Scope::EnvironmentRead => "env:read",
            Scope::EnvironmentWrite => "env:write",
            Scope::OrganizationRead => "org:read",
            Scope::OrganizationWrite => "org:write",
        }
    }

    pub fn all_strings() -> Vec<String> {
        Self::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set containment with exact string match.
pub fn scopes_satisfy(granted: &[String], required: &[Scope]) -> bool {
    required
        .iter()
        .all(|scope| granted.iter().any(|g| g == scope.as_str()))
}

/// Checks a raw token's scope claim against a required set.
///
/// The token is decoded again here rather than trusting a previously verified
/// identity, and `exp` is re-checked.
#[derive(Debug, Clone)]
pub struct ScopeAuthorizer {
    policy: AuthorizationPolicy,
    leeway_seconds: u64,
}

impl ScopeAuthorizer {
    pub fn new(policy: AuthorizationPolicy, leeway_seconds: u64) -> Self {
        if policy == AuthorizationPolicy::AlwaysAllow {
            tracing::warn!(
                "AUTHORIZATION_POLICY=always-allow: scope checks are disabled for every operation"
            );
        }
        Self {
            policy,
            leeway_seconds,
        }
    }

    /// `Ok(false)` when the token has no scope claim.
    pub fn has_scopes(&self, token: &str, required: &[Scope]) -> Result<bool, TokenError> {
        if self.policy == AuthorizationPolicy::AlwaysAllow {
            tracing::warn!(?required, "scope check bypassed");
            return Ok(true);
        }

        let unverified = decode_unverified(token)?;
        check_expiry(&unverified.claims, self.leeway_seconds)?;
        Ok(extract_scopes(&unverified.claims)
            .map(|granted| scopes_satisfy(&granted, required))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use chrono::Utc;
    use serde_json::{Value, json};

    fn unsigned(payload: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"k"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        format!("{header}.{payload}.c2ln")
    }

    fn enforced() -> ScopeAuthorizer {
        ScopeAuthorizer::new(AuthorizationPolicy::Enforced, 0)
    }

    #[test]
    fn subset_is_required() {
        let token = unsigned(json!({"scope": "env:read org:read"}));
        let authz = enforced();
        assert!(authz.has_scopes(&token, &[Scope::EnvironmentRead]).unwrap());
        assert!(
            authz
                .has_scopes(&token, &[Scope::EnvironmentRead, Scope::OrganizationRead])
                .unwrap()
        );
        assert!(
            !authz
                .has_scopes(&token, &[Scope::EnvironmentRead, Scope::OrganizationWrite])
                .unwrap()
        );
        assert!(authz.has_scopes(&token, &[]).unwrap());
    }

    #[test]
    fn missing_scope_claim_is_false_not_error() {
        let token = unsigned(json!({"sub": "u"}));
        assert_eq!(enforced().has_scopes(&token, &[Scope::EnvironmentRead]), Ok(false));
    }

    #[test]
    fn no_prefix_or_hierarchy_matching() {
        let token = unsigned(json!({"scopes": ["env:write", "env"]}));
        assert_eq!(enforced().has_scopes(&token, &[Scope::EnvironmentRead]), Ok(false));
    }

    #[test]
    fn expired_token_is_an_error() {
        let token = unsigned(json!({"scope": "env:read", "exp": Utc::now().timestamp() - 10}));
        assert_eq!(
            enforced().has_scopes(&token, &[Scope::EnvironmentRead]),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn malformed_token_is_an_error() {
        assert_eq!(
            enforced().has_scopes("not-a-jwt", &[Scope::EnvironmentRead]),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn always_allow_grants_everything() {
        let authz = ScopeAuthorizer::new(AuthorizationPolicy::AlwaysAllow, 0);
        assert_eq!(authz.has_scopes("not-a-jwt", &Scope::ALL), Ok(true));
    }

    #[test]
    fn scope_strings() {
        assert_eq!(Scope::OrganizationWrite.to_string(), "org:write");
        assert_eq!(Scope::all_strings().len(), 6);
    }
}
