/*
 * Responsibility
 * - Read settings from environment variables (.env supported)
 * - Validate them once at startup (missing or malformed values abort the boot)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// How a token whose header carries no `alg` is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmPolicy {
    /// Missing `alg` is verified as RS256.
    DefaultRs256,
    /// Missing `alg` is rejected as malformed.
    Strict,
}

/// Whether per-operation scope checks are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationPolicy {
    Enforced,
    /// Inspector/debug mode: every scope check passes.
    AlwaysAllow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// One AuthContext per session, environment selection is remembered.
    Stateful,
    /// One AuthContext per request, tenant identifiers travel as arguments.
    Stateless,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_metadata_url: String,
    pub access_token_leeway_seconds: u64,
    pub jwks_cache_ttl: Duration,
    pub algorithm_policy: AlgorithmPolicy,
    pub authorization_policy: AuthorizationPolicy,
    pub challenge_authorization_uri: bool,

    /// Public base URL of this server, without trailing slash.
    pub public_base_url: String,
    /// Base URL of the management API, without trailing slash.
    pub management_api_base_url: String,
    pub upstream_timeout: Duration,

    pub transport_mode: TransportMode,
    pub session_idle_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let auth_issuer =
            std::env::var("AUTH_ISSUER").map_err(|_| ConfigError::Missing("AUTH_ISSUER"))?;

        let auth_audience =
            std::env::var("AUTH_AUDIENCE").map_err(|_| ConfigError::Missing("AUTH_AUDIENCE"))?;

        let auth_server_id = std::env::var("AUTH_SERVER_ID").unwrap_or_default();

        let auth_metadata_url = match std::env::var("AUTH_METADATA_URL") {
            Ok(url) => url,
            Err(_) => derive_metadata_url(&auth_issuer, &auth_server_id),
        };
        Url::parse(&auth_metadata_url).map_err(|_| ConfigError::Invalid("AUTH_METADATA_URL"))?;

        let access_token_leeway_seconds = parse_or("ACCESS_TOKEN_LEEWAY_SECONDS", 0)?;
        let jwks_cache_ttl = Duration::from_secs(parse_or("JWKS_CACHE_TTL_SECONDS", 300)?);

        let algorithm_policy = match std::env::var("TOKEN_ALGORITHM_POLICY")
            .unwrap_or_else(|_| "default-rs256".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "default-rs256" => AlgorithmPolicy::DefaultRs256,
            "strict" => AlgorithmPolicy::Strict,
            _ => return Err(ConfigError::Invalid("TOKEN_ALGORITHM_POLICY")),
        };

        let authorization_policy = match std::env::var("AUTHORIZATION_POLICY")
            .unwrap_or_else(|_| "enforced".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "enforced" => AuthorizationPolicy::Enforced,
            "always-allow" => AuthorizationPolicy::AlwaysAllow,
            _ => return Err(ConfigError::Invalid("AUTHORIZATION_POLICY")),
        };

        let challenge_authorization_uri = parse_or("CHALLENGE_AUTHORIZATION_URI", false)?;

        let public_base_url = required_url("API_BASE_URL")?;
        let management_api_base_url = required_url("MANAGEMENT_API_BASE_URL")?;
        let upstream_timeout = Duration::from_secs(parse_or("UPSTREAM_TIMEOUT_SECONDS", 15)?);

        let transport_mode = match std::env::var("TRANSPORT_MODE")
            .unwrap_or_else(|_| "stateful".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "stateful" => TransportMode::Stateful,
            "stateless" => TransportMode::Stateless,
            _ => return Err(ConfigError::Invalid("TRANSPORT_MODE")),
        };

        let session_idle_ttl = Duration::from_secs(parse_or("SESSION_IDLE_TTL_SECONDS", 3600)?);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            auth_issuer,
            auth_audience,
            auth_metadata_url,
            access_token_leeway_seconds,
            jwks_cache_ttl,
            algorithm_policy,
            authorization_policy,
            challenge_authorization_uri,
            public_base_url,
            management_api_base_url,
            upstream_timeout,
            transport_mode,
            session_idle_ttl,
        })
    }

    pub fn protected_resource_metadata_url(&self) -> String {
        format!(
            "{}/.well-known/oauth-protected-resource",
            self.public_base_url
        )
    }

    pub fn authorization_server_metadata_url(&self) -> String {
        format!(
            "{}/.well-known/oauth-authorization-server",
            self.public_base_url
        )
    }
}

/// `{issuer}/applications/{server_id}/.well-known/oauth-authorization-server`
pub fn derive_metadata_url(issuer: &str, server_id: &str) -> String {
    format!(
        "{}/applications/{}/.well-known/oauth-authorization-server",
        issuer.trim_end_matches('/'),
        server_id
    )
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

fn required_url(key: &'static str) -> Result<String, ConfigError> {
    let raw = std::env::var(key).map_err(|_| ConfigError::Missing(key))?;
    Url::parse(&raw).map_err(|_| ConfigError::Invalid(key))?;
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_url_is_derived_from_issuer_and_server_id() {
        assert_eq!(
            derive_metadata_url("https://auth.example.com/", "srv_1"),
            "https://auth.example.com/applications/srv_1/.well-known/oauth-authorization-server"
        );
    }

    #[test]
    fn config_error_names_the_key() {
        assert_eq!(
            ConfigError::Missing("AUTH_ISSUER").to_string(),
            "missing configuration: AUTH_ISSUER"
        );
        assert_eq!(
            ConfigError::Invalid("PORT").to_string(),
            "invalid configuration: PORT"
        );
    }
}
