//! Management-API collaborator.
//!
//! Every outbound call forwards the caller's bearer token. Tenant-scoped calls
//! also carry the routing domain of the selected environment in
//! [`TENANT_HEADER`] (empty when no environment applies).

pub mod client;
pub mod ids;
pub mod models;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use client::HttpManagementApi;

pub const TENANT_HEADER: &str = "x-env-domain";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("upstream returned {status}")]
    Status { status: u16, message: Option<String> },
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Message from the upstream error body, if it sent one.
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            UpstreamError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct ManagementRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer_token: String,
    pub tenant_domain: Option<String>,
}

impl std::fmt::Debug for ManagementRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("tenant_domain", &self.tenant_domain)
            .finish()
    }
}

impl ManagementRequest {
    pub fn new(method: Method, path: impl Into<String>, bearer_token: &str) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer_token: bearer_token.to_string(),
            tenant_domain: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn tenant(mut self, domain: &str) -> Self {
        self.tenant_domain = Some(domain.to_string());
        self
    }
}

#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Sends one request. Non-2xx statuses are errors; an empty body is `Value::Null`.
    async fn send(&self, request: ManagementRequest) -> Result<Value, UpstreamError>;
}

/// Send and decode the response into `T`.
pub async fn fetch<T: DeserializeOwned>(
    api: &dyn ManagementApi,
    request: ManagementRequest,
) -> Result<T, UpstreamError> {
    let value = api.send(request).await?;
    serde_json::from_value(value).map_err(|err| UpstreamError::Decode(err.to_string()))
}

/// Look up one environment. Used for tenant resolution.
pub async fn get_environment(
    api: &dyn ManagementApi,
    bearer_token: &str,
    environment_id: &str,
) -> Result<models::Environment, UpstreamError> {
    let request = ManagementRequest::new(
        Method::GET,
        format!("/api/v1/environments/{environment_id}"),
        bearer_token,
    );
    let response: models::EnvironmentResponse = fetch(api, request).await?;
    Ok(response.environment)
}
