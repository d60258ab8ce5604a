use async_trait::async_trait;
use serde_json::Value;

use super::{ManagementApi, ManagementRequest, TENANT_HEADER, UpstreamError};

/// reqwest-backed management API client.
#[derive(Debug, Clone)]
pub struct HttpManagementApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpManagementApi {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ManagementApi for HttpManagementApi {
    async fn send(&self, request: ManagementRequest) -> Result<Value, UpstreamError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .bearer_auth(&request.bearer_token);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(domain) = &request.tenant_domain {
            builder = builder.header(TENANT_HEADER, domain);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| UpstreamError::Network(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| UpstreamError::Network(err.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes).ok().and_then(|body| {
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                status = status.as_u16(),
                "management api returned an error status"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| UpstreamError::Decode(err.to_string()))
    }
}
