//! Tool dispatch.
//!
//! Every call runs the same pipeline: scope check, tenant resolution,
//! argument validation, management-API call, text rendering. Failures past
//! the scope check become text results; only an unknown tool or a non-object
//! argument list is a protocol error.

pub mod args;
pub mod catalog;
pub mod params;

mod connections;
mod environments;
mod organizations;
mod resources;
mod workspace;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::config::TransportMode;
use crate::services::auth::ScopeAuthorizer;
use crate::services::management::{self, ManagementApi, ManagementRequest, UpstreamError};
use crate::services::session::{
    AuthContext, SelectedEnvironment, SelectionError, resolve_environment,
};
use args::{ArgError, parse};
use catalog::{Operation, Tenancy, ToolDefinition};
use params::EnvironmentTarget;

pub const NOT_SELECTED: &str = "Use `set_environment` first.";
pub const SESSION_TERMINATED: &str = "Your session is terminated, please restart your client";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    /// `tools/call` result body.
    pub fn to_json(&self) -> Value {
        json!({
            "content": [{"type": "text", "text": self.text}],
            "isError": self.is_error,
        })
    }
}

/// Everything a tool call may touch.
pub struct ToolContext<'a> {
    pub session: &'a mut AuthContext,
    pub management: &'a dyn ManagementApi,
    pub authorizer: &'a ScopeAuthorizer,
    pub mode: TransportMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolCallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("tool arguments must be a JSON object")]
    InvalidArguments,
}

/// Failure of one handler, rendered as a text result.
#[derive(Debug)]
enum ToolError {
    /// Caller-correctable; the message is shown as is.
    Rejected(String),
    /// Management API failed; `failure` is shown, `source` is logged.
    Upstream {
        failure: &'static str,
        source: UpstreamError,
    },
}

impl From<ArgError> for ToolError {
    fn from(err: ArgError) -> Self {
        ToolError::Rejected(err.to_string())
    }
}

type Outcome = Result<String, ToolError>;

trait OrFail<T> {
    fn or_fail(self, failure: &'static str) -> Result<T, ToolError>;
}

impl<T> OrFail<T> for Result<T, UpstreamError> {
    fn or_fail(self, failure: &'static str) -> Result<T, ToolError> {
        self.map_err(|source| ToolError::Upstream { failure, source })
    }
}

/// Resolved tenant plus forwarded credentials for one call.
struct Call<'a> {
    api: &'a dyn ManagementApi,
    token: String,
    /// `None`: no tenant header. `Some("")`: header sent empty.
    tenant: Option<String>,
    environment: Option<SelectedEnvironment>,
}

impl Call<'_> {
    fn request(&self, method: Method, path: impl Into<String>) -> ManagementRequest {
        let request = ManagementRequest::new(method, path, &self.token);
        match &self.tenant {
            Some(domain) => request.tenant(domain),
            None => request,
        }
    }

    async fn send(&self, request: ManagementRequest) -> Result<Value, UpstreamError> {
        self.api.send(request).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: ManagementRequest,
    ) -> Result<T, UpstreamError> {
        management::fetch(self.api, request).await
    }

    fn environment(&self) -> Result<&SelectedEnvironment, ToolError> {
        self.environment
            .as_ref()
            .ok_or_else(|| ToolError::Rejected(NOT_SELECTED.to_string()))
    }
}

pub async fn call_tool(
    name: &str,
    arguments: Value,
    cx: ToolContext<'_>,
) -> Result<ToolResult, ToolCallError> {
    let tool = catalog::find(name).ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;
    let arguments = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => return Err(ToolCallError::InvalidArguments),
    };

    match cx.authorizer.has_scopes(cx.session.token(), tool.scopes) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(
                tool = tool.name,
                subject = %cx.session.subject(),
                "insufficient scope"
            );
            return Ok(ToolResult::error(format!(
                "You do not have permission to {}. \
                 Please add the scopes in the client and restart the client.",
                tool.action
            )));
        }
        Err(err) => {
            tracing::warn!(tool = tool.name, error = %err, "scope check rejected token");
            return Ok(ToolResult::error(SESSION_TERMINATED));
        }
    }

    let outcome = run(tool, &arguments, cx).await;
    Ok(finish(tool, outcome))
}

async fn run(tool: &ToolDefinition, args: &Map<String, Value>, cx: ToolContext<'_>) -> Outcome {
    let call = tenant(tool, args, &cx).await?;
    let call = &call;
    match tool.operation {
        Operation::ListEnvironments => environments::list(call).await,
        Operation::GetEnvironmentDetails => environments::details(call, parse(args)?).await,
        Operation::SetEnvironment => environments::set(parse(args)?, cx).await,
        Operation::GetCurrentEnvironment => environments::current(call).await,
        Operation::ListEnvironmentRoles => environments::list_roles(call).await,
        Operation::CreateEnvironmentRole => environments::create_role(call, parse(args)?).await,
        Operation::ListEnvironmentScopes => environments::list_scopes(call).await,
        Operation::CreateEnvironmentScope => environments::create_scope(call, parse(args)?).await,
        Operation::ListWorkspaceMembers => workspace::list_members(call, parse(args)?).await,
        Operation::InviteWorkspaceMember => workspace::invite_member(call, parse(args)?).await,
        Operation::ListOrganizations => organizations::list(call, parse(args)?).await,
        Operation::GetOrganizationDetails => organizations::details(call, parse(args)?).await,
        Operation::CreateOrganization => organizations::create(call, parse(args)?).await,
        Operation::GenerateAdminPortalLink => {
            organizations::portal_link(call, parse(args)?).await
        }
        Operation::CreateOrganizationUser => {
            organizations::create_user(call, parse(args)?).await
        }
        Operation::ListOrganizationUsers => organizations::list_users(call, parse(args)?).await,
        Operation::UpdateOrganizationSettings => {
            organizations::update_settings(call, parse(args)?).await
        }
        Operation::ListEnvironmentConnections => connections::list_environment(call).await,
        Operation::ListOrganizationConnections => {
            connections::list_organization(call, parse(args)?).await
        }
        Operation::CreateEnvironmentOidcConnection => {
            connections::create_oidc(call, parse(args)?).await
        }
        Operation::UpdateEnvironmentOidcConnection => {
            connections::update_oidc(call, parse(args)?).await
        }
        Operation::EnableEnvironmentConnection => connections::enable(call, parse(args)?).await,
        Operation::ListMcpServers => resources::list(call, parse(args)?).await,
        Operation::RegisterMcpServer => resources::register(call, parse(args)?).await,
        Operation::UpdateMcpServer => resources::update(call, parse(args)?).await,
        Operation::SwitchMcpAuthToScalekit => resources::switch_auth(call, parse(args)?).await,
    }
}

/// Resolve the tenant a call runs against. Nothing is sent upstream when the
/// stateful selection is missing.
async fn tenant<'a>(
    tool: &ToolDefinition,
    args: &Map<String, Value>,
    cx: &ToolContext<'a>,
) -> Result<Call<'a>, ToolError> {
    let mut call = Call {
        api: cx.management,
        token: cx.session.token().to_string(),
        tenant: None,
        environment: None,
    };

    match (tool.tenancy, cx.mode) {
        (Tenancy::None, _) => {}
        (Tenancy::Workspace | Tenancy::Environment, TransportMode::Stateful) => {
            let selected = cx
                .session
                .selected_environment()
                .ok_or_else(|| ToolError::Rejected(NOT_SELECTED.to_string()))?;
            call.tenant = Some(selected.domain.clone());
            call.environment = Some(selected.clone());
        }
        (Tenancy::Workspace, TransportMode::Stateless) => {
            call.tenant = Some(String::new());
        }
        (Tenancy::Environment, TransportMode::Stateless) => {
            let target: EnvironmentTarget = parse(args)?;
            let selected = resolve_environment(cx.management, &call.token, &target.environment_id)
                .await
                .map_err(selection_failure)?;
            call.tenant = Some(selected.domain.clone());
            call.environment = Some(selected);
        }
    }
    Ok(call)
}

fn selection_failure(err: SelectionError) -> ToolError {
    match err {
        SelectionError::InvalidIdentifier => {
            ToolError::Rejected("Environment ID must start with env_".to_string())
        }
        SelectionError::MissingDomain => ToolError::Rejected(
            "The environment has no domain configured. Please check the environment ID."
                .to_string(),
        ),
        SelectionError::Lookup(source) => ToolError::Upstream {
            failure: "Failed to fetch environment. \
                      Please check if the environment is correctly set or try again later.",
            source,
        },
    }
}

/// Picks the failure text by status class. 4xx usually means the caller named
/// something that exists already, or does not exist.
fn client_failure(
    err: UpstreamError,
    client: &'static str,
    otherwise: &'static str,
) -> ToolError {
    let failure = match &err {
        UpstreamError::Status { status, .. } if (400..500).contains(status) => client,
        _ => otherwise,
    };
    ToolError::Upstream {
        failure,
        source: err,
    }
}

fn finish(tool: &ToolDefinition, outcome: Outcome) -> ToolResult {
    match outcome {
        Ok(text) => ToolResult::ok(text),
        Err(ToolError::Rejected(text)) => ToolResult::error(text),
        Err(ToolError::Upstream { failure, source }) => {
            tracing::error!(tool = tool.name, error = %source, "management api call failed");
            ToolResult::error(failure)
        }
    }
}

/// `"N/A"` for absent or empty values.
fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("N/A")
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Map, Value};

    use super::args::{ToolParams, parse};
    use crate::services::auth::VerifiedIdentity;
    use crate::services::management::{ManagementApi, ManagementRequest, UpstreamError};

    /// Replays queued responses and records every request.
    #[derive(Default)]
    pub struct Scripted {
        responses: Mutex<VecDeque<Result<Value, UpstreamError>>>,
        requests: Mutex<Vec<ManagementRequest>>,
    }

    impl Scripted {
        pub fn new(responses: Vec<Result<Value, UpstreamError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<ManagementRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ManagementApi for Scripted {
        async fn send(&self, request: ManagementRequest) -> Result<Value, UpstreamError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Value::Null))
        }
    }

    /// Parsed and validated arguments; panics on invalid input.
    pub fn params<T: ToolParams>(arguments: Value) -> T {
        parse(arguments.as_object().unwrap()).unwrap()
    }

    pub fn identity(scope: &str) -> VerifiedIdentity {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"k"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&serde_json::json!({"sub": "user-1", "scope": scope})).unwrap(),
        );
        VerifiedIdentity {
            token: format!("{header}.{payload}.c2ln"),
            issuer: "https://auth.example.com".into(),
            subject: "user-1".into(),
            client_id: None,
            scopes: Some(scope.split(' ').map(String::from).collect()),
            claims: Map::new(),
        }
    }
}
