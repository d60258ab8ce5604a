//! Typed arguments of every operation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::args::{
    ArgError, ToolParams, blank_as_none, lenient_u64, parse_url, prefixed, require,
    validate_email,
};
use crate::services::management::ids;
use crate::services::management::models::Feature;

/// Operations without arguments.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

impl ToolParams for NoParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EnvironmentTarget {
    #[serde(rename = "environmentId")]
    #[schemars(description = "Environment ID, e.g. env_123")]
    pub environment_id: String,
}

impl ToolParams for EnvironmentTarget {
    fn validate(&self) -> Result<(), ArgError> {
        prefixed(&self.environment_id, "environmentId", ids::ENVIRONMENT, "Environment")
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleParams {
    #[schemars(description = "Unique name of the role")]
    pub role_name: String,
    #[schemars(description = "Name shown on the dashboard")]
    pub role_display_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "Description of the role")]
    pub description: Option<String>,
    #[serde(default)]
    #[schemars(description = "Assign this role by default")]
    pub is_default: bool,
}

impl ToolParams for CreateRoleParams {
    fn validate(&self) -> Result<(), ArgError> {
        require(&self.role_name, "roleName")?;
        require(&self.role_display_name, "roleDisplayName")
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateScopeParams {
    #[schemars(description = "Name of the scope")]
    pub scope_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "Description of the scope")]
    pub description: Option<String>,
}

impl ToolParams for CreateScopeParams {
    fn validate(&self) -> Result<(), ArgError> {
        require(&self.scope_name, "scopeName")
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListMembersParams {
    #[serde(rename = "pageToken", default, deserialize_with = "lenient_u64")]
    #[schemars(with = "Option<u64>", description = "1-based page index")]
    pub page_token: Option<u64>,
}

impl ToolParams for ListMembersParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct InviteMemberParams {
    #[schemars(description = "Email of the new member")]
    pub email: String,
}

impl ToolParams for InviteMemberParams {
    fn validate(&self) -> Result<(), ArgError> {
        require(&self.email, "email")?;
        validate_email(&self.email)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PageParams {
    #[serde(rename = "pageToken", default, deserialize_with = "blank_as_none")]
    #[schemars(description = "Page token from the previous response")]
    pub page_token: Option<String>,
}

impl ToolParams for PageParams {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct OrganizationTarget {
    #[serde(rename = "organizationId")]
    #[schemars(description = "Organization ID, e.g. org_123")]
    pub organization_id: String,
}

impl ToolParams for OrganizationTarget {
    fn validate(&self) -> Result<(), ArgError> {
        organization(&self.organization_id)
    }
}

fn organization(id: &str) -> Result<(), ArgError> {
    prefixed(id, "organizationId", ids::ORGANIZATION, "Organization")
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateOrganizationParams {
    #[serde(rename = "organizationName")]
    #[schemars(description = "Display name of the organization")]
    pub organization_name: String,
}

impl ToolParams for CreateOrganizationParams {
    fn validate(&self) -> Result<(), ArgError> {
        require(&self.organization_name, "organizationName")
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationUserParams {
    #[schemars(description = "Organization ID, e.g. org_123")]
    pub organization_id: String,
    #[schemars(description = "Email of the user")]
    pub email: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "External ID of the user")]
    pub external_id: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "First name")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "Last name")]
    pub last_name: Option<String>,
    #[serde(default)]
    #[schemars(description = "Free-form key/value metadata")]
    pub metadata: Option<Map<String, Value>>,
}

impl ToolParams for CreateOrganizationUserParams {
    fn validate(&self) -> Result<(), ArgError> {
        organization(&self.organization_id)?;
        require(&self.email, "email")?;
        validate_email(&self.email)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListOrganizationUsersParams {
    #[schemars(description = "Organization ID, e.g. org_123")]
    pub organization_id: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "Page token from the previous response")]
    pub page_token: Option<String>,
}

impl ToolParams for ListOrganizationUsersParams {
    fn validate(&self) -> Result<(), ArgError> {
        organization(&self.organization_id)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationSettingsParams {
    #[schemars(description = "Organization ID, e.g. org_123")]
    pub organization_id: String,
    #[schemars(length(min = 1), description = "Feature flags to set")]
    pub features: Vec<Feature>,
}

impl ToolParams for UpdateOrganizationSettingsParams {
    fn validate(&self) -> Result<(), ArgError> {
        organization(&self.organization_id)?;
        if self.features.is_empty() {
            return Err(ArgError::Invalid(
                "No features provided to update. Please provide valid features.".to_string(),
            ));
        }
        if self.features.iter().any(|f| f.name.trim().is_empty()) {
            return Err(ArgError::Invalid("Feature name is required".to_string()));
        }
        Ok(())
    }
}

/// Identity providers an OIDC connection can front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OidcProvider {
    Okta,
    Google,
    MicrosoftAd,
    Auth0,
    Onelogin,
    PingIdentity,
    Jumpcloud,
    Custom,
    Github,
    Gitlab,
    Linkedin,
    Salesforce,
    Microsoft,
    IdpSimulator,
    Scalekit,
    Adfs,
}

impl OidcProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OidcProvider::Okta => "OKTA",
            OidcProvider::Google => "GOOGLE",
            OidcProvider::MicrosoftAd => "MICROSOFT_AD",
            OidcProvider::Auth0 => "AUTH0",
            OidcProvider::Onelogin => "ONELOGIN",
            OidcProvider::PingIdentity => "PING_IDENTITY",
            OidcProvider::Jumpcloud => "JUMPCLOUD",
            OidcProvider::Custom => "CUSTOM",
            OidcProvider::Github => "GITHUB",
            OidcProvider::Gitlab => "GITLAB",
            OidcProvider::Linkedin => "LINKEDIN",
            OidcProvider::Salesforce => "SALESFORCE",
            OidcProvider::Microsoft => "MICROSOFT",
            OidcProvider::IdpSimulator => "IDP_SIMULATOR",
            OidcProvider::Scalekit => "SCALEKIT",
            OidcProvider::Adfs => "ADFS",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateOidcConnectionParams {
    pub provider: OidcProvider,
}

impl ToolParams for CreateOidcConnectionParams {}

/// Forwarded upstream as given; absent fields are omitted.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct OidcConfig {
    pub issuer: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorize_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkce_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idp_logout_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backchannel_logout_redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateOidcConnectionParams {
    #[serde(rename = "connectionId")]
    #[schemars(description = "Connection ID, e.g. conn_123")]
    pub connection_id: String,
    #[schemars(description = "Connection key, e.g. OKTA. Stored upper-case")]
    pub key_id: String,
    pub provider: OidcProvider,
    pub oidc_config: OidcConfig,
}

impl ToolParams for UpdateOidcConnectionParams {
    fn validate(&self) -> Result<(), ArgError> {
        connection(&self.connection_id)?;
        require(&self.key_id, "key_id")?;
        let config = &self.oidc_config;
        for (field, value) in [
            ("issuer", &config.issuer),
            ("client_id", &config.client_id),
            ("client_secret", &config.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(ArgError::Invalid(format!("oidc_config.{field} is required")));
            }
        }
        Ok(())
    }
}

fn connection(id: &str) -> Result<(), ArgError> {
    prefixed(id, "connectionId", ids::CONNECTION, "Connection")
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConnectionTarget {
    #[serde(rename = "connectionId")]
    #[schemars(description = "Connection ID, e.g. conn_123")]
    pub connection_id: String,
}

impl ToolParams for ConnectionTarget {
    fn validate(&self) -> Result<(), ArgError> {
        connection(&self.connection_id)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RegisterMcpServerParams {
    #[schemars(description = "Name of the MCP server")]
    pub name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "Description of the MCP server")]
    pub description: Option<String>,
    #[schemars(description = "Public URL of the MCP server; becomes the token audience")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    #[schemars(with = "Option<u64>", description = "Access token lifetime in seconds")]
    pub access_token_expiry: Option<u64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(
        description = "key_id of the customer connection; ignored with built-in authentication"
    )]
    pub provider: Option<String>,
    #[schemars(description = "Use the built-in authentication")]
    pub use_scalekit_authentication: bool,
}

impl ToolParams for RegisterMcpServerParams {
    fn validate(&self) -> Result<(), ArgError> {
        require(&self.name, "name")?;
        require(&self.url, "url")?;
        parse_url(&self.url).map(|_| ())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateMcpServerParams {
    #[schemars(description = "MCP server ID, e.g. app_123")]
    pub id: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "New name")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "New description")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "New URL")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    #[schemars(with = "Option<u64>", description = "Access token lifetime in seconds")]
    pub access_token_expiry: Option<u64>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[schemars(description = "key_id of the customer connection, upper-case")]
    pub provider: Option<String>,
    #[serde(default)]
    #[schemars(description = "Use the built-in authentication")]
    pub use_scalekit_authentication: bool,
}

impl ToolParams for UpdateMcpServerParams {
    fn validate(&self) -> Result<(), ArgError> {
        server(&self.id)?;
        if let Some(url) = &self.url {
            parse_url(url)?;
        }
        Ok(())
    }
}

fn server(id: &str) -> Result<(), ArgError> {
    prefixed(id, "id", ids::RESOURCE, "MCP server")
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct McpServerTarget {
    #[schemars(description = "MCP server ID, e.g. app_123")]
    pub id: String,
}

impl ToolParams for McpServerTarget {
    fn validate(&self) -> Result<(), ArgError> {
        server(&self.id)
    }
}
