//! Static catalog: name, description, required scopes, tenancy and input schema
//! of every operation.

use serde_json::{Value, json};

use super::args;
use super::params::{
    ConnectionTarget, CreateOidcConnectionParams, CreateOrganizationParams,
    CreateOrganizationUserParams, CreateRoleParams, CreateScopeParams, EnvironmentTarget,
    InviteMemberParams, ListMembersParams, ListOrganizationUsersParams, McpServerTarget,
    NoParams, OrganizationTarget, PageParams, RegisterMcpServerParams, UpdateMcpServerParams,
    UpdateOidcConnectionParams, UpdateOrganizationSettingsParams,
};
use crate::config::TransportMode;
use crate::services::auth::Scope;

/// Which tenant context an operation needs before it may call upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tenancy {
    /// Never needs an environment.
    None,
    /// Stateful: needs a selected environment. Stateless: runs without one.
    Workspace,
    /// Stateful: needs a selected environment. Stateless: needs `environmentId`.
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListEnvironments,
    GetEnvironmentDetails,
    SetEnvironment,
    GetCurrentEnvironment,
    ListEnvironmentRoles,
    CreateEnvironmentRole,
    ListEnvironmentScopes,
    CreateEnvironmentScope,
    ListWorkspaceMembers,
    InviteWorkspaceMember,
    ListOrganizations,
    GetOrganizationDetails,
    CreateOrganization,
    GenerateAdminPortalLink,
    CreateOrganizationUser,
    ListOrganizationUsers,
    UpdateOrganizationSettings,
    ListEnvironmentConnections,
    ListOrganizationConnections,
    CreateEnvironmentOidcConnection,
    UpdateEnvironmentOidcConnection,
    EnableEnvironmentConnection,
    ListMcpServers,
    RegisterMcpServer,
    UpdateMcpServer,
    SwitchMcpAuthToScalekit,
}

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// Completes "You do not have permission to ...".
    pub action: &'static str,
    pub scopes: &'static [Scope],
    pub tenancy: Tenancy,
    pub operation: Operation,
}

static CATALOG: [ToolDefinition; 26] = [
    ToolDefinition {
        name: "list_environments",
        description: "List all available environments.",
        action: "list environments",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::None,
        operation: Operation::ListEnvironments,
    },
    ToolDefinition {
        name: "get_environment_details",
        description: "Get the environment details by ID (e.g. env_123). Afterwards the client can \
                      call list_organizations to list the organizations of that environment.",
        action: "view environment details",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::None,
        operation: Operation::GetEnvironmentDetails,
    },
    ToolDefinition {
        name: "set_environment",
        description: "Select the environment (e.g. env_123) that later calls operate on. If you \
                      only have a name, call list_environments first to resolve the ID.",
        action: "select an environment",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::None,
        operation: Operation::SetEnvironment,
    },
    ToolDefinition {
        name: "get_current_environment",
        description: "Get the currently selected environment.",
        action: "view the current environment",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::Environment,
        operation: Operation::GetCurrentEnvironment,
    },
    ToolDefinition {
        name: "list_environment_roles",
        description: "List all roles in the environment. Show the response in a table.",
        action: "list environment roles",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::Environment,
        operation: Operation::ListEnvironmentRoles,
    },
    ToolDefinition {
        name: "create_environment_role",
        description: "Create a new role in the environment. Requires roleName, roleDisplayName, \
                      and optionally description and isDefault.",
        action: "create environment roles",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::CreateEnvironmentRole,
    },
    ToolDefinition {
        name: "list_environment_scopes",
        description: "List all scopes in the environment. Show the response in a table.",
        action: "list environment scopes",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::Environment,
        operation: Operation::ListEnvironmentScopes,
    },
    ToolDefinition {
        name: "create_environment_scope",
        description: "Create a new scope in the environment. Requires scopeName and optionally \
                      description.",
        action: "create environment scopes",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::CreateEnvironmentScope,
    },
    ToolDefinition {
        name: "list_workspace_members",
        description: "List the members of the current workspace. pageToken is a 1-based page \
                      index. After each page ask whether to fetch the next one.",
        action: "list workspace members",
        scopes: &[Scope::WorkspaceRead],
        tenancy: Tenancy::Workspace,
        operation: Operation::ListWorkspaceMembers,
    },
    ToolDefinition {
        name: "invite_workspace_member",
        description: "Invite a new member to the current workspace by email.",
        action: "invite workspace members",
        scopes: &[Scope::WorkspaceWrite],
        tenancy: Tenancy::Workspace,
        operation: Operation::InviteWorkspaceMember,
    },
    ToolDefinition {
        name: "list_organizations",
        description: "List the organizations of the environment. Pass pageToken from the \
                      previous response to continue. After each page ask whether to fetch the \
                      next one.",
        action: "list organizations",
        scopes: &[Scope::OrganizationRead],
        tenancy: Tenancy::Environment,
        operation: Operation::ListOrganizations,
    },
    ToolDefinition {
        name: "get_organization_details",
        description: "Get the details of an organization by ID (e.g. org_123).",
        action: "view organization details",
        scopes: &[Scope::OrganizationRead],
        tenancy: Tenancy::Environment,
        operation: Operation::GetOrganizationDetails,
    },
    ToolDefinition {
        name: "create_organization",
        description: "Create a new organization in the environment.",
        action: "create organizations",
        scopes: &[Scope::OrganizationWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::CreateOrganization,
    },
    ToolDefinition {
        name: "generate_admin_portal_link",
        description: "Generate an admin portal magic link for an organization (e.g. org_123).",
        action: "generate admin portal links",
        scopes: &[Scope::OrganizationWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::GenerateAdminPortalLink,
    },
    ToolDefinition {
        name: "create_organization_user",
        description: "Create a user in an organization. Requires organizationId and email. Roles \
                      can be looked up with list_environment_roles.",
        action: "create organization users",
        scopes: &[Scope::OrganizationWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::CreateOrganizationUser,
    },
    ToolDefinition {
        name: "list_organization_users",
        description: "List the users of an organization. Pass pageToken from the previous \
                      response to continue. After each page ask whether to fetch the next one.",
        action: "list organization users",
        scopes: &[Scope::OrganizationRead],
        tenancy: Tenancy::Environment,
        operation: Operation::ListOrganizationUsers,
    },
    ToolDefinition {
        name: "update_organization_settings",
        description: "Update organization feature settings, e.g. \
                      features: [{\"name\":\"dir_sync\",\"enabled\":true}].",
        action: "update organization settings",
        scopes: &[Scope::OrganizationWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::UpdateOrganizationSettings,
    },
    ToolDefinition {
        name: "list_environment_connections",
        description: "List all connections of the environment.",
        action: "list environment connections",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::Environment,
        operation: Operation::ListEnvironmentConnections,
    },
    ToolDefinition {
        name: "list_organization_connections",
        description: "List all connections of an organization (e.g. org_123).",
        action: "list organization connections",
        scopes: &[Scope::OrganizationRead],
        tenancy: Tenancy::Environment,
        operation: Operation::ListOrganizationConnections,
    },
    ToolDefinition {
        name: "create_environment_oidc_connection",
        description: "Create an environment-level OIDC connection for a provider. The result \
                      contains the redirect_uri to configure at the identity provider; confirm \
                      that with the user before calling update_environment_oidc_connection.",
        action: "create connections",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::CreateEnvironmentOidcConnection,
    },
    ToolDefinition {
        name: "update_environment_oidc_connection",
        description: "Update an environment-level OIDC connection (connectionId, key_id, \
                      provider, oidc_config). Ask the user for every value explicitly. Once \
                      reviewed, enable it with enable_environment_connection.",
        action: "update connections",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::UpdateEnvironmentOidcConnection,
    },
    ToolDefinition {
        name: "enable_environment_connection",
        description: "Enable a connection of the environment (e.g. conn_123).",
        action: "enable connections",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::EnableEnvironmentConnection,
    },
    ToolDefinition {
        name: "list_mcp_servers",
        description: "List the MCP servers registered in the environment. Pass pageToken to \
                      continue and ask whether to fetch the next page.",
        action: "list registered mcp servers",
        scopes: &[Scope::EnvironmentRead],
        tenancy: Tenancy::Environment,
        operation: Operation::ListMcpServers,
    },
    ToolDefinition {
        name: "register_mcp_server",
        description: "Register an MCP server in the environment. The url becomes the token \
                      audience. Returns the resource metadata the server must publish at \
                      /.well-known/oauth-protected-resource.",
        action: "register mcp server",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::RegisterMcpServer,
    },
    ToolDefinition {
        name: "update_mcp_server",
        description: "Update a registered MCP server (e.g. app_123). Only the fields provided \
                      are changed.",
        action: "update mcp server",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::UpdateMcpServer,
    },
    ToolDefinition {
        name: "switch_mcp_auth_to_scalekit",
        description: "Switch a registered MCP server (e.g. app_123) to the built-in \
                      authentication by removing its external provider.",
        action: "switch MCP server authentication",
        scopes: &[Scope::EnvironmentWrite],
        tenancy: Tenancy::Environment,
        operation: Operation::SwitchMcpAuthToScalekit,
    },
];

pub fn catalog() -> &'static [ToolDefinition] {
    &CATALOG
}

pub fn find(name: &str) -> Option<&'static ToolDefinition> {
    CATALOG.iter().find(|tool| tool.name == name)
}

impl ToolDefinition {
    /// JSON schema of the arguments. In stateless mode environment-scoped
    /// operations also take `environmentId`.
    pub fn input_schema(&self, mode: TransportMode) -> Value {
        let mut schema = self.operation.schema();
        if mode == TransportMode::Stateless && self.tenancy == Tenancy::Environment {
            let target = args::schema::<EnvironmentTarget>();
            if let (Some(properties), Some(extra)) = (
                schema.get_mut("properties").and_then(Value::as_object_mut),
                target["properties"].as_object(),
            ) {
                properties.extend(extra.clone());
            }
            if let Some(required) = schema.get_mut("required").and_then(Value::as_array_mut) {
                required.insert(0, json!("environmentId"));
            }
        }
        schema
    }

    /// Entry for `tools/list`.
    pub fn describe(&self, mode: TransportMode) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(mode),
        })
    }
}

impl Operation {
    fn schema(&self) -> Value {
        match self {
            Operation::ListEnvironments
            | Operation::GetCurrentEnvironment
            | Operation::ListEnvironmentRoles
            | Operation::ListEnvironmentScopes
            | Operation::ListEnvironmentConnections => args::schema::<NoParams>(),
            Operation::GetEnvironmentDetails | Operation::SetEnvironment => {
                args::schema::<EnvironmentTarget>()
            }
            Operation::CreateEnvironmentRole => args::schema::<CreateRoleParams>(),
            Operation::CreateEnvironmentScope => args::schema::<CreateScopeParams>(),
            Operation::ListWorkspaceMembers => args::schema::<ListMembersParams>(),
            Operation::InviteWorkspaceMember => args::schema::<InviteMemberParams>(),
            Operation::ListOrganizations | Operation::ListMcpServers => {
                args::schema::<PageParams>()
            }
            Operation::GetOrganizationDetails
            | Operation::GenerateAdminPortalLink
            | Operation::ListOrganizationConnections => args::schema::<OrganizationTarget>(),
            Operation::CreateOrganization => args::schema::<CreateOrganizationParams>(),
            Operation::CreateOrganizationUser => args::schema::<CreateOrganizationUserParams>(),
            Operation::ListOrganizationUsers => args::schema::<ListOrganizationUsersParams>(),
            Operation::UpdateOrganizationSettings => {
                args::schema::<UpdateOrganizationSettingsParams>()
            }
            Operation::CreateEnvironmentOidcConnection => {
                args::schema::<CreateOidcConnectionParams>()
            }
            Operation::UpdateEnvironmentOidcConnection => {
                args::schema::<UpdateOidcConnectionParams>()
            }
            Operation::EnableEnvironmentConnection => args::schema::<ConnectionTarget>(),
            Operation::RegisterMcpServer => args::schema::<RegisterMcpServerParams>(),
            Operation::UpdateMcpServer => args::schema::<UpdateMcpServerParams>(),
            Operation::SwitchMcpAuthToScalekit => args::schema::<McpServerTarget>(),
        }
    }
}
