//! Registered MCP servers (protected resources of the environment).

use reqwest::Method;
use serde_json::{Map, Value, json};

use super::args::parse_url;
use super::params::{McpServerTarget, PageParams, RegisterMcpServerParams, UpdateMcpServerParams};
use super::{Call, Outcome, OrFail, ToolError, client_failure, or_na};
use crate::services::auth::ProtectedResourceMetadata;
use crate::services::management::models::{
    ListResourcesResponse, ListScopesResponse, ResourceResponse,
};

const RESOURCES_PATH: &str = "/api/v1/resources";
const PAGE_SIZE: &str = "30";
const MCP_SERVER: &str = "MCP_SERVER";

pub(super) async fn list(call: &Call<'_>, params: PageParams) -> Outcome {
    let page_token = params.page_token.unwrap_or_default();
    let request = call
        .request(Method::GET, RESOURCES_PATH)
        .query("page_size", PAGE_SIZE)
        .query("page_token", page_token)
        .query("resource_type", MCP_SERVER);
    let response: ListResourcesResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to fetch registered MCP servers. Please try again later.")?;

    if response.resources.is_empty() {
        return Ok("No MCP servers are registered in this environment.".to_string());
    }
    let servers: Vec<String> = response
        .resources
        .iter()
        .enumerate()
        .map(|(idx, server)| {
            let expiry = match &server.access_token_expiry {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => "N/A".to_string(),
            };
            let provider = server.provider.as_deref().filter(|p| !p.is_empty());
            let mut lines = vec![
                format!("#{}", idx + 1),
                format!("Name: {}", server.name),
                format!("ID: {}", server.id),
                format!("Resource ID: {}", server.resource_id),
                format!("Description: {}", or_na(server.description.as_deref())),
                format!("Access Token Expiry: {expiry}"),
                format!(
                    "Using Scalekit Authentication: {}",
                    if provider.is_none() { "Yes" } else { "No" }
                ),
            ];
            if let Some(provider) = provider {
                lines.push(format!("Provider: {provider}"));
            }
            lines.join("\n")
        })
        .collect();

    let next = response
        .next_page_token
        .filter(|t| !t.is_empty())
        .map(|t| format!("\n\nNext Page Token: {t}"))
        .unwrap_or_default();
    Ok(format!(
        "Registered MCP Servers:\n{}{next}",
        servers.join("\n\n")
    ))
}

pub(super) async fn register(call: &Call<'_>, params: RegisterMcpServerParams) -> Outcome {
    let environment = call.environment()?;
    let RegisterMcpServerParams {
        name,
        description,
        url: server_url,
        access_token_expiry,
        provider,
        use_scalekit_authentication,
    } = params;
    let origin = parse_url(&server_url)?.origin().ascii_serialization();
    let provider = if use_scalekit_authentication {
        String::new()
    } else {
        provider.unwrap_or_default()
    };

    let scopes: ListScopesResponse = call
        .fetch(call.request(Method::GET, "/api/v1/scopes"))
        .await
        .or_fail(
            "Failed to fetch environment scopes. \
             Please create the scopes if not already created or try again later.",
        )?;
    let metadata = ProtectedResourceMetadata::new(
        &origin,
        vec![format!("{origin}/.well-known/oauth-authorization-server")],
        scopes.scopes.into_iter().map(|scope| scope.name).collect(),
    );
    let metadata_json = serde_json::to_string(&metadata).map_err(|_| {
        ToolError::Rejected("Failed to register mcp server. Please try again.".to_string())
    })?;

    let mut body = json!({
        "name": &name,
        "description": description.unwrap_or_default(),
        "third_party": false,
        "resource_type": MCP_SERVER,
        "resource_id": server_url,
        "resourceMetadata": &metadata_json,
        "provider": provider,
    });
    if let Some(expiry) = access_token_expiry {
        body["access_token_expiry"] = json!(expiry);
    }

    let response: ResourceResponse = call
        .fetch(call.request(Method::POST, RESOURCES_PATH).json(body))
        .await
        .map_err(|err| {
            client_failure(
                err,
                "Failed to register mcp server. \
                 Check if the server is already registered or try again later.",
                "Failed to register mcp server. Please try again.",
            )
        })?;

    let id = response.resource.id;
    Ok(format!(
        "MCP server \"{name}\" with id {id} has been successfully registered \
         with resourceMetadata: {metadata_json}. \
         Fetch the oauth-authorization-server metadata from \
         https://{}/resources/{id}/.well-known/oauth-authorization-server",
        environment.domain
    ))
}

pub(super) async fn update(call: &Call<'_>, params: UpdateMcpServerParams) -> Outcome {
    let id = params.id;

    let mut changes = Map::new();
    if let Some(name) = params.name {
        changes.insert("name".into(), json!(name));
    }
    if let Some(description) = params.description {
        changes.insert("description".into(), json!(description));
    }
    if let Some(server_url) = params.url {
        changes.insert("resource_id".into(), json!(server_url));
        changes.insert("resource_type".into(), json!("WEB"));
        changes.insert("third_party".into(), json!(true));
    }
    if let Some(expiry) = params.access_token_expiry.filter(|e| *e > 0) {
        changes.insert("access_token_expiry".into(), json!(expiry));
    }
    if let Some(provider) = params.provider {
        changes.insert("provider".into(), json!(provider));
    }
    if params.use_scalekit_authentication {
        changes.insert("provider".into(), json!(""));
    }
    if changes.is_empty() {
        return Err(ToolError::Rejected("No fields provided to update.".to_string()));
    }

    call.send(
        call.request(Method::PATCH, format!("{RESOURCES_PATH}/{id}"))
            .json(Value::Object(changes)),
    )
    .await
    .map_err(|err| {
        client_failure(
            err,
            "Failed to update mcp server. Please check if the server exists or try again later.",
            "Failed to update mcp server. Please try again.",
        )
    })?;
    Ok(format!("MCP server \"{id}\" has been successfully updated."))
}

pub(super) async fn switch_auth(call: &Call<'_>, params: McpServerTarget) -> Outcome {
    let id = params.id;
    call.send(call.request(
        Method::PUT,
        format!("{RESOURCES_PATH}/{id}/provider:delete"),
    ))
    .await
    .map_err(|err| {
        client_failure(
            err,
            "Failed to switch MCP server authentication. \
             Please check if the server exists or try again later.",
            "Failed to switch MCP server authentication. Please try again.",
        )
    })?;
    Ok(format!(
        "Authentication for MCP server \"{id}\" has been switched to Scalekit authentication."
    ))
}

#[cfg(test)]
mod tests {
    use super::super::args::parse;
    use super::super::testing::{Scripted, identity, params};
    use super::*;
    use crate::services::session::SelectedEnvironment;

    fn call(api: &Scripted) -> Call<'_> {
        Call {
            api,
            token: identity("env:read env:write").token,
            tenant: Some("acme.example.com".into()),
            environment: Some(SelectedEnvironment {
                id: "env_1".into(),
                domain: "acme.example.com".into(),
                display_name: None,
            }),
        }
    }

    fn text(outcome: Outcome) -> String {
        match outcome {
            Ok(text) | Err(ToolError::Rejected(text)) => text,
            Err(ToolError::Upstream { failure, .. }) => failure.to_string(),
        }
    }

    #[tokio::test]
    async fn register_builds_metadata_from_origin_and_scopes() {
        let api = Scripted::new(vec![
            Ok(json!({"scopes": [{"name": "todo:read"}, {"name": "todo:write"}]})),
            Ok(json!({"resource": {"id": "app_42", "name": "Todo"}})),
        ]);
        let args = json!({
            "name": "Todo",
            "url": "https://mcp.example.com/mcp",
            "provider": "OKTA",
            "use_scalekit_authentication": true
        });
        let result = text(register(&call(&api), params(args)).await);
        assert!(result.contains("with id app_42"), "{result}");
        assert!(result.contains("https://acme.example.com/resources/app_42/"));

        let requests = api.requests();
        assert_eq!(requests[0].path, "/api/v1/scopes");
        let body = requests[1].body.clone().unwrap();
        assert_eq!(body["provider"], "");
        assert_eq!(body["resource_id"], "https://mcp.example.com/mcp");
        assert_eq!(body["resource_type"], "MCP_SERVER");

        let metadata: Value =
            serde_json::from_str(body["resourceMetadata"].as_str().unwrap()).unwrap();
        assert_eq!(metadata["resource"], "https://mcp.example.com");
        assert_eq!(
            metadata["authorization_servers"][0],
            "https://mcp.example.com/.well-known/oauth-authorization-server"
        );
        assert_eq!(metadata["scopes_supported"], json!(["todo:read", "todo:write"]));
    }

    #[test]
    fn register_rejects_relative_url() {
        let args = json!({"name": "Todo", "url": "/mcp", "use_scalekit_authentication": true});
        let err = parse::<RegisterMcpServerParams>(args.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Invalid URL(s) passed: /mcp");
    }

    #[tokio::test]
    async fn update_sends_only_provided_fields() {
        let api = Scripted::default();
        let args = json!({"id": "app_1", "url": "https://new.example.com", "name": ""});
        let result = text(update(&call(&api), params(args)).await);
        assert_eq!(result, "MCP server \"app_1\" has been successfully updated.");

        let body = api.requests()[0].body.clone().unwrap();
        assert_eq!(
            body,
            json!({
                "resource_id": "https://new.example.com",
                "resource_type": "WEB",
                "third_party": true
            })
        );
    }

    #[tokio::test]
    async fn empty_update_is_refused() {
        let api = Scripted::default();
        let args = json!({"id": "app_1", "access_token_expiry": 0});
        let result = text(update(&call(&api), params(args)).await);
        assert_eq!(result, "No fields provided to update.");
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn switch_auth_targets_provider_delete() {
        let api = Scripted::default();
        text(switch_auth(&call(&api), params(json!({"id": "app_9"}))).await);
        let requests = api.requests();
        assert_eq!(requests[0].method, Method::PUT);
        assert_eq!(requests[0].path, "/api/v1/resources/app_9/provider:delete");
    }

    #[test]
    fn server_id_prefix_is_checked() {
        let args = json!({"id": "srv_1"});
        let err = parse::<McpServerTarget>(args.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "MCP server ID must start with app_");
    }
}
