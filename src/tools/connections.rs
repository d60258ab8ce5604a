use reqwest::Method;
use serde_json::json;

use super::params::{
    ConnectionTarget, CreateOidcConnectionParams, OrganizationTarget, UpdateOidcConnectionParams,
};
use super::{Call, Outcome, OrFail, pretty};
use crate::services::management::models::{
    Connection, ConnectionResponse, ListConnectionsResponse,
};

const OIDC: &str = "OIDC";

fn render(connections: &[Connection]) -> String {
    let entries: Vec<String> = connections
        .iter()
        .map(|conn| {
            let mut fields = vec![format!("id: {}", conn.id)];
            if let Some(provider) = &conn.provider {
                fields.push(format!("provider: {provider}"));
            }
            if let Some(kind) = &conn.kind {
                fields.push(format!("type: {kind}"));
            }
            if let Some(status) = &conn.status {
                fields.push(format!("status: {status}"));
            }
            fields.push(format!("enabled: {}", conn.enabled));
            if let Some(name) = &conn.organization_name {
                fields.push(format!("organization_name: {name}"));
            }
            format!("- {{\n  {}\n}}", fields.join(",\n  "))
        })
        .collect();
    format!("Connections:\n{}", entries.join("\n"))
}

pub(super) async fn list_environment(call: &Call<'_>) -> Outcome {
    let request = call
        .request(Method::GET, "/api/v1/connections")
        .query("include", "all");
    let response: ListConnectionsResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to fetch connection details. Please try again later.")?;
    Ok(render(&response.connections))
}

pub(super) async fn list_organization(call: &Call<'_>, params: OrganizationTarget) -> Outcome {
    let request = call
        .request(Method::GET, "/api/v1/connections")
        .query("organization_id", params.organization_id)
        .query("include", "all");
    let response: ListConnectionsResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to fetch connection details. Please try again later.")?;
    Ok(render(&response.connections))
}

pub(super) async fn create_oidc(
    call: &Call<'_>,
    params: CreateOidcConnectionParams,
) -> Outcome {
    let request = call
        .request(Method::POST, "/api/v1/connections")
        .json(json!({"provider": params.provider, "type": OIDC}));
    let response: ConnectionResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to create OIDC connection. Please try again later.")?;
    Ok(format!(
        "OIDC connection created successfully!\n{}",
        pretty(&response.connection)
    ))
}

pub(super) async fn update_oidc(
    call: &Call<'_>,
    params: UpdateOidcConnectionParams,
) -> Outcome {
    let provider = params.provider.as_str();
    let request = call
        .request(
            Method::PATCH,
            format!("/api/v1/connections/{}", params.connection_id),
        )
        .json(json!({
            "type": OIDC,
            "key_id": params.key_id.to_uppercase(),
            "configuration_type": "DISCOVERY",
            "provider": provider,
            "oidc_config": params.oidc_config,
        }));
    let response: ConnectionResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to update OIDC connection. Please try again later.")?;
    Ok(format!(
        "OIDC connection updated successfully!\n  id: {}\n  provider: {provider}\n  type: {OIDC}",
        response.connection.id
    ))
}

pub(super) async fn enable(call: &Call<'_>, params: ConnectionTarget) -> Outcome {
    let connection_id = params.connection_id;
    let response = call
        .send(call.request(
            Method::PATCH,
            format!("/api/v1/connections/{connection_id}:enable"),
        ))
        .await
        .or_fail("Failed to enable connection. Please try again later.")?;
    let enabled = response
        .get("enabled")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    Ok(format!(
        "Connection enabled successfully!\n  Enabled status: {enabled}"
    ))
}
