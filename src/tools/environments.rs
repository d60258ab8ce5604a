use reqwest::Method;
use serde_json::json;

use super::params::{CreateRoleParams, CreateScopeParams, EnvironmentTarget};
use super::{Call, Outcome, OrFail, ToolContext, client_failure, selection_failure};
use crate::config::TransportMode;
use crate::services::management::models::{
    EnvironmentResponse, ListEnvironmentsResponse, ListRolesResponse, ListScopesResponse, Role,
    RoleResponse, ScopeResponse,
};
use crate::services::session::resolve_environment;

const FETCH_ENVIRONMENT_FAILED: &str = "Failed to fetch environment. \
    Please check if the environment is correctly set or try again later.";

pub(super) async fn list(call: &Call<'_>) -> Outcome {
    let response: ListEnvironmentsResponse = call
        .fetch(call.request(Method::GET, "/api/v1/environments"))
        .await
        .or_fail("Failed to fetch environments. Please try again later.")?;

    let lines: Vec<String> = response
        .environments
        .iter()
        .map(|env| match &env.display_name {
            Some(name) => format!("{} ({name})", env.id),
            None => env.id.clone(),
        })
        .collect();
    Ok(format!("Available environments:\n{}", lines.join("\n")))
}

pub(super) async fn details(call: &Call<'_>, params: EnvironmentTarget) -> Outcome {
    let id = params.environment_id;
    let response: EnvironmentResponse = call
        .fetch(call.request(Method::GET, format!("/api/v1/environments/{id}")))
        .await
        .or_fail(FETCH_ENVIRONMENT_FAILED)?;

    let env = response.environment;
    Ok(format!(
        "Environment name is {} with domain {}. This is a {} environment. \
         Custom Domain: {} and CustomDomain status is {}.",
        env.label(),
        env.domain.as_deref().unwrap_or("N/A"),
        env.kind.as_deref().unwrap_or("N/A"),
        env.custom_domain.as_deref().unwrap_or("N/A"),
        env.custom_domain_status.as_deref().unwrap_or("N/A"),
    ))
}

/// The only tool that changes session state.
pub(super) async fn set(params: EnvironmentTarget, cx: ToolContext<'_>) -> Outcome {
    let ToolContext {
        session,
        management,
        mode,
        ..
    } = cx;
    let id = params.environment_id.as_str();
    match mode {
        TransportMode::Stateful => {
            let selected = session
                .select_environment(id, management)
                .await
                .map_err(selection_failure)?;
            Ok(format!(
                "Environment set to {} ({}).",
                selected.label(),
                selected.id
            ))
        }
        TransportMode::Stateless => {
            let selected = resolve_environment(management, session.token(), id)
                .await
                .map_err(selection_failure)?;
            Ok(format!(
                "Environment {} ({}) is available. \
                 Selections are not kept between calls; pass `environmentId` with each call.",
                selected.label(),
                selected.id
            ))
        }
    }
}

pub(super) async fn current(call: &Call<'_>) -> Outcome {
    let selected = call.environment()?;
    let response: EnvironmentResponse = call
        .fetch(call.request(
            Method::GET,
            format!("/api/v1/environments/{}", selected.id),
        ))
        .await
        .or_fail(FETCH_ENVIRONMENT_FAILED)?;
    Ok(format!(
        "Current environment name is {}",
        response.environment.label()
    ))
}

fn render_role(role: &Role) -> String {
    format!(
        "ID: {}\nName: {}\nDisplay Name: {}\nDescription: {}\nDefault: {}",
        role.id,
        role.name,
        role.display_name,
        role.description,
        if role.default { "Yes" } else { "No" }
    )
}

pub(super) async fn list_roles(call: &Call<'_>) -> Outcome {
    let response: ListRolesResponse = call
        .fetch(call.request(Method::GET, "/api/v1/roles"))
        .await
        .or_fail("Failed to fetch environment roles. Please try again later.")?;

    if response.roles.is_empty() {
        return Ok("No roles found for this environment.".to_string());
    }
    let roles: Vec<String> = response.roles.iter().map(render_role).collect();
    Ok(format!("Available roles:\n{}", roles.join("\n\n")))
}

pub(super) async fn create_role(call: &Call<'_>, params: CreateRoleParams) -> Outcome {
    let request = call.request(Method::POST, "/api/v1/roles").json(json!({
        "name": params.role_name,
        "display_name": params.role_display_name,
        "description": params.description.unwrap_or_default(),
        "default": params.is_default,
    }));
    let response: RoleResponse = call.fetch(request).await.map_err(|err| {
        client_failure(
            err,
            "Failed to create role. Please check if the environment is correctly set \
             or if this role already exist or try again later.",
            "Failed to create role. \
             Please check if the environment is correctly set or try again later.",
        )
    })?;
    Ok(format!(
        "Role created successfully:\n{}",
        render_role(&response.role)
    ))
}

pub(super) async fn list_scopes(call: &Call<'_>) -> Outcome {
    let response: ListScopesResponse = call
        .fetch(call.request(Method::GET, "/api/v1/scopes"))
        .await
        .or_fail("Failed to fetch environment scopes. Please try again later.")?;

    if response.scopes.is_empty() {
        return Ok("No scopes found for this environment.".to_string());
    }
    let scopes: Vec<String> = response
        .scopes
        .iter()
        .map(|scope| format!("Name: {}\nDescription: {}", scope.name, scope.description))
        .collect();
    Ok(format!("Available scopes:\n{}", scopes.join("\n\n")))
}

pub(super) async fn create_scope(call: &Call<'_>, params: CreateScopeParams) -> Outcome {
    let request = call.request(Method::POST, "/api/v1/scopes").json(json!({
        "name": params.scope_name,
        "description": params.description.unwrap_or_default(),
    }));
    let response: ScopeResponse = call.fetch(request).await.map_err(|err| {
        client_failure(
            err,
            "Failed to create scope. Please check if the environment is correctly set \
             or if this scope already exist or try again later.",
            "Failed to create scope. \
             Please check if the environment is correctly set or try again later.",
        )
    })?;
    Ok(format!(
        "Scope created successfully:\nName: {}\nDescription: {}",
        response.scope.name, response.scope.description
    ))
}
