use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::json;

use super::params::{
    CreateOrganizationParams, CreateOrganizationUserParams, ListOrganizationUsersParams,
    OrganizationTarget, PageParams, UpdateOrganizationSettingsParams,
};
use super::{Call, Outcome, OrFail, or_na, pretty};
use crate::services::management::models::{
    ListOrganizationsResponse, ListUsersResponse, OrganizationResponse, PortalLinkResponse,
};

const ORGANIZATION_PAGE_SIZE: &str = "30";
const USER_PAGE_SIZE: &str = "100";

fn next_page(token: Option<&str>) -> String {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => format!("\n\nNext Page Token: {token}"),
        None => "\n\nNo more pages available".to_string(),
    }
}

pub(super) async fn list(call: &Call<'_>, params: PageParams) -> Outcome {
    let page_token = params.page_token.unwrap_or_default();
    let request = call
        .request(Method::GET, "/api/v1/organizations")
        .query("page_size", ORGANIZATION_PAGE_SIZE)
        .query("page_token", page_token);
    let response: ListOrganizationsResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to fetch organizations. Please try again later.")?;

    tracing::debug!(next_page_token = ?response.next_page_token, "organizations page");
    if response.organizations.is_empty() {
        return Ok("No organizations found in the selected environment.".to_string());
    }
    let organizations: Vec<String> = response
        .organizations
        .iter()
        .enumerate()
        .map(|(idx, org)| {
            format!(
                "Organization {}:\n  Name: {}\n  ID: {}\n  External ID: {}",
                idx + 1,
                or_na(org.display_name.as_deref()),
                or_na(Some(org.id.as_str())),
                or_na(org.external_id.as_deref()),
            )
        })
        .collect();
    Ok(format!(
        "{}{}",
        organizations.join("\n\n"),
        next_page(response.next_page_token.as_deref())
    ))
}

pub(super) async fn details(call: &Call<'_>, params: OrganizationTarget) -> Outcome {
    let id = params.organization_id;
    let response: OrganizationResponse = call
        .fetch(call.request(Method::GET, format!("/api/v1/organizations/{id}")))
        .await
        .or_fail("Failed to fetch organization details. Please try again later.")?;

    let org = response.organization;
    Ok(format!(
        "Organization Details:\n  Name: {}\n  ID: {}\n  External ID: {}\n  Settings: {}",
        or_na(org.display_name.as_deref()),
        org.id,
        or_na(org.external_id.as_deref()),
        pretty(&org.settings),
    ))
}

pub(super) async fn create(call: &Call<'_>, params: CreateOrganizationParams) -> Outcome {
    let request = call
        .request(Method::POST, "/api/v1/organizations")
        .json(json!({"display_name": params.organization_name}));
    let response: OrganizationResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to create organization. Please try again.")?;

    let org = response.organization;
    Ok(format!(
        "Organization created successfully!\n  Name: {}\n  ID: {}",
        or_na(org.display_name.as_deref()),
        org.id
    ))
}

fn format_expiry(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|at| at.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => "N/A".to_string(),
    }
}

pub(super) async fn portal_link(call: &Call<'_>, params: OrganizationTarget) -> Outcome {
    let id = params.organization_id;
    let request = call
        .request(Method::PUT, format!("/api/v1/organizations/{id}/portal_links"))
        .json(json!({}));
    let response: PortalLinkResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to generate admin portal link. Please try again.")?;

    Ok(format!(
        "Admin Portal Link generated successfully!\n  Link: {}\n  Expire Time: {}",
        response.link.location,
        format_expiry(response.link.expire_time.as_deref())
    ))
}

pub(super) async fn create_user(
    call: &Call<'_>,
    params: CreateOrganizationUserParams,
) -> Outcome {
    let CreateOrganizationUserParams {
        organization_id,
        email,
        external_id,
        first_name,
        last_name,
        metadata,
    } = params;
    let (external_id, first_name, last_name) = (
        external_id.as_deref(),
        first_name.as_deref(),
        last_name.as_deref(),
    );

    let full_name = [first_name, last_name]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let mut profile = serde_json::Map::new();
    if let Some(first) = first_name {
        profile.insert("first_name".into(), json!(first));
    }
    if let Some(last) = last_name {
        profile.insert("last_name".into(), json!(last));
    }
    if !full_name.is_empty() {
        profile.insert("name".into(), json!(full_name));
    }

    let mut body = json!({
        "email": &email,
        "user_profile": profile,
        "metadata": metadata.clone().unwrap_or_default(),
    });
    if let Some(external_id) = external_id {
        body["external_id"] = json!(external_id);
    }

    let request = call
        .request(
            Method::POST,
            format!("/api/v1/memberships/organizations/{organization_id}/users"),
        )
        .json(body);
    call.send(request)
        .await
        .or_fail("Failed to create organization user. Please try again.")?;

    let mut text = format!(
        "Organization user created successfully!\n  Email: {email}\n  \
         Organization ID: {organization_id}"
    );
    if let Some(external_id) = external_id {
        text.push_str(&format!("\n  External ID: {external_id}"));
    }
    if let Some(first) = first_name {
        text.push_str(&format!("\n  First Name: {first}"));
    }
    if let Some(last) = last_name {
        text.push_str(&format!("\n  Last Name: {last}"));
    }
    if let Some(metadata) = &metadata {
        text.push_str(&format!("\n  Metadata: {}", pretty(metadata)));
    }
    Ok(text)
}

pub(super) async fn list_users(call: &Call<'_>, params: ListOrganizationUsersParams) -> Outcome {
    let organization_id = params.organization_id;
    let page_token = params.page_token.unwrap_or_default();
    let request = call
        .request(
            Method::GET,
            format!("/api/v1/organizations/{organization_id}/users"),
        )
        .query("page_size", USER_PAGE_SIZE)
        .query("page_token", page_token);
    let response: ListUsersResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to fetch organization users. Please try again later.")?;

    if response.users.is_empty() {
        return Ok("No organization users found in the selected environment.".to_string());
    }
    let users: Vec<String> = response
        .users
        .iter()
        .enumerate()
        .map(|(idx, user)| {
            let profile = user.user_profile.as_ref();
            format!(
                "User {}:\n  Email: {}\n  ID: {}\n  External ID: {}\n  \
                 First Name: {}\n  Last Name: {}",
                idx + 1,
                or_na(user.email.as_deref()),
                or_na(Some(user.id.as_str())),
                or_na(user.external_id.as_deref()),
                or_na(profile.and_then(|p| p.first_name.as_deref())),
                or_na(profile.and_then(|p| p.last_name.as_deref())),
            )
        })
        .collect();
    Ok(format!(
        "{}{}",
        users.join("\n\n"),
        next_page(response.next_page_token.as_deref())
    ))
}

pub(super) async fn update_settings(
    call: &Call<'_>,
    params: UpdateOrganizationSettingsParams,
) -> Outcome {
    let UpdateOrganizationSettingsParams {
        organization_id,
        features,
    } = params;

    let request = call
        .request(
            Method::PATCH,
            format!("/api/v1/organizations/{organization_id}/settings"),
        )
        .json(json!({ "features": &features }));
    call.send(request)
        .await
        .or_fail("Failed to update organization settings. Please try again.")?;

    Ok(format!(
        "Organization settings updated successfully!\n  \
         Organization ID: {organization_id}\n  Features: {}",
        pretty(&features)
    ))
}
