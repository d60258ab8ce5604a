use reqwest::Method;
use serde_json::{Value, json};

use super::params::{InviteMemberParams, ListMembersParams};
use super::{Call, Outcome, OrFail, ToolError};
use crate::services::management::UpstreamError;
use crate::services::management::models::{ListMembersResponse, MemberResponse};

const MEMBERS_PATH: &str = "/api/v1/workspaces/this/members";
const MEMBER_PAGE_SIZE: &str = "500";
const INVITED_ROLE: &str = "ADMIN";

/// Page tokens are 1-based; 0 means the first page.
fn page_number(raw: Option<u64>) -> u64 {
    raw.filter(|n| *n > 0).unwrap_or(1)
}

pub(super) async fn list_members(call: &Call<'_>, params: ListMembersParams) -> Outcome {
    let page = page_number(params.page_token);
    let request = call
        .request(Method::GET, MEMBERS_PATH)
        .query("page_size", MEMBER_PAGE_SIZE)
        .query("page_token", page.to_string());
    let response: ListMembersResponse = call
        .fetch(request)
        .await
        .or_fail("Failed to fetch workspace members. Please try again later.")?;

    let members: Vec<String> = response
        .members
        .iter()
        .map(|member| {
            let status = member
                .organizations
                .first()
                .and_then(|org| org.membership_status.as_deref())
                .unwrap_or("UNKNOWN");
            format!("Workspace Member {} in {status} status", member.email)
        })
        .collect();
    let listing = if members.is_empty() {
        "No members found.".to_string()
    } else {
        members.join(", ")
    };
    let next = match response.next_page_token {
        Some(Value::String(token)) if !token.is_empty() => token,
        Some(Value::Number(n)) => n.to_string(),
        _ => "1".to_string(),
    };
    Ok(format!("{listing}\nNext Page Token: {next}"))
}

pub(super) async fn invite_member(call: &Call<'_>, params: InviteMemberParams) -> Outcome {
    let request = call
        .request(Method::POST, MEMBERS_PATH)
        .json(json!({"email": params.email, "role": INVITED_ROLE}));
    let response: MemberResponse = call.fetch(request).await.map_err(|err| {
        let client_error = matches!(
            &err,
            UpstreamError::Status { status, .. } if (400..500).contains(status)
        );
        if !client_error {
            return ToolError::Upstream {
                failure: "Failed to invite workspace members. Please try again later.",
                source: err,
            };
        }
        // Client errors carry a reason the caller can act on, e.g. an existing member.
        let reason = err.upstream_message().unwrap_or("Unknown error");
        tracing::warn!(
            %reason,
            "workspace invite refused; an existing user may not have accepted the invitation yet"
        );
        ToolError::Rejected(format!("Failed to invite workspace member: {reason}"))
    })?;
    Ok(format!("Workspace Member {} invited.", response.member.email))
}

#[cfg(test)]
mod tests {
    use super::super::Call;
    use super::super::testing::{Scripted, identity, params};
    use super::*;

    fn call(api: &Scripted) -> Call<'_> {
        Call {
            api,
            token: identity("workspace:read workspace:write").token,
            tenant: Some(String::new()),
            environment: None,
        }
    }

    #[test]
    fn page_zero_is_page_one() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some(0)), 1);
        assert_eq!(page_number(Some(3)), 3);
    }

    #[tokio::test]
    async fn members_render_with_status_and_next_page() {
        let api = Scripted::new(vec![Ok(json!({
            "members": [
                {
                    "id": "m1",
                    "email": "a@example.com",
                    "organizations": [{"organization_id": "o", "membership_status": "ACTIVE"}]
                },
                {"id": "m2", "email": "b@example.com"}
            ],
            "next_page_token": 2
        }))]);
        let text = list_members(&call(&api), params(json!({"pageToken": "0"})))
            .await
            .unwrap();
        assert_eq!(
            text,
            "Workspace Member a@example.com in ACTIVE status, \
             Workspace Member b@example.com in UNKNOWN status\nNext Page Token: 2"
        );

        let requests = api.requests();
        let request = &requests[0];
        assert!(request.query.contains(&("page_token".into(), "1".into())));
        assert!(request.query.contains(&("page_size".into(), "500".into())));
        assert_eq!(request.tenant_domain.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn invite_surfaces_upstream_reason() {
        let api = Scripted::new(vec![Err(UpstreamError::Status {
            status: 409,
            message: Some("member already exists".into()),
        })]);
        let outcome = invite_member(&call(&api), params(json!({"email": "a@example.com"}))).await;
        match outcome {
            Err(ToolError::Rejected(text)) => {
                assert_eq!(text, "Failed to invite workspace member: member already exists")
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(api.requests()[0].body.clone().unwrap()["role"], "ADMIN");
    }
}
