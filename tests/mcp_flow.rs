mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::json;
use tenant_admin_mcp::config::TransportMode;
use tenant_admin_mcp::services::management::UpstreamError;
use tenant_admin_mcp::tools::catalog::catalog;

use common::{IdentityProvider, PUBLIC_BASE_URL, app, config, json_body, mint, tool_text};

const ALL_SCOPES: &str = "workspace:read workspace:write env:read env:write org:read org:write";

fn staging() -> serde_json::Value {
    json!({"environment": {
        "id": "env_1",
        "display_name": "Staging",
        "domain": "staging.acme.test"
    }})
}

#[tokio::test]
async fn missing_token_gets_challenge() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));

    let response = app
        .send(Request::post("/mcp").body(Body::from("{}")).unwrap())
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
    assert_eq!(
        challenge,
        format!(
            r#"Bearer realm="OAuth", resource_metadata="{PUBLIC_BASE_URL}/.well-known/oauth-protected-resource""#
        )
    );
}

#[tokio::test]
async fn token_expired_one_second_ago_is_rejected_before_any_upstream_call() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateless));

    let mut claims = idp.claims("user-1", ALL_SCOPES);
    claims["exp"] = json!(chrono::Utc::now().timestamp() - 1);
    let response = app
        .rpc(
            &mint(&claims),
            None,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call",
                   "params": {"name": "list_environments", "arguments": {}}}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    assert_eq!(app.management.calls(), 0);
}

#[tokio::test]
async fn wrong_issuer_and_tampered_signature_are_rejected() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateless));
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let mut claims = idp.claims("user-1", ALL_SCOPES);
    claims["iss"] = json!("https://someone-else.test");
    let response = app.rpc(&mint(&claims), None, ping.clone()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = idp.token("user-1", ALL_SCOPES);
    let (signed, signature) = token.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{signed}.{flipped}{}", &signature[1..]);
    let response = app.rpc(&tampered, None, ping).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn challenge_can_carry_authorization_uri() {
    let idp = IdentityProvider::spawn().await;
    let mut cfg = config(&idp, TransportMode::Stateful);
    cfg.challenge_authorization_uri = true;
    let app = app(cfg);

    let response = app
        .send(Request::delete("/mcp").body(Body::empty()).unwrap())
        .await;
    let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
    assert!(challenge.ends_with(&format!(
        r#"authorization_uri="{PUBLIC_BASE_URL}/.well-known/oauth-authorization-server""#
    )));
}

#[tokio::test]
async fn stateful_session_selects_environment_and_routes_calls() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));
    app.management.respond("/api/v1/environments/env_1", Ok(staging()));
    app.management.respond(
        "/api/v1/organizations",
        Ok(json!({"organizations": [{"id": "org_1", "display_name": "Acme"}]})),
    );
    let token = idp.token("user-1", ALL_SCOPES);
    let session = app.initialize(&token).await;

    let before = app
        .call_tool(&token, Some(&session), "list_organizations", json!({}))
        .await;
    assert_eq!(tool_text(&before), "Use `set_environment` first.");
    assert_eq!(before["result"]["isError"], true);
    assert_eq!(app.management.calls(), 0);

    let selected = app
        .call_tool(&token, Some(&session), "set_environment", json!({"environmentId": "env_1"}))
        .await;
    assert!(tool_text(&selected).contains("Staging"), "{selected}");

    let listed = app
        .call_tool(&token, Some(&session), "list_organizations", json!({}))
        .await;
    assert!(tool_text(&listed).contains("Acme"), "{listed}");

    let requests = app.management.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].path, "/api/v1/organizations");
    assert_eq!(requests[1].tenant_domain.as_deref(), Some("staging.acme.test"));
    assert_eq!(requests[1].bearer_token, token);
}

#[tokio::test]
async fn failed_selection_keeps_previous_environment() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));
    app.management.respond("/api/v1/environments/env_1", Ok(staging()));
    app.management.respond(
        "/api/v1/environments/env_gone",
        Err(UpstreamError::Status { status: 404, message: None }),
    );
    let token = idp.token("user-1", ALL_SCOPES);
    let session = app.initialize(&token).await;

    app.call_tool(&token, Some(&session), "set_environment", json!({"environmentId": "env_1"}))
        .await;
    let failed = app
        .call_tool(&token, Some(&session), "set_environment", json!({"environmentId": "env_gone"}))
        .await;
    assert_eq!(failed["result"]["isError"], true);

    let current = app
        .call_tool(&token, Some(&session), "get_current_environment", json!({}))
        .await;
    assert_eq!(tool_text(&current), "Current environment name is Staging");
}

#[tokio::test]
async fn session_of_another_subject_is_not_found() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));
    let owner = idp.token("user-1", ALL_SCOPES);
    let intruder = idp.token("user-2", ALL_SCOPES);
    let session = app.initialize(&owner).await;

    let response = app
        .rpc(&intruder, Some(&session), json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .rpc(&owner, Some(&session), json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_header_is_required_and_must_be_known() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));
    let token = idp.token("user-1", ALL_SCOPES);
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"});

    let response = app.rpc(&token, None, ping.clone()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let unknown = uuid::Uuid::new_v4().to_string();
    let response = app.rpc(&token, Some(&unknown), ping).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_closes_the_session() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));
    let token = idp.token("user-1", ALL_SCOPES);
    let session = app.initialize(&token).await;
    assert_eq!(app.state.sessions.len(), 1);

    let delete = || {
        Request::delete("/mcp")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("mcp-session-id", session.as_str())
            .body(Body::empty())
            .unwrap()
    };
    assert_eq!(app.send(delete()).await.status(), StatusCode::NO_CONTENT);
    assert!(app.state.sessions.is_empty());
    assert_eq!(app.send(delete()).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_initialize_creates_no_session() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));
    let token = idp.token("user-1", ALL_SCOPES);

    let response = app
        .rpc(&token, None, json!({"jsonrpc": "1.0", "id": 1, "method": "initialize"}))
        .await;
    assert!(response.headers().get("mcp-session-id").is_none());
    assert_eq!(json_body(response).await["error"]["code"], -32600);

    let response = app
        .rpc(&token, None, json!({"jsonrpc": "2.0", "method": "initialize"}))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(response.headers().get("mcp-session-id").is_none());

    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn insufficient_scope_is_a_tool_error_without_upstream_calls() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));
    let token = idp.token("user-1", "env:read");
    let session = app.initialize(&token).await;

    let response = app
        .call_tool(&token, Some(&session), "create_organization", json!({"name": "Acme"}))
        .await;
    assert_eq!(response["result"]["isError"], true);
    assert!(
        tool_text(&response).starts_with("You do not have permission to"),
        "{response}"
    );
    assert_eq!(app.management.calls(), 0);
}

#[tokio::test]
async fn json_rpc_errors() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateless));
    let token = idp.token("user-1", ALL_SCOPES);

    let response = app
        .send(
            Request::post("/mcp")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], -32700);

    let response = app
        .rpc(&token, None, json!({"jsonrpc": "2.0", "id": 2, "method": "resources/list"}))
        .await;
    assert_eq!(json_body(response).await["error"]["code"], -32601);

    let response = app.call_tool(&token, None, "drop_database", json!({})).await;
    assert_eq!(response["error"]["code"], -32602);

    let response = app
        .rpc(&token, None, json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn tools_list_depends_on_transport_mode() {
    let idp = IdentityProvider::spawn().await;
    let token = idp.token("user-1", ALL_SCOPES);
    let list = json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"});

    let stateless = app(config(&idp, TransportMode::Stateless));
    let body = json_body(stateless.rpc(&token, None, list.clone()).await).await;
    let tools = body["result"]["tools"].as_array().unwrap();
    let orgs = tools
        .iter()
        .find(|t| t["name"] == "list_organizations")
        .unwrap();
    assert!(orgs["inputSchema"]["properties"]["environmentId"].is_object());

    let stateful = app(config(&idp, TransportMode::Stateful));
    let session = stateful.initialize(&token).await;
    let body = json_body(stateful.rpc(&token, Some(&session), list).await).await;
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), catalog().len());
    let orgs = tools
        .iter()
        .find(|t| t["name"] == "list_organizations")
        .unwrap();
    assert!(orgs["inputSchema"]["properties"]["environmentId"].is_null());
}

#[tokio::test]
async fn stateless_calls_resolve_environment_per_request() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateless));
    app.management.respond("/api/v1/environments/env_1", Ok(staging()));
    app.management.respond("/api/v1/organizations", Ok(json!({"organizations": []})));
    let token = idp.token("user-1", ALL_SCOPES);

    let missing = app.call_tool(&token, None, "list_organizations", json!({})).await;
    assert_eq!(tool_text(&missing), "Missing required argument `environmentId`.");
    assert_eq!(app.management.calls(), 0);

    for _ in 0..2 {
        app.call_tool(&token, None, "list_organizations", json!({"environmentId": "env_1"}))
            .await;
    }
    let requests = app.management.requests();
    let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "/api/v1/environments/env_1",
            "/api/v1/organizations",
            "/api/v1/environments/env_1",
            "/api/v1/organizations"
        ]
    );
    assert_eq!(requests[1].tenant_domain.as_deref(), Some("staging.acme.test"));
}

#[tokio::test]
async fn discovery_documents_are_public() {
    let idp = IdentityProvider::spawn().await;
    let app = app(config(&idp, TransportMode::Stateful));

    let response = app
        .send(
            Request::get("/.well-known/oauth-protected-resource")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["resource"], PUBLIC_BASE_URL);
    assert_eq!(body["authorization_servers"], json!([PUBLIC_BASE_URL]));
    assert_eq!(body["bearer_methods_supported"], json!(["header"]));
    assert_eq!(body["resource_documentation"], format!("{PUBLIC_BASE_URL}/docs"));
    assert_eq!(body["scopes_supported"].as_array().unwrap().len(), 6);

    let response = app
        .send(
            Request::get("/.well-known/oauth-authorization-server")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["issuer"], idp.issuer.as_str());
    assert_eq!(body["jwks_uri"], format!("{}/keys", idp.issuer));
    assert!(body.get("vendor_extension").is_none());
    assert!(body.get("revocation_endpoint").is_none());

    let response = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}
