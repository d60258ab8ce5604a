//! POST /mcp and DELETE /mcp.
//!
//! Stateful mode keeps one AuthContext per `Mcp-Session-Id`; every request on
//! that session locks it, swaps in the identity verified for this request and
//! runs to completion before the next one starts. Stateless mode builds a
//! fresh context per request and drops it afterwards.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::dto::jsonrpc::{
    CallToolParams, INVALID_PARAMS, INVALID_REQUEST, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR,
};
use crate::api::extractors::IdentityExtractor;
use crate::config::TransportMode;
use crate::error::AppError;
use crate::services::session::AuthContext;
use crate::state::AppState;
use crate::tools::{self, ToolContext, catalog};

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_VERSION: &str = "2025-06-18";

const INITIALIZE: &str = "initialize";

pub async fn post_mcp(
    State(state): State<AppState>,
    IdentityExtractor(identity): IdentityExtractor,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::debug!(error = %err, "unparsable json-rpc body");
            let response = JsonRpcResponse::error(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, "Parse error"),
            );
            return Ok((StatusCode::BAD_REQUEST, Json(response)).into_response());
        }
    };

    match state.config.transport_mode {
        TransportMode::Stateless => {
            let mut context = AuthContext::new(identity);
            Ok(reply(&request, handle(&state, &mut context, &request).await))
        }
        TransportMode::Stateful if request.method == INITIALIZE => {
            // A session only exists once a well-formed initialize request succeeds.
            if let Err(error) = envelope(&request) {
                return Ok(reply(&request, Err(error)));
            }
            if request.is_notification() {
                tracing::debug!("initialize sent as a notification; no session created");
                return Ok(StatusCode::ACCEPTED.into_response());
            }
            let session = state.sessions.create(identity);
            let mut context = session.context().lock().await;
            let mut response = reply(&request, handle(&state, &mut context, &request).await);
            if let Ok(value) = HeaderValue::from_str(&session.id().to_string()) {
                response.headers_mut().insert(SESSION_HEADER, value);
            }
            Ok(response)
        }
        TransportMode::Stateful => {
            let id = session_id(&headers)?;
            let session = state
                .sessions
                .get(id, &identity.subject)
                .ok_or(AppError::SessionNotFound)?;
            let mut context = session.context().lock().await;
            context.refresh_identity(identity);
            Ok(reply(&request, handle(&state, &mut context, &request).await))
        }
    }
}

pub async fn delete_mcp(
    State(state): State<AppState>,
    IdentityExtractor(identity): IdentityExtractor,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    if state.config.transport_mode == TransportMode::Stateless {
        return Ok(StatusCode::METHOD_NOT_ALLOWED);
    }
    let id = session_id(&headers)?;
    if state.sessions.remove(id, &identity.subject) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::SessionNotFound)
    }
}

/// A malformed id can never name a live session, so it reads as "not found".
fn session_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let raw = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::bad_request("MISSING_SESSION_ID", "Mcp-Session-Id header is required.")
        })?;
    Uuid::parse_str(raw).map_err(|_| AppError::SessionNotFound)
}

/// Notifications are acknowledged with 202 and no body.
fn reply(request: &JsonRpcRequest, outcome: Result<Value, JsonRpcError>) -> Response {
    let Some(id) = request.id.clone() else {
        return StatusCode::ACCEPTED.into_response();
    };
    let response = match outcome {
        Ok(result) => JsonRpcResponse::result(id, result),
        Err(error) => JsonRpcResponse::error(id, error),
    };
    Json(response).into_response()
}

fn envelope(request: &JsonRpcRequest) -> Result<(), JsonRpcError> {
    if request.jsonrpc == "2.0" {
        Ok(())
    } else {
        Err(JsonRpcError::new(INVALID_REQUEST, "Invalid Request"))
    }
}

async fn handle(
    state: &AppState,
    context: &mut AuthContext,
    request: &JsonRpcRequest,
) -> Result<Value, JsonRpcError> {
    envelope(request)?;
    let mode = state.config.transport_mode;

    match request.method.as_str() {
        INITIALIZE => {
            let version = request
                .params
                .as_ref()
                .and_then(|p| p.get("protocolVersion"))
                .and_then(Value::as_str)
                .unwrap_or(PROTOCOL_VERSION);
            Ok(json!({
                "protocolVersion": version,
                "capabilities": {"tools": {"listChanged": false}},
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }))
        }
        "notifications/initialized" | "ping" => Ok(json!({})),
        "tools/list" => {
            let tools: Vec<Value> = catalog::catalog()
                .iter()
                .map(|tool| tool.describe(mode))
                .collect();
            Ok(json!({ "tools": tools }))
        }
        "tools/call" => {
            let params: CallToolParams =
                serde_json::from_value(request.params.clone().unwrap_or(Value::Null))
                    .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))?;
            let cx = ToolContext {
                session: context,
                management: state.management.as_ref(),
                authorizer: &state.authorizer,
                mode,
            };
            tracing::debug!(tool = %params.name, "tool call");
            let result = tools::call_tool(&params.name, params.arguments, cx)
                .await
                .map_err(|err| JsonRpcError::new(INVALID_PARAMS, err.to_string()))?;
            Ok(result.to_json())
        }
        other => {
            tracing::debug!(method = %other, "unknown json-rpc method");
            Err(JsonRpcError::new(METHOD_NOT_FOUND, "Method not found"))
        }
    }
}
