/*
 * Responsibility
 * - Config 読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (CORS / HTTP 横断 / Bearer は routes 側)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::services::auth::build_auth_services;
use crate::services::management::HttpManagementApi;
use crate::state::AppState;

const DEFAULT_FILTER: &str = "info,tower_http=info";

fn init_tracing() {
    // RUST_LOG が優先。なければ LOG_LEVEL、どちらもなければ既定値
    // Ex:
    // RUST_LOG=info,tenant_admin_mcp=debug,tower_http=debug cargo run
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // A second init (e.g. from tests) is not an error.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development では即落とす。production は default hook に任せてプロセスは継続
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        env = ?config.app_env,
        addr = %config.addr,
        transport = ?config.transport_mode,
        "starting tenant admin MCP server"
    );

    let state = build_state(config.clone())?;

    // Warm the discovery cache; a failure here is retried on first use.
    if let Err(err) = state.metadata.get().await {
        tracing::warn!(
            error = %err,
            url = %state.metadata.url(),
            "authorization server metadata prefetch failed"
        );
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Build process-level services and inject them into the shared state.
pub fn build_state(config: Config) -> Result<AppState, AppError> {
    let client = reqwest::Client::builder()
        .timeout(config.upstream_timeout)
        .build()
        .map_err(|err| {
            tracing::error!(error = %err, "failed to build http client");
            AppError::Internal
        })?;

    let auth = build_auth_services(&config, client.clone());
    let management = Arc::new(HttpManagementApi::new(
        client,
        config.management_api_base_url.clone(),
    ));

    Ok(AppState::new(
        Arc::new(config),
        auth.verifier,
        auth.authorizer,
        auth.metadata,
        management,
    ))
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let router = api::routes(state.clone()).with_state(state);
    let router = middleware::cors::apply(router, &config);
    middleware::http::apply(router, &config)
}
