//! HTTP JSON API for the asset tracker.
//!
//! Provides `assets serve <config>`, which starts an axum server with these endpoints:
//! - GET    /health                              -- liveness and version
//! - GET    /catalogs                            -- configured catalogs
//! - GET    /lifecycles/{name}                   -- statuses, transitions and rights
//! - POST   /assets                              -- create an asset
//! - GET    /assets?catalog=&status=             -- search visible assets
//! - GET    /assets/{id}                         -- asset with roles and custom fields
//! - DELETE /assets/{id}                         -- move to the lifecycle's deleted status
//! - PUT    /assets/{id}/status                  -- gated status change
//! - PUT    /assets/{id}/name                    -- rename
//! - PUT    /assets/{id}/description             -- replace the description
//! - PUT    /assets/{id}/catalog                 -- move to another catalog
//! - POST   /assets/{id}/roles                   -- add a role member
//! - DELETE /assets/{id}/roles                   -- remove a role member
//! - PUT    /assets/{id}/custom-fields/{field}   -- replace a field's values
//! - GET    /assets/{id}/history                 -- change records
//!
//! Every `/assets` route takes the acting user from the `X-Asset-User` header.

mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use assets_core::Registry;
use assets_engine::{AllowAll, AssetService, Authorizer, GrantTable};
use assets_storage::InMemoryStorage;
use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use handlers::*;
use state::AppState;

/// Request body cap. Asset payloads are small.
const MAX_BODY_BYTES: usize = 1024 * 1024;

fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(json!({"error": message})))
}

fn authorizer_for(registry: &Registry) -> Box<dyn Authorizer> {
    let grants = GrantTable::from_registry(registry);
    if grants.is_empty() {
        warn!("no [[grants]] configured; every user holds every right");
        Box::new(AllowAll)
    } else {
        Box::new(grants)
    }
}

pub(crate) fn router(registry: Registry) -> Router {
    let registry = Arc::new(registry);
    let authorizer = authorizer_for(&registry);
    let service = AssetService::new(InMemoryStorage::new(), registry, authorizer);
    let state = Arc::new(AppState::new(service));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/catalogs", get(handle_catalogs))
        .route("/lifecycles/{name}", get(handle_lifecycle))
        .route("/assets", post(handle_create).get(handle_search))
        .route("/assets/{id}", get(handle_get).delete(handle_delete))
        .route("/assets/{id}/status", put(handle_set_status))
        .route("/assets/{id}/name", put(handle_set_name))
        .route("/assets/{id}/description", put(handle_set_description))
        .route("/assets/{id}/catalog", put(handle_set_catalog))
        .route(
            "/assets/{id}/roles",
            post(handle_add_role_member).delete(handle_remove_role_member),
        )
        .route(
            "/assets/{id}/custom-fields/{field}",
            put(handle_set_custom_field),
        )
        .route("/assets/{id}/history", get(handle_history))
        .fallback(handle_not_found)
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Serve the API until Ctrl+C.
pub(crate) async fn start_server(
    registry: Registry,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalogs = registry.catalogs().len();
    let app = router(registry);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, catalogs, "asset API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl+C handler; shut down by killing the process");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
