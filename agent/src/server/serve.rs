//! HTTP server setup

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::AgentError;
use crate::server::auth::auth_request;
use crate::server::handlers::*;
use crate::server::pm2::pm2_handler;
use crate::server::state::AgentService;

/// Every route, behind the passkey check
pub fn build_router(service: Arc<AgentService>) -> Router {
    Router::new()
        // Agent
        .route("/status", get(status_handler))
        .route("/stats", get(stats_handler))
        // Containers
        .route("/containers", get(list_containers_handler))
        .route("/container/{name}", get(container_status_handler))
        .route("/container/{name}/log", get(container_log_handler))
        .route("/container/{name}/start", get(start_container_handler))
        .route("/container/{name}/stop", get(stop_container_handler))
        .route("/container/{name}/delete", get(delete_container_handler))
        .route("/deploy", post(deploy_handler))
        // Builds and repositories
        .route("/build", post(build_handler))
        .route("/repo/clone", post(clone_repo_handler))
        .route("/repo/pull", post(pull_repo_handler))
        .route("/repo/delete", post(delete_repo_handler))
        // Images and networks
        .route("/images", get(list_images_handler))
        .route("/images/prune", get(prune_images_handler))
        .route("/networks", get(list_networks_handler))
        .route("/networks/prune", get(prune_networks_handler))
        .route("/network", post(create_network_handler))
        .route("/network/{name}", delete(delete_network_handler))
        // pm2 sidecar
        .route("/pm2/{*path}", get(pm2_handler))
        // State and middleware
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_request))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    port: u16,
    service: Arc<AgentService>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), AgentError>>, AgentError> {
    let app = build_router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AgentError::ServerError(format!("failed to bind {addr}: {e}")))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| AgentError::ServerError(e.to_string()))
    });

    Ok(handle)
}
