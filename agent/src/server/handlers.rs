//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::{CombinedLog, CommandResult};
use crate::docker::run::{checkout_name, deployment_container_name};
use crate::docker::{BuildSpec, RunSpec};
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::git::RepoSpec;
use crate::models::{
    BasicContainerInfo, BuildRequest, ContainerStatus, CreateNetworkRequest, DeploymentRequest,
    DockerNetwork, ImageSummary,
};
use crate::server::state::AgentService;
use crate::telemetry::{collect_stats, SystemStats};
use crate::utils::version_info;

type Service = State<Arc<AgentService>>;

/// Stage of the image build in a build log
pub const STAGE_BUILD: &str = "build";

/// Unwrap a JSON body, turning any rejection into a 400
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AgentError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AgentError::BadRequest(rejection.body_text()))
}

/// Container names from paths go through the same sanitizing as deployments
fn container_name(name: &str) -> Result<String, AgentError> {
    checkout_name(name)
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
}

/// Status handler
pub async fn status_handler() -> Json<StatusResponse> {
    let version = version_info();
    Json(StatusResponse {
        status: "ok".to_string(),
        version: version.version,
        git_hash: version.git_hash,
    })
}

/// Host stats handler
pub async fn stats_handler() -> Result<Json<SystemStats>, AgentError> {
    let stats = tokio::task::spawn_blocking(collect_stats)
        .await
        .map_err(|e| AgentError::Internal(format!("stats task failed: {e}")))?;
    Ok(Json(stats))
}

pub async fn list_containers_handler(
    State(service): Service,
) -> Result<Json<Vec<BasicContainerInfo>>, AgentError> {
    Ok(Json(service.docker.list_containers().await?))
}

pub async fn container_status_handler(
    State(service): Service,
    Path(name): Path<String>,
) -> Result<Json<ContainerStatus>, AgentError> {
    let name = container_name(&name)?;
    Ok(Json(service.docker.container_status(&name).await?))
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub tail: Option<u64>,
}

pub async fn container_log_handler(
    State(service): Service,
    Path(name): Path<String>,
    Query(query): Query<LogQuery>,
) -> Result<Json<CommandResult>, AgentError> {
    let name = container_name(&name)?;
    Ok(Json(service.docker.container_log(&name, query.tail).await))
}

pub async fn start_container_handler(
    State(service): Service,
    Path(name): Path<String>,
) -> Result<Json<CommandResult>, AgentError> {
    let name = container_name(&name)?;
    Ok(Json(service.docker.start_container(&name).await))
}

pub async fn stop_container_handler(
    State(service): Service,
    Path(name): Path<String>,
) -> Result<Json<CommandResult>, AgentError> {
    let name = container_name(&name)?;
    Ok(Json(service.docker.stop_container(&name).await))
}

pub async fn delete_container_handler(
    State(service): Service,
    Path(name): Path<String>,
) -> Result<Json<CommandResult>, AgentError> {
    let name = container_name(&name)?;
    let _guard = service.container_locks.lock(&name).await;
    Ok(Json(service.docker.delete_container(&name).await))
}

#[derive(Debug, Deserialize)]
pub struct DeployQuery {
    pub image: Option<String>,
}

/// Replace the deployment's container. `?image=` overrides the image.
pub async fn deploy_handler(
    State(service): Service,
    Query(query): Query<DeployQuery>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Result<Json<CommandResult>, AgentError> {
    let request = body(payload)?;
    let spec = RunSpec::from_deployment(&request.deployment, query.image.as_deref(), &service.config)?;

    let _guard = service.container_locks.lock(&spec.container_name).await;
    info!("deploying {} from {}", spec.container_name, spec.image_ref());
    Ok(Json(service.docker.deploy(&spec, &service.config.sysroot).await))
}

/// Bring the checkout up to date (clone when missing), then build and push
pub async fn build_handler(
    State(service): Service,
    payload: Result<Json<BuildRequest>, JsonRejection>,
) -> Result<Json<CombinedLog>, AgentError> {
    let request = body(payload)?;
    let build_spec = BuildSpec::from_build(&request.build, &service.config)?;
    let repo_spec = RepoSpec::from_build(&request.build, &service.config)?;

    let _guard = service.repo_locks.lock(&lock_key(&repo_spec)).await;
    let mut log = if Dir::new(&repo_spec.target).exists().await {
        service.repos.pull_repo(&repo_spec).await?
    } else {
        service.repos.clone_repo(&repo_spec).await?
    };
    if !log.success() {
        return Ok(Json(log));
    }

    info!("building image {}", build_spec.name);
    let result = service
        .docker
        .build(&build_spec, &service.config.repo_dir, &service.config.registry_url)
        .await;
    log.push(STAGE_BUILD, result);
    Ok(Json(log))
}

pub async fn clone_repo_handler(
    State(service): Service,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Result<Json<CombinedLog>, AgentError> {
    let request = body(payload)?;
    let spec = RepoSpec::from_deployment(&request.deployment, &service.config)?;
    let _guard = service.repo_locks.lock(&lock_key(&spec)).await;
    Ok(Json(service.repos.clone_repo(&spec).await?))
}

pub async fn pull_repo_handler(
    State(service): Service,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Result<Json<CombinedLog>, AgentError> {
    let request = body(payload)?;
    let spec = RepoSpec::from_deployment(&request.deployment, &service.config)?;
    let _guard = service.repo_locks.lock(&lock_key(&spec)).await;
    Ok(Json(service.repos.pull_repo(&spec).await?))
}

pub async fn delete_repo_handler(
    State(service): Service,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Result<Json<CombinedLog>, AgentError> {
    let request = body(payload)?;
    let target = service
        .config
        .repo_dir
        .join(deployment_container_name(&request.deployment)?);
    let _guard = service.repo_locks.lock(&target.display().to_string()).await;
    Ok(Json(service.repos.delete_repo(&target).await))
}

fn lock_key(spec: &RepoSpec) -> String {
    spec.target.display().to_string()
}

pub async fn list_images_handler(
    State(service): Service,
) -> Result<Json<Vec<ImageSummary>>, AgentError> {
    Ok(Json(service.docker.list_images().await?))
}

pub async fn prune_images_handler(State(service): Service) -> Json<CommandResult> {
    Json(service.docker.prune_images().await)
}

pub async fn list_networks_handler(
    State(service): Service,
) -> Result<Json<Vec<DockerNetwork>>, AgentError> {
    Ok(Json(service.docker.list_networks().await?))
}

pub async fn create_network_handler(
    State(service): Service,
    payload: Result<Json<CreateNetworkRequest>, JsonRejection>,
) -> Result<Json<CommandResult>, AgentError> {
    let request = body(payload)?;
    let name = network_name(&request.name)?;
    Ok(Json(
        service
            .docker
            .create_network(name, request.driver.as_deref())
            .await,
    ))
}

pub async fn delete_network_handler(
    State(service): Service,
    Path(name): Path<String>,
) -> Result<Json<CommandResult>, AgentError> {
    let name = network_name(&name)?;
    Ok(Json(service.docker.delete_network(name).await))
}

pub async fn prune_networks_handler(State(service): Service) -> Json<CommandResult> {
    Json(service.docker.prune_networks().await)
}

fn network_name(name: &str) -> Result<&str, AgentError> {
    let name = name.trim();
    if name.is_empty() || name.starts_with('-') {
        return Err(AgentError::BadRequest(format!("invalid network name '{name}'")));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_name() {
        assert_eq!(network_name(" backend ").unwrap(), "backend");
        assert!(network_name("").is_err());
        assert!(network_name("--help").is_err());
    }

    #[test]
    fn test_container_name_is_sanitized() {
        assert_eq!(container_name("My App").unwrap(), "my_app");
        assert!(container_name(" ").is_err());
        assert!(container_name("..").is_err());
    }
}
