//! Docker CLI client
//!
//! Every call goes through the [`Executor`], so listing commands use
//! `--format {{json .}}` and parse one JSON object per output line.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::command::{Arg, CommandLine, CommandResult, Executor, PASSWORD_PLACEHOLDER};
use crate::docker::build::{docker_build_command, BuildSpec};
use crate::docker::run::{docker_run_command, RunSpec};
use crate::errors::AgentError;
use crate::models::{
    BasicContainerInfo, ContainerState, ContainerStatus, DockerNetwork, ImageSummary, NotDeployed,
};

/// Lines returned by `docker logs` when no tail is given
pub const DEFAULT_LOG_TAIL: u64 = 50;

const JSON_FORMAT: &str = "{{json .}}";

#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "State", default)]
    state: Option<ContainerState>,
    #[serde(rename = "Status", default)]
    status: Option<String>,
}

impl From<PsLine> for BasicContainerInfo {
    fn from(line: PsLine) -> Self {
        let name = line
            .names
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        BasicContainerInfo {
            name,
            state: line.state.unwrap_or(ContainerState::Unknown),
            status: line.status.filter(|s| !s.is_empty()),
        }
    }
}

/// Container, image and network operations on the local docker daemon
#[derive(Clone)]
pub struct DockerClient {
    executor: Arc<dyn Executor>,
}

impl DockerClient {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }

    async fn docker<I, A>(&self, args: I) -> CommandResult
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.executor
            .execute(&CommandLine::new().exec("docker", args))
            .await
    }

    async fn list<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>, AgentError> {
        let mut argv: Vec<Arg> = args.iter().copied().map(Arg::from).collect();
        argv.push("--format".into());
        argv.push(Arg::quoted(JSON_FORMAT));
        let result = self.docker(argv).await;
        if !result.success {
            return Err(AgentError::DockerError(result.stderr().trim().to_string()));
        }
        parse_json_lines(result.stdout())
    }

    pub async fn list_containers(&self) -> Result<Vec<BasicContainerInfo>, AgentError> {
        let lines: Vec<PsLine> = self.list(&["ps", "-a"]).await?;
        Ok(lines.into_iter().map(BasicContainerInfo::from).collect())
    }

    pub async fn container_status(&self, name: &str) -> Result<ContainerStatus, AgentError> {
        let status = self
            .list_containers()
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .map(ContainerStatus::Deployed)
            .unwrap_or(ContainerStatus::NotDeployed(NotDeployed::NotDeployed));
        Ok(status)
    }

    pub async fn container_log(&self, name: &str, tail: Option<u64>) -> CommandResult {
        let tail = tail.unwrap_or(DEFAULT_LOG_TAIL).to_string();
        self.docker(["logs", name, "--tail", tail.as_str()]).await
    }

    pub async fn start_container(&self, name: &str) -> CommandResult {
        info!("starting container {}", name);
        self.docker(["start", name]).await
    }

    pub async fn stop_container(&self, name: &str) -> CommandResult {
        info!("stopping container {}", name);
        self.docker(["stop", name]).await
    }

    /// `docker stop <name> && docker container rm <name>`
    pub async fn delete_container(&self, name: &str) -> CommandResult {
        info!("deleting container {}", name);
        let line = CommandLine::new()
            .exec("docker", ["stop", name])
            .exec("docker", ["container", "rm", name]);
        self.executor.execute(&line).await
    }

    /// Replace any existing container with a fresh one built from `spec`
    pub async fn deploy(&self, spec: &RunSpec, sysroot: &str) -> CommandResult {
        let name = spec.container_name.as_str();
        let removed = self.delete_container(name).await;
        if !removed.success {
            debug!("no previous container {} removed: {}", name, removed.stderr().trim());
        }

        let line = docker_run_command(spec, sysroot);
        let mut result = self.executor.execute(&line).await;
        if let Some(secret) = spec.secret() {
            result = result.redact(secret, PASSWORD_PLACEHOLDER);
        }
        if result.success {
            info!("deployed container {}", name);
        } else {
            warn!("deploy of {} failed: {}", name, result.stderr().trim());
        }
        result
    }

    pub async fn build(&self, spec: &BuildSpec, repo_dir: &Path, registry_url: &str) -> CommandResult {
        let line = docker_build_command(spec, repo_dir, registry_url);
        let mut result = self.executor.execute(&line).await;
        if let Some(secret) = spec.secret() {
            result = result.redact(secret, PASSWORD_PLACEHOLDER);
        }
        result
    }

    pub async fn list_images(&self) -> Result<Vec<ImageSummary>, AgentError> {
        self.list(&["images"]).await
    }

    /// `docker image prune -a -f`
    pub async fn prune_images(&self) -> CommandResult {
        self.docker(["image", "prune", "-a", "-f"]).await
    }

    pub async fn list_networks(&self) -> Result<Vec<DockerNetwork>, AgentError> {
        self.list(&["network", "ls"]).await
    }

    /// `docker network create [-d <driver>] <name>`
    pub async fn create_network(&self, name: &str, driver: Option<&str>) -> CommandResult {
        let mut args = vec!["network", "create"];
        if let Some(driver) = driver.map(str::trim).filter(|d| !d.is_empty()) {
            args.push("-d");
            args.push(driver);
        }
        args.push(name);
        self.docker(args).await
    }

    pub async fn delete_network(&self, name: &str) -> CommandResult {
        self.docker(["network", "rm", name]).await
    }

    /// `docker network prune -f`
    pub async fn prune_networks(&self) -> CommandResult {
        self.docker(["network", "prune", "-f"]).await
    }
}

/// Parse one JSON document per non-blank line
pub fn parse_json_lines<T: DeserializeOwned>(output: &str) -> Result<Vec<T>, AgentError> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| serde_json::from_str(l).map_err(AgentError::from))
        .collect()
}
