//! Server state

use std::sync::Arc;

use crate::command::Executor;
use crate::config::AgentConfig;
use crate::docker::DockerClient;
use crate::errors::AgentError;
use crate::git::RepoManager;
use crate::http::SidecarClient;
use crate::server::locks::KeyedLocks;

/// Everything the handlers need, shared across requests
pub struct AgentService {
    pub config: Arc<AgentConfig>,
    pub docker: DockerClient,
    pub repos: RepoManager,
    pub sidecar: SidecarClient,

    /// Held while a checkout directory is cloned, pulled, built or deleted
    pub repo_locks: KeyedLocks,

    /// Held while a container is replaced or deleted
    pub container_locks: KeyedLocks,
}

impl AgentService {
    pub fn new(config: Arc<AgentConfig>, executor: Arc<dyn Executor>) -> Result<Self, AgentError> {
        let sidecar = SidecarClient::new(&config.pm2_url)?;
        Ok(Self {
            docker: DockerClient::new(executor.clone()),
            repos: RepoManager::new(executor, config.git_host.clone()),
            sidecar,
            repo_locks: KeyedLocks::new(),
            container_locks: KeyedLocks::new(),
            config,
        })
    }
}
