//! Agent configuration
//!
//! Built once at start-up from the environment and the secrets file, then
//! shared read-only through the service state.

pub mod env;
pub mod secrets;

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AgentError;
use crate::filesys::file::File;

pub use env::Env;
pub use secrets::Secrets;

/// Immutable agent configuration
#[derive(Debug)]
pub struct AgentConfig {
    /// Port the HTTP server listens on
    pub port: u16,

    /// Registry prefix for built images, empty or ending with `/`
    pub registry_url: String,

    /// Root of bind-mount host paths, ends with `/`
    pub sysroot: String,

    /// Directory repositories are cloned into
    pub repo_dir: PathBuf,

    /// Host used to build repository urls
    pub git_host: String,

    /// Base url of the pm2 sidecar
    pub pm2_url: String,

    /// Optional per-step command timeout
    pub command_timeout: Option<Duration>,

    pub secrets: Secrets,
}

impl AgentConfig {
    pub fn new(env: &Env, secrets: Secrets) -> Self {
        Self {
            port: env.port,
            registry_url: env.registry_url.clone(),
            sysroot: env.sysroot.clone(),
            repo_dir: env.repo_dir.clone(),
            git_host: env.git_host.clone(),
            pm2_url: env.pm2_url.clone(),
            command_timeout: env.command_timeout,
            secrets,
        }
    }

    /// Read the secrets file named by `env` and build the configuration
    pub async fn load(env: &Env) -> Result<Self, AgentError> {
        let secrets = Secrets::load(&File::new(&env.secrets_path)).await?;
        Ok(Self::new(env, secrets))
    }
}
