//! `docker run` command construction

use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

use crate::command::{Arg, CommandLine};
use crate::config::AgentConfig;
use crate::errors::AgentError;
use crate::models::{Conversion, Deployment, EnvironmentVar, RestartMode, VolumeMount};

/// Retry count appended to the `on-failure` restart policy
pub const ON_FAILURE_RETRIES: u32 = 10;

/// Credentials for `docker login`
pub struct RegistryLogin {
    pub username: String,
    pub password: SecretString,
}

impl RegistryLogin {
    /// Resolve an account through the secrets file. Accounts without a
    /// stored password are skipped.
    pub fn resolve(account: Option<&str>, config: &AgentConfig) -> Option<Self> {
        let account = account.filter(|a| !a.is_empty())?;
        match config.secrets.docker_password(account) {
            Some(password) => Some(Self {
                username: account.to_string(),
                password: password.clone(),
            }),
            None => {
                warn!("no docker password stored for account {}, skipping login", account);
                None
            }
        }
    }

    pub(crate) fn command(&self) -> CommandLine {
        CommandLine::new().exec(
            "docker",
            [
                "login",
                "-u",
                self.username.as_str(),
                "-p",
                self.password.expose_secret(),
            ],
        )
    }
}

/// Where a cloned repository is mounted inside the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMount {
    pub host: String,
    pub container: String,
}

/// Everything needed to pull and run one container
pub struct RunSpec {
    pub image: String,
    pub latest: bool,
    pub container_name: String,
    pub user: Option<String>,
    pub restart: Option<RestartMode>,
    pub network: Option<String>,
    pub ports: Vec<Conversion>,
    pub volumes: Vec<VolumeMount>,
    pub environment: Vec<EnvironmentVar>,
    pub post_image: Option<String>,
    pub repo_mount: Option<RepoMount>,
    pub login: Option<RegistryLogin>,
}

impl RunSpec {
    /// A spec with only an image and a container name
    pub fn new(image: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            latest: false,
            container_name: container_name.into(),
            user: None,
            restart: None,
            network: None,
            ports: Vec::new(),
            volumes: Vec::new(),
            environment: Vec::new(),
            post_image: None,
            repo_mount: None,
            login: None,
        }
    }

    /// Build from a controller deployment. `image` overrides the
    /// deployment's own image (used when deploying the output of a build).
    pub fn from_deployment(
        deployment: &Deployment,
        image: Option<&str>,
        config: &AgentConfig,
    ) -> Result<Self, AgentError> {
        let image = image
            .or(deployment.image.as_deref())
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| AgentError::BadRequest("deployment has no image".into()))?;
        let container_name = deployment_container_name(deployment)?;

        let repo_mount = deployment
            .repo_mount
            .as_deref()
            .filter(|m| !m.is_empty() && deployment.repo.is_some())
            .map(|mount| RepoMount {
                host: config.repo_dir.join(&container_name).display().to_string(),
                container: mount.to_string(),
            });

        Ok(Self {
            image: image.to_string(),
            latest: deployment.latest,
            container_name,
            user: deployment.container_user.clone(),
            restart: deployment.restart,
            network: deployment.network.clone(),
            ports: deployment.ports.clone(),
            volumes: deployment.volumes.clone(),
            environment: deployment.environment.clone(),
            post_image: deployment.post_image.clone(),
            repo_mount,
            login: RegistryLogin::resolve(deployment.docker_account.as_deref(), config),
        })
    }

    /// Image reference used for both pull and run
    pub fn image_ref(&self) -> String {
        if self.latest {
            format!("{}:latest", self.image)
        } else {
            self.image.clone()
        }
    }

    /// Registry password, if a login step is part of the command
    pub fn secret(&self) -> Option<&str> {
        self.login.as_ref().map(|l| l.password.expose_secret())
    }
}

/// Lower case, with anything that is not safe in a directory name replaced
/// by `_`. The container name doubles as the repository folder name.
pub fn parse_container_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Container name of a deployment, falling back to its name
pub fn deployment_container_name(deployment: &Deployment) -> Result<String, AgentError> {
    let raw = deployment
        .container_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(&deployment.name);
    checkout_name(raw)
}

/// Sanitized name that is also usable as a single directory component.
/// Empty and all-dot names are rejected.
pub fn checkout_name(raw: &str) -> Result<String, AgentError> {
    let name = parse_container_name(raw);
    if name.is_empty() || name.chars().all(|c| c == '.') {
        return Err(AgentError::BadRequest(format!("'{raw}' is not a usable name")));
    }
    Ok(name)
}

/// Host side of a bind mount
pub fn volume_host_path(sysroot: &str, container_name: &str, volume: &VolumeMount) -> String {
    let local = volume.local.strip_prefix('/').unwrap_or(&volume.local);
    if volume.use_system_root {
        format!("{sysroot}{local}")
    } else {
        format!("{sysroot}{container_name}/{local}")
    }
}

/// `--restart=...` flag
pub fn restart_flag(mode: RestartMode) -> String {
    match mode {
        RestartMode::OnFailure => format!("--restart={mode}:{ON_FAILURE_RETRIES}"),
        _ => format!("--restart={mode}"),
    }
}

/// `[docker login &&] docker pull <image> && docker run -d --name <name> ... <image> [args]`
pub fn docker_run_command(spec: &RunSpec, sysroot: &str) -> CommandLine {
    let image = spec.image_ref();
    let name = spec.container_name.as_str();

    let mut args: Vec<Arg> = vec!["run".into(), "-d".into(), "--name".into(), name.into()];

    if let Some(user) = non_empty(&spec.user) {
        args.push("-u".into());
        args.push(user.into());
    }

    for port in &spec.ports {
        args.push("-p".into());
        args.push(format!("{}:{}", port.local, port.container).into());
    }

    for volume in &spec.volumes {
        args.push("-v".into());
        args.push(format!("{}:{}", volume_host_path(sysroot, name, volume), volume.container).into());
    }

    if let Some(mount) = &spec.repo_mount {
        args.push("-v".into());
        args.push(format!("{}:{}", mount.host, mount.container).into());
    }

    for env in &spec.environment {
        args.push("-e".into());
        args.push(Arg::quoted(format!("{}={}", env.variable, env.value)));
    }

    if let Some(mode) = spec.restart {
        args.push(restart_flag(mode).into());
    }

    if let Some(network) = non_empty(&spec.network) {
        args.push("--network".into());
        args.push(network.into());
    }

    args.push(image.as_str().into());

    if let Some(post_image) = non_empty(&spec.post_image) {
        args.extend(post_image.split_whitespace().map(Arg::from));
    }

    let line = match &spec.login {
        Some(login) => login.command(),
        None => CommandLine::new(),
    };
    line.exec("docker", ["pull", image.as_str()])
        .exec("docker", args)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
