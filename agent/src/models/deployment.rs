//! Deployment models

use std::fmt;

use serde::{Deserialize, Serialize};

/// An environment variable passed to a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVar {
    pub variable: String,
    pub value: String,
}

/// A `local:container` port mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub local: String,
    pub container: String,
}

/// A bind mount. `local` is relative to the container's folder under the
/// system root, or to the system root itself when `use_system_root` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub local: String,
    pub container: String,
    #[serde(default)]
    pub use_system_root: bool,
}

/// Container restart policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartMode {
    No,
    OnFailure,
    Always,
    UnlessStopped,
}

impl fmt::Display for RestartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self {
            RestartMode::No => "no",
            RestartMode::OnFailure => "on-failure",
            RestartMode::Always => "always",
            RestartMode::UnlessStopped => "unless-stopped",
        };
        f.write_str(mode)
    }
}

/// A shell command run inside a directory of a cloned repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemCommand {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub command: String,
}

impl SystemCommand {
    pub fn is_empty(&self) -> bool {
        self.command.trim().is_empty()
    }
}

/// A deployment as sent by the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[serde(default)]
    pub name: String,

    /// Overrides `name` as the container name
    #[serde(default)]
    pub container_name: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default, rename = "buildID")]
    pub build_id: Option<String>,

    #[serde(default)]
    pub ports: Vec<Conversion>,

    #[serde(default)]
    pub volumes: Vec<VolumeMount>,

    #[serde(default)]
    pub environment: Vec<EnvironmentVar>,

    #[serde(default)]
    pub network: Option<String>,

    #[serde(default)]
    pub restart: Option<RestartMode>,

    #[serde(default)]
    pub container_user: Option<String>,

    /// Arguments appended after the image
    #[serde(default)]
    pub post_image: Option<String>,

    /// Pull and run the `:latest` tag
    #[serde(default)]
    pub latest: bool,

    /// Docker account whose password is looked up in the secrets file
    #[serde(default)]
    pub docker_account: Option<String>,

    /// Repository as `owner/name`
    #[serde(default)]
    pub repo: Option<String>,

    #[serde(default)]
    pub branch: Option<String>,

    /// Only check out this folder of the repository
    #[serde(default)]
    pub subfolder: Option<String>,

    /// Git account whose token is looked up in the secrets file
    #[serde(default)]
    pub github_account: Option<String>,

    /// Explicit access token, wins over `github_account`
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub on_clone: Option<SystemCommand>,

    #[serde(default)]
    pub on_pull: Option<SystemCommand>,

    /// Mount the cloned repository at this path inside the container
    #[serde(default)]
    pub repo_mount: Option<String>,
}

/// Request body of the deploy and repo routes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub deployment: Deployment,
}
