//! Build models

use serde::{Deserialize, Serialize};

use crate::models::deployment::SystemCommand;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerBuildArgs {
    /// Build context, relative to the repository root
    #[serde(default)]
    pub build_path: String,

    /// Dockerfile, relative to the build context
    #[serde(default)]
    pub dockerfile_path: Option<String>,
}

/// A build as sent by the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Image name, also the checkout folder name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub repo: Option<String>,

    #[serde(default)]
    pub branch: Option<String>,

    #[serde(default)]
    pub github_account: Option<String>,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub on_clone: Option<SystemCommand>,

    /// Custom build command, run instead of `docker build`
    #[serde(default)]
    pub cli_build: Option<SystemCommand>,

    #[serde(default)]
    pub docker_build_args: Option<DockerBuildArgs>,

    #[serde(default)]
    pub docker_account: Option<String>,
}

/// Request body of the build route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    pub build: Build,
}
