//! Container runtime state, as reported by `docker ... --format '{{json .}}'`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    Created,
    Restarting,
    Running,
    Removing,
    Paused,
    Exited,
    Dead,
    #[serde(other)]
    Unknown,
}

/// Name, state and status line of a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicContainerInfo {
    pub name: String,
    pub state: ContainerState,
    pub status: Option<String>,
}

/// Inspect result for a single container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContainerStatus {
    Deployed(BasicContainerInfo),
    NotDeployed(NotDeployed),
}

/// Serializes as the string `"not deployed"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotDeployed {
    #[serde(rename = "not deployed")]
    NotDeployed,
}

/// A locally cached image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Tag")]
    pub tag: String,
    #[serde(rename = "Size", default)]
    pub size: String,
    #[serde(rename = "CreatedSince", default)]
    pub created_since: String,
}

/// A docker network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerNetwork {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Scope", default)]
    pub scope: String,
}

/// Request body of the network create route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNetworkRequest {
    pub name: String,
    #[serde(default)]
    pub driver: Option<String>,
}
