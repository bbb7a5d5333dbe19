//! Wire models shared with the controller

pub mod build;
pub mod container;
pub mod deployment;
pub mod server;

pub use build::{Build, BuildRequest, DockerBuildArgs};
pub use container::{
    BasicContainerInfo, ContainerState, ContainerStatus, CreateNetworkRequest, DockerNetwork,
    ImageSummary, NotDeployed,
};
pub use deployment::{
    Conversion, Deployment, DeploymentRequest, EnvironmentVar, RestartMode, SystemCommand,
    VolumeMount,
};
pub use server::Server;
