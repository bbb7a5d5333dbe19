//! Container runtime: command builders and the docker CLI client

pub mod build;
pub mod client;
pub mod run;

pub use build::{docker_build_command, BuildSpec};
pub use client::DockerClient;
pub use run::{docker_run_command, parse_container_name, RegistryLogin, RunSpec};
