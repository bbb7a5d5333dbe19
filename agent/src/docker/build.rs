//! Image build command construction

use std::path::Path;

use secrecy::ExposeSecret;

use crate::command::CommandLine;
use crate::config::AgentConfig;
use crate::docker::run::{checkout_name, RegistryLogin};
use crate::errors::AgentError;
use crate::filesys::join_relative;
use crate::models::{Build, SystemCommand};

/// Everything needed to build and push one image from a checked out repo
pub struct BuildSpec {
    /// Image name, also the name of the checkout folder
    pub name: String,
    /// Build context relative to the checkout
    pub build_path: String,
    /// Dockerfile relative to the build context
    pub dockerfile_path: Option<String>,
    /// Custom build script, replaces `docker build` and `docker push`
    pub cli_build: Option<SystemCommand>,
    pub login: Option<RegistryLogin>,
}

impl BuildSpec {
    pub fn from_build(build: &Build, config: &AgentConfig) -> Result<Self, AgentError> {
        let name = checkout_name(&build.name)?;
        let args = build.docker_build_args.clone().unwrap_or_default();
        let cli_build = build.cli_build.clone().filter(|c| !c.is_empty());
        if cli_build.is_none() && build.docker_build_args.is_none() {
            return Err(AgentError::BadRequest(
                "build needs either docker build args or a cli build".into(),
            ));
        }
        Ok(Self {
            name,
            build_path: args.build_path,
            dockerfile_path: args.dockerfile_path,
            cli_build,
            login: RegistryLogin::resolve(build.docker_account.as_deref(), config),
        })
    }

    /// Registry password, if a login step is part of the command
    pub fn secret(&self) -> Option<&str> {
        self.login.as_ref().map(|l| l.password.expose_secret())
    }
}

/// Tag an image is built and pushed under
pub fn image_tag(registry_url: &str, name: &str) -> String {
    format!("{registry_url}{name}")
}

/// `[docker login &&] cd <repo>/<name>/<buildPath> && docker build -t <tag> [-f <dockerfile>] . && docker push <tag>`
pub fn docker_build_command(spec: &BuildSpec, repo_dir: &Path, registry_url: &str) -> CommandLine {
    let checkout = repo_dir.join(&spec.name);
    let line = match &spec.login {
        Some(login) => login.command(),
        None => CommandLine::new(),
    };

    if let Some(cli) = &spec.cli_build {
        return line
            .cd(join_relative(&checkout, &cli.path))
            .shell(cli.command.trim());
    }

    let tag = image_tag(registry_url, &spec.name);
    let mut args = vec!["build".to_string(), "-t".to_string(), tag.clone()];
    if let Some(dockerfile) = spec
        .dockerfile_path
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        args.push("-f".to_string());
        args.push(dockerfile.to_string());
    }
    args.push(".".to_string());

    line.cd(join_relative(&checkout, &spec.build_path))
        .exec("docker", args)
        .exec("docker", ["push", tag.as_str()])
}
