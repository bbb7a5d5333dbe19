//! Repository clone, pull and delete

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};
use url::Url;

use crate::command::{CombinedLog, CommandLine, CommandResult, Executor, TOKEN_PLACEHOLDER};
use crate::config::AgentConfig;
use crate::docker::run::{checkout_name, deployment_container_name};
use crate::errors::AgentError;
use crate::filesys::dir::Dir;
use crate::filesys::join_relative;
use crate::models::{Build, Deployment, SystemCommand};

/// Branch used when none is given
pub const DEFAULT_BRANCH: &str = "master";

pub const STAGE_CLONE: &str = "clone";
pub const STAGE_PULL: &str = "pull";
pub const STAGE_ON_CLONE: &str = "on clone";
pub const STAGE_ON_PULL: &str = "on pull";
pub const STAGE_DELETE: &str = "delete";
pub const STAGE_LATEST_COMMIT: &str = "latest commit";

/// Everything needed to check out one repository
pub struct RepoSpec {
    /// `owner/name`
    pub repo: String,
    pub branch: Option<String>,
    /// Only check out this folder
    pub subfolder: Option<String>,
    pub token: Option<SecretString>,
    pub on_clone: Option<SystemCommand>,
    pub on_pull: Option<SystemCommand>,
    /// Checkout directory
    pub target: PathBuf,
}

impl RepoSpec {
    pub fn new(repo: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            repo: repo.into(),
            branch: None,
            subfolder: None,
            token: None,
            on_clone: None,
            on_pull: None,
            target: target.into(),
        }
    }

    /// Checkout of a deployment, placed at `<repo_dir>/<container name>`
    pub fn from_deployment(deployment: &Deployment, config: &AgentConfig) -> Result<Self, AgentError> {
        let repo = required_repo(deployment.repo.as_deref())?;
        let target = config.repo_dir.join(deployment_container_name(deployment)?);
        Ok(Self {
            repo,
            branch: deployment.branch.clone(),
            subfolder: deployment.subfolder.clone(),
            token: resolve_token(
                deployment.access_token.as_deref(),
                deployment.github_account.as_deref(),
                config,
            ),
            on_clone: deployment.on_clone.clone(),
            on_pull: deployment.on_pull.clone(),
            target,
        })
    }

    /// Checkout of a build, placed at `<repo_dir>/<image name>`
    pub fn from_build(build: &Build, config: &AgentConfig) -> Result<Self, AgentError> {
        let repo = required_repo(build.repo.as_deref())?;
        let name = checkout_name(&build.name)?;
        Ok(Self {
            repo,
            branch: build.branch.clone(),
            subfolder: None,
            token: resolve_token(
                build.access_token.as_deref(),
                build.github_account.as_deref(),
                config,
            ),
            on_clone: build.on_clone.clone(),
            on_pull: None,
            target: config.repo_dir.join(name),
        })
    }

    /// Requested branch, or `master`
    pub fn branch(&self) -> &str {
        self.branch
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BRANCH)
    }

    fn explicit_branch(&self) -> Option<&str> {
        Some(self.branch()).filter(|b| *b != DEFAULT_BRANCH)
    }

    fn subfolder(&self) -> Option<&str> {
        self.subfolder
            .as_deref()
            .map(|s| s.trim().trim_matches('/'))
            .filter(|s| !s.is_empty())
    }
}

fn required_repo(repo: Option<&str>) -> Result<String, AgentError> {
    let repo = repo
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AgentError::BadRequest("no repository given".into()))?;
    if repo.chars().any(char::is_whitespace) || repo.starts_with('-') {
        return Err(AgentError::BadRequest(format!("invalid repository {repo}")));
    }
    Ok(repo.to_string())
}

/// An explicit token wins over the account's token from the secrets file
fn resolve_token(
    explicit: Option<&str>,
    account: Option<&str>,
    config: &AgentConfig,
) -> Option<SecretString> {
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        return Some(SecretString::from(token.to_string()));
    }
    let account = account.filter(|a| !a.is_empty())?;
    let token = config.secrets.github_token(account).cloned();
    if token.is_none() {
        warn!("no token stored for git account {}, cloning anonymously", account);
    }
    token
}

/// `https://[<token>@]<host>/<repo>.git`
pub fn repo_url(host: &str, repo: &str, token: Option<&str>) -> Result<Url, AgentError> {
    let mut url = Url::parse(&format!("https://{host}/{repo}.git"))
        .map_err(|e| AgentError::BadRequest(format!("invalid repository url: {e}")))?;
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        url.set_username(token)
            .map_err(|_| AgentError::BadRequest("repository url cannot carry a token".into()))?;
    }
    Ok(url)
}

/// `git clone <url> <target> [-b <branch>]`, or the sparse variant when a
/// subfolder is set
pub fn clone_command(spec: &RepoSpec, url: &Url) -> CommandLine {
    let target = spec.target.display().to_string();
    let mut clone = vec!["clone".to_string()];
    if spec.subfolder().is_some() {
        clone.push("--no-checkout".to_string());
    }
    clone.push(url.to_string());
    clone.push(target);
    if let Some(branch) = spec.explicit_branch() {
        clone.push("-b".to_string());
        clone.push(branch.to_string());
    }

    let line = CommandLine::new().exec("git", clone);
    match spec.subfolder() {
        Some(subfolder) => line
            .cd(&spec.target)
            .exec("git", ["sparse-checkout", "init", "--cone"])
            .exec("git", ["sparse-checkout", "set", subfolder])
            .exec("git", ["read-tree", "-mu", "HEAD"]),
        None => line,
    }
}

/// `cd <target> && git pull origin <branch>`
pub fn pull_command(spec: &RepoSpec) -> CommandLine {
    CommandLine::new()
        .cd(&spec.target)
        .exec("git", ["pull", "origin", spec.branch()])
}

/// `cd <target>/<path> && <command>`
pub fn hook_command(target: &Path, hook: &SystemCommand) -> CommandLine {
    CommandLine::new()
        .cd(join_relative(target, &hook.path))
        .shell(hook.command.trim())
}

/// Clones, pulls and deletes repository checkouts
#[derive(Clone)]
pub struct RepoManager {
    executor: Arc<dyn Executor>,
    git_host: String,
}

impl RepoManager {
    pub fn new(executor: Arc<dyn Executor>, git_host: impl Into<String>) -> Self {
        Self {
            executor,
            git_host: git_host.into(),
        }
    }

    /// Remove the target, clone, then run the clone and pull hooks
    pub async fn clone_repo(&self, spec: &RepoSpec) -> Result<CombinedLog, AgentError> {
        let token = spec.token.as_ref().map(|t| t.expose_secret());
        let url = repo_url(&self.git_host, &spec.repo, token)?;

        remove_checkout(&spec.target).await;

        info!("cloning {} into {}", spec.repo, spec.target.display());
        let result = self.executor.execute(&clone_command(spec, &url)).await;
        let result = redact_token(result, token, &url);

        let mut log = CombinedLog::new();
        log.push(STAGE_CLONE, result);
        if !log.last_succeeded() {
            warn!("clone of {} failed", spec.repo);
            return Ok(log);
        }

        if self.run_hook(&mut log, STAGE_ON_CLONE, spec, spec.on_clone.as_ref()).await {
            self.run_hook(&mut log, STAGE_ON_PULL, spec, spec.on_pull.as_ref()).await;
        }
        log.push(STAGE_LATEST_COMMIT, self.latest_commit(&spec.target).await);
        Ok(log)
    }

    /// Pull the configured branch, then run the pull hook
    pub async fn pull_repo(&self, spec: &RepoSpec) -> Result<CombinedLog, AgentError> {
        let token = spec.token.as_ref().map(|t| t.expose_secret());
        let url = repo_url(&self.git_host, &spec.repo, token)?;

        info!("pulling {} in {}", spec.repo, spec.target.display());
        let result = self.executor.execute(&pull_command(spec)).await;
        let result = redact_token(result, token, &url);

        let mut log = CombinedLog::new();
        log.push(STAGE_PULL, result);
        if !log.last_succeeded() {
            warn!("pull of {} failed", spec.repo);
            return Ok(log);
        }

        self.run_hook(&mut log, STAGE_ON_PULL, spec, spec.on_pull.as_ref()).await;
        log.push(STAGE_LATEST_COMMIT, self.latest_commit(&spec.target).await);
        Ok(log)
    }

    /// Remove the checkout. Always successful.
    pub async fn delete_repo(&self, target: &Path) -> CombinedLog {
        remove_checkout(target).await;
        let mut log = CombinedLog::new();
        log.push(
            STAGE_DELETE,
            CommandResult::simple(
                format!("rm -rf {}", target.display()),
                format!("deleted {}", target.display()),
            ),
        );
        log
    }

    /// `git rev-parse --short HEAD && git log -1 --pretty=%B`
    pub async fn latest_commit(&self, target: &Path) -> CommandResult {
        let line = CommandLine::new()
            .cd(target)
            .exec("git", ["rev-parse", "--short", "HEAD"])
            .exec("git", ["log", "-1", "--pretty=%B"]);
        self.executor.execute(&line).await
    }

    /// Run a hook if one is set. Returns whether the chain may continue.
    async fn run_hook(
        &self,
        log: &mut CombinedLog,
        stage: &str,
        spec: &RepoSpec,
        hook: Option<&SystemCommand>,
    ) -> bool {
        let Some(hook) = hook.filter(|h| !h.is_empty()) else {
            return true;
        };
        debug!("running {} hook for {}", stage, spec.repo);
        let result = self
            .executor
            .execute(&hook_command(&spec.target, hook))
            .await;
        log.push(stage, result);
        log.last_succeeded()
    }
}

async fn remove_checkout(target: &Path) {
    if let Err(e) = Dir::new(target).delete().await {
        debug!("could not remove {}: {}", target.display(), e);
    }
}

/// Hide the token, in raw and url-encoded form
fn redact_token(result: CommandResult, token: Option<&str>, url: &Url) -> CommandResult {
    match token {
        Some(token) => result
            .redact(token, TOKEN_PLACEHOLDER)
            .redact(url.username(), TOKEN_PLACEHOLDER),
        None => result,
    }
}
