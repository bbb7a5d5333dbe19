//! Environment variables consumed by the agent

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AgentError;
use crate::logs::LogLevel;

pub const DEFAULT_SECRETS_PATH: &str = "/secrets/secrets.json";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SYSROOT: &str = "/home/ubuntu/";
pub const DEFAULT_GIT_HOST: &str = "github.com";
pub const DEFAULT_PM2_URL: &str = "http://127.0.0.1:8001";

/// Raw environment, parsed but not yet combined with the secrets file
#[derive(Debug, Clone, PartialEq)]
pub struct Env {
    /// `SECRETS_PATH`
    pub secrets_path: PathBuf,

    /// `PORT`
    pub port: u16,

    /// `REGISTRY_URL`, prefixed to built image names
    pub registry_url: String,

    /// `SYSROOT`, root of bind-mount host paths. Always ends with `/`.
    pub sysroot: String,

    /// `REPO_DIR`, where repositories are cloned. Defaults to `<SYSROOT>repos/`.
    pub repo_dir: PathBuf,

    /// `GIT_HOST`
    pub git_host: String,

    /// `PM2_URL`, base url of the local pm2 sidecar
    pub pm2_url: String,

    /// `LOG_LEVEL`
    pub log_level: LogLevel,

    /// `LOG_DIR`
    pub log_dir: Option<PathBuf>,

    /// `LOG_JSON`
    pub log_json: bool,

    /// `COMMAND_TIMEOUT_SECS`, unset or 0 disables the timeout
    pub command_timeout: Option<Duration>,
}

impl Env {
    /// Read from the process environment
    pub fn load() -> Result<Self, AgentError> {
        Self::from_vars(std::env::vars())
    }

    /// Read from an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self, AgentError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim().to_string());

        let port = match get("PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| AgentError::ConfigError(format!("PORT is not a valid port: {port}")))?,
            None => DEFAULT_PORT,
        };

        let sysroot = with_trailing_slash(get("SYSROOT").unwrap_or_else(|| DEFAULT_SYSROOT.to_string()));

        let repo_dir = get("REPO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{sysroot}repos/")));

        let registry_url = get("REGISTRY_URL").map(with_trailing_slash).unwrap_or_default();

        let log_level = match get("LOG_LEVEL") {
            Some(level) => level.parse().map_err(AgentError::ConfigError)?,
            None => LogLevel::default(),
        };

        let log_json = match get("LOG_JSON") {
            Some(flag) => parse_bool("LOG_JSON", &flag)?,
            None => false,
        };

        let command_timeout = match get("COMMAND_TIMEOUT_SECS") {
            Some(secs) => {
                let secs: u64 = secs.parse().map_err(|_| {
                    AgentError::ConfigError(format!("COMMAND_TIMEOUT_SECS is not a number: {secs}"))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            secrets_path: get("SECRETS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH)),
            port,
            registry_url,
            sysroot,
            repo_dir,
            git_host: get("GIT_HOST").unwrap_or_else(|| DEFAULT_GIT_HOST.to_string()),
            pm2_url: get("PM2_URL")
                .unwrap_or_else(|| DEFAULT_PM2_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            log_level,
            log_dir: get("LOG_DIR").map(PathBuf::from),
            log_json,
            command_timeout,
        })
    }
}

fn with_trailing_slash(mut s: String) -> String {
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AgentError> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(AgentError::ConfigError(format!("{key} is not a boolean: {value}"))),
    }
}
