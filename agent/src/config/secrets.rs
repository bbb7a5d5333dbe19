//! Secrets file: passkey and per-account credentials

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::errors::AgentError;
use crate::filesys::file::File;

#[derive(Deserialize)]
struct RawSecrets {
    passkey: String,
    #[serde(default)]
    docker_accounts: HashMap<String, String>,
    #[serde(default)]
    github_accounts: HashMap<String, String>,
}

/// Loaded secrets. Values are never printed by `Debug`.
pub struct Secrets {
    passkey: SecretString,
    docker_accounts: HashMap<String, SecretString>,
    github_accounts: HashMap<String, SecretString>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("passkey", &"[REDACTED]")
            .field("docker_accounts", &self.docker_accounts.keys().collect::<Vec<_>>())
            .field("github_accounts", &self.github_accounts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Secrets {
    /// Load the secrets JSON file
    pub async fn load(file: &File) -> Result<Self, AgentError> {
        if !file.exists().await {
            return Err(AgentError::SecretsError(format!(
                "secrets file not found at {}",
                file.path().display()
            )));
        }
        let contents = file.read_string().await?;
        let secrets = Self::from_json(&contents)?;
        debug!("loaded secrets from {}: {:?}", file.path().display(), secrets);
        Ok(secrets)
    }

    pub fn from_json(contents: &str) -> Result<Self, AgentError> {
        let raw: RawSecrets = serde_json::from_str(contents)
            .map_err(|e| AgentError::SecretsError(format!("failed to parse secrets file: {e}")))?;
        if raw.passkey.is_empty() {
            return Err(AgentError::SecretsError("passkey must not be empty".into()));
        }
        Ok(Self {
            passkey: SecretString::from(raw.passkey),
            docker_accounts: into_secrets(raw.docker_accounts),
            github_accounts: into_secrets(raw.github_accounts),
        })
    }

    /// Whether `candidate` is exactly the passkey
    pub fn passkey_matches(&self, candidate: &str) -> bool {
        self.passkey.expose_secret() == candidate
    }

    /// Registry password for a docker account
    pub fn docker_password(&self, account: &str) -> Option<&SecretString> {
        self.docker_accounts.get(account)
    }

    /// Access token for a git account
    pub fn github_token(&self, account: &str) -> Option<&SecretString> {
        self.github_accounts.get(account)
    }
}

fn into_secrets(map: HashMap<String, String>) -> HashMap<String, SecretString> {
    map.into_iter()
        .map(|(account, secret)| (account, SecretString::from(secret)))
        .collect()
}
