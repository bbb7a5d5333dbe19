//! HTTP client for the pm2 sidecar

use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use tracing::{debug, warn};

use crate::errors::AgentError;

/// Status, content type and body of a sidecar reply, passed through as-is
#[derive(Debug, Clone)]
pub struct SidecarResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

/// Client for the local pm2 sidecar
#[derive(Clone)]
pub struct SidecarClient {
    client: Client,
    base_url: String,
}

impl SidecarClient {
    /// Create a new client. `base_url` has no trailing slash.
    pub fn new(base_url: &str) -> Result<Self, AgentError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `<base_url>/<path>`. Connection failures map to
    /// [`AgentError::SidecarUnavailable`], any reply is returned unchanged.
    pub async fn get(&self, path: &str) -> Result<SidecarResponse, AgentError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("pm2 sidecar request failed: {}", e);
            AgentError::SidecarUnavailable(format!("{url}: {e}"))
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::SidecarUnavailable(format!("{url}: {e}")))?;

        Ok(SidecarResponse {
            status,
            content_type,
            body,
        })
    }
}
