//! Error types for the periphery agent

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the periphery agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("request not authorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Secrets error: {0}")]
    SecretsError(String),

    #[error("Docker error: {0}")]
    DockerError(String),

    #[error("Sidecar unavailable: {0}")]
    SidecarUnavailable(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Internal(format!("{err:#}"))
    }
}

impl AgentError {
    /// HTTP status the error maps to when it reaches a handler boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            AgentError::Unauthorized => StatusCode::FORBIDDEN,
            AgentError::BadRequest(_) | AgentError::JsonError(_) => StatusCode::BAD_REQUEST,
            AgentError::NotFound(_) => StatusCode::NOT_FOUND,
            AgentError::SidecarUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AgentError::Unauthorized.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AgentError::BadRequest("missing name".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AgentError::SidecarUnavailable("refused".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AgentError::DockerError("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_message_is_fixed() {
        assert_eq!(AgentError::Unauthorized.to_string(), "request not authorized");
    }
}
