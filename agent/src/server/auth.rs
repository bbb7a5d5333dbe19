//! Passkey check for every route

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::errors::AgentError;
use crate::server::state::AgentService;

/// Reject requests whose `authorization` header is not exactly the passkey
pub async fn auth_request(
    State(service): State<Arc<AgentService>>,
    request: Request,
    next: Next,
) -> Result<Response, AgentError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| service.config.secrets.passkey_matches(value))
        .unwrap_or(false);

    if !authorized {
        debug!("rejected unauthorized request to {}", request.uri().path());
        return Err(AgentError::Unauthorized);
    }
    Ok(next.run(request).await)
}
