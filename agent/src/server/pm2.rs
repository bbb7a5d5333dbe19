//! pm2 sidecar passthrough

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::errors::AgentError;
use crate::server::state::AgentService;

/// Sidecar actions that address a single process
const PROCESS_ACTIONS: &[&str] = &["log", "start", "stop", "restart", "delete"];

/// Map a passthrough path onto the sidecar path
pub fn sidecar_path(path: &str) -> Result<String, AgentError> {
    let mut parts = path.trim_matches('/').splitn(2, '/');
    let action = parts.next().unwrap_or_default();
    let name = parts.next().map(|n| n.trim_matches('/')).unwrap_or_default();

    match action {
        "processes" => Ok("processes".to_string()),
        action if PROCESS_ACTIONS.contains(&action) => {
            if name.is_empty() {
                Err(AgentError::BadRequest(format!("pm2 {action} needs a process name")))
            } else {
                Ok(format!("{action}/{name}"))
            }
        }
        other => Err(AgentError::NotFound(format!("unknown pm2 action '{other}'"))),
    }
}

/// Forward `GET /pm2/<action>[/<name>]` and relay the sidecar's reply
pub async fn pm2_handler(
    State(service): State<Arc<AgentService>>,
    Path(path): Path<String>,
) -> Result<Response, AgentError> {
    let path = sidecar_path(&path)?;
    let reply = service.sidecar.get(&path).await?;

    let status = StatusCode::from_u16(reply.status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = reply
        .content_type
        .unwrap_or_else(|| "text/plain; charset=utf-8".to_string());
    Ok((status, [(header::CONTENT_TYPE, content_type)], reply.body).into_response())
}
