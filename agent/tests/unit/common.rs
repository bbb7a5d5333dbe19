//! Shared fixtures

use std::path::Path;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use periphery::command::Executor;
use periphery::config::{AgentConfig, Env, Secrets};
use periphery::server::AgentService;

pub const PASSKEY: &str = "test-passkey";

pub const SECRETS: &str = r#"{
    "passkey": "test-passkey",
    "docker_accounts": { "deployer": "registry-pw" },
    "github_accounts": { "acme-bot": "ghp_secret" }
}"#;

/// Config rooted in `root`, with the pm2 sidecar pointing at a closed port
pub fn test_config(root: &Path) -> AgentConfig {
    let env = Env::from_vars([
        ("SYSROOT".to_string(), format!("{}/", root.display())),
        ("REPO_DIR".to_string(), root.join("repos").display().to_string()),
        ("PM2_URL".to_string(), "http://127.0.0.1:9".to_string()),
        ("REGISTRY_URL".to_string(), "registry.local".to_string()),
    ])
    .unwrap();
    AgentConfig::new(&env, Secrets::from_json(SECRETS).unwrap())
}

pub fn test_service(root: &Path, executor: Arc<dyn Executor>) -> Arc<AgentService> {
    Arc::new(AgentService::new(Arc::new(test_config(root)), executor).unwrap())
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", PASSKEY)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", PASSKEY)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
