//! Router tests against a recording executor

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use periphery::command::fake::RecordingExecutor;
use periphery::server::build_router;
use serde_json::json;
use tower::ServiceExt;

use crate::common::{body_json, body_text, get, post_json, test_service};

const PS_OUTPUT: &str = r#"{"Names":"web","State":"running","Status":"Up 5 minutes"}"#;

fn router(executor: Arc<RecordingExecutor>) -> (axum::Router, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let app = build_router(test_service(tmp.path(), executor));
    (app, tmp)
}

#[tokio::test]
async fn test_missing_passkey_is_forbidden() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, _tmp) = router(executor.clone());

    let request = Request::builder()
        .uri("/containers")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_text(response).await, "request not authorized");
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_wrong_passkey_is_forbidden() {
    let (app, _tmp) = router(Arc::new(RecordingExecutor::new()));

    let request = Request::builder()
        .uri("/status")
        .header("authorization", "Bearer test-passkey")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_status() {
    let (app, _tmp) = router(Arc::new(RecordingExecutor::new()));

    let response = app.oneshot(get("/status")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_list_containers_and_status() {
    let executor = Arc::new(RecordingExecutor::new().respond("docker ps -a", PS_OUTPUT));
    let (app, _tmp) = router(executor);

    let response = app.clone().oneshot(get("/containers")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json[0]["name"], "web");
    assert_eq!(json[0]["state"], "running");

    let response = app.clone().oneshot(get("/container/web")).await.unwrap();
    assert_eq!(body_json(response).await["status"], "Up 5 minutes");

    let response = app.oneshot(get("/container/db")).await.unwrap();
    assert_eq!(body_json(response).await, json!("not deployed"));
}

#[tokio::test]
async fn test_docker_unreachable_is_server_error() {
    let executor = Arc::new(RecordingExecutor::new().fail("docker ps", "Cannot connect to the Docker daemon"));
    let (app, _tmp) = router(executor);

    let response = app.oneshot(get("/containers")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_container_log_default_tail() {
    let executor = Arc::new(RecordingExecutor::new().respond("docker logs", "started"));
    let (app, _tmp) = router(executor.clone());

    let response = app.clone().oneshot(get("/container/web/log")).await.unwrap();
    assert_eq!(body_json(response).await["stdout"], "started");

    app.oneshot(get("/container/web/log?tail=200")).await.unwrap();
    assert_eq!(
        executor.executed(),
        vec!["docker logs web --tail 50", "docker logs web --tail 200"]
    );
}

#[tokio::test]
async fn test_deploy_bare_spec() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, _tmp) = router(executor.clone());

    let response = app
        .oneshot(post_json(
            "/deploy",
            json!({ "deployment": { "name": "web", "image": "nginx" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["command"], "docker pull nginx && docker run -d --name web nginx");
    assert_eq!(json["success"], true);
    assert_eq!(
        executor.executed()[0],
        "docker stop web && docker container rm web"
    );
}

#[tokio::test]
async fn test_deploy_image_override_and_login() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, _tmp) = router(executor.clone());

    let response = app
        .oneshot(post_json(
            "/deploy?image=registry.local/web",
            json!({ "deployment": {
                "name": "web",
                "image": "nginx",
                "dockerAccount": "deployer",
                "restart": "on-failure"
            } }),
        ))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(
        json["command"],
        "docker login -u deployer -p <PASSWORD> && docker pull registry.local/web && \
         docker run -d --name web --restart=on-failure:10 registry.local/web"
    );
    assert!(executor.executed()[1].contains("-p registry-pw"));
}

#[tokio::test]
async fn test_deploy_without_image_is_bad_request() {
    let (app, _tmp) = router(Arc::new(RecordingExecutor::new()));

    let response = app
        .oneshot(post_json("/deploy", json!({ "deployment": { "name": "web" } })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _tmp) = router(Arc::new(RecordingExecutor::new()));

    let response = app
        .oneshot(post_json("/repo/clone", json!({ "nope": true })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clone_with_account_token_is_redacted() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, tmp) = router(executor.clone());

    let response = app
        .oneshot(post_json(
            "/repo/clone",
            json!({ "deployment": {
                "name": "Web App",
                "repo": "acme/web",
                "githubAccount": "acme-bot"
            } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let target = tmp.path().join("repos").join("web_app");
    assert_eq!(
        json["phases"][0]["command"],
        format!("git clone https://<TOKEN>@github.com/acme/web.git {}", target.display())
    );
    assert!(!json.to_string().contains("ghp_secret"));
    assert!(executor.executed()[0].contains("https://ghp_secret@github.com/acme/web.git"));
}

#[tokio::test]
async fn test_pull_and_delete_repo() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, tmp) = router(executor.clone());
    let deployment = json!({ "deployment": { "name": "web", "repo": "acme/web", "branch": "main" } });

    let response = app
        .clone()
        .oneshot(post_json("/repo/pull", deployment.clone()))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["phases"][0]["stage"], "pull");
    let target = tmp.path().join("repos").join("web");
    assert_eq!(
        executor.executed()[0],
        format!("cd {} && git pull origin main", target.display())
    );

    let response = app.oneshot(post_json("/repo/delete", deployment)).await.unwrap();
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["phases"][0]["stage"], "delete");
}

#[tokio::test]
async fn test_build_clones_then_builds() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, tmp) = router(executor.clone());

    let response = app
        .oneshot(post_json(
            "/build",
            json!({ "build": {
                "name": "api",
                "repo": "acme/api",
                "dockerBuildArgs": { "buildPath": "server", "dockerfilePath": "Dockerfile" }
            } }),
        ))
        .await
        .unwrap();

    let json = body_json(response).await;
    let stages: Vec<&str> = json["phases"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["stage"].as_str().unwrap())
        .collect();
    assert_eq!(stages, vec!["clone", "latest commit", "build"]);
    let checkout = tmp.path().join("repos").join("api").join("server");
    assert_eq!(
        json["phases"][2]["command"],
        format!(
            "cd {} && docker build -t registry.local/api -f Dockerfile . && docker push registry.local/api",
            checkout.display()
        )
    );
}

#[tokio::test]
async fn test_failed_clone_skips_build() {
    let executor = Arc::new(RecordingExecutor::new().fail("git clone", "repository not found"));
    let (app, _tmp) = router(executor.clone());

    let response = app
        .oneshot(post_json(
            "/build",
            json!({ "build": { "name": "api", "repo": "acme/api", "dockerBuildArgs": {} } }),
        ))
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["phases"].as_array().unwrap().len(), 1);
    assert!(!executor.executed().iter().any(|c| c.contains("docker build")));
}

#[tokio::test]
async fn test_build_with_dot_name_is_bad_request() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, _tmp) = router(executor.clone());

    for name in ["..", "."] {
        let response = app
            .clone()
            .oneshot(post_json(
                "/build",
                json!({ "build": { "name": name, "repo": "acme/api", "dockerBuildArgs": {} } }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn test_network_routes() {
    let executor = Arc::new(RecordingExecutor::new());
    let (app, _tmp) = router(executor.clone());

    app.clone()
        .oneshot(post_json("/network", json!({ "name": "backend", "driver": "bridge" })))
        .await
        .unwrap();
    let request = Request::builder()
        .method("DELETE")
        .uri("/network/backend")
        .header("authorization", crate::common::PASSKEY)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap();
    app.oneshot(get("/networks/prune")).await.unwrap();

    assert_eq!(
        executor.executed(),
        vec![
            "docker network create -d bridge backend",
            "docker network rm backend",
            "docker network prune -f",
        ]
    );
}

#[tokio::test]
async fn test_prune_images() {
    let executor = Arc::new(RecordingExecutor::new().respond("image prune", "Total reclaimed space: 1GB"));
    let (app, _tmp) = router(executor);

    let response = app.oneshot(get("/images/prune")).await.unwrap();

    let json = body_json(response).await;
    assert_eq!(json["command"], "docker image prune -a -f");
    assert_eq!(json["stdout"], "Total reclaimed space: 1GB");
}

#[tokio::test]
async fn test_pm2_errors() {
    let (app, _tmp) = router(Arc::new(RecordingExecutor::new()));

    let response = app.clone().oneshot(get("/pm2/stop")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.clone().oneshot(get("/pm2/flush/api")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/pm2/processes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
