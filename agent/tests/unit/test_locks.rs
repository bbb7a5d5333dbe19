//! Concurrent requests on the same checkout or container are serialized

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use periphery::command::{CommandLine, CommandResult, Executor};
use periphery::server::build_router;
use serde_json::json;
use tokio::sync::Barrier;
use tower::ServiceExt;

use crate::common::{post_json, test_service};

/// Tracks how many commands run at once. Optionally waits on a barrier
/// before finishing a `git clone`.
struct SlowExecutor {
    active: AtomicUsize,
    max_active: AtomicUsize,
    clone_barrier: Option<Barrier>,
}

impl SlowExecutor {
    fn new(clone_barrier: Option<Barrier>) -> Self {
        Self {
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            clone_barrier,
        }
    }
}

#[async_trait]
impl Executor for SlowExecutor {
    async fn execute(&self, command: &CommandLine) -> CommandResult {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let rendered = command.to_string();
        match &self.clone_barrier {
            Some(barrier) if rendered.starts_with("git clone") => {
                barrier.wait().await;
            }
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }

        self.active.fetch_sub(1, Ordering::SeqCst);
        CommandResult::simple(rendered, "")
    }
}

fn clone_request(name: &str) -> axum::http::Request<axum::body::Body> {
    post_json(
        "/repo/clone",
        json!({ "deployment": { "name": name, "repo": "acme/app" } }),
    )
}

#[tokio::test]
async fn test_concurrent_clones_of_same_target_are_serialized() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = Arc::new(SlowExecutor::new(None));
    let app = build_router(test_service(tmp.path(), executor.clone()));

    let (a, b, c) = tokio::join!(
        app.clone().oneshot(clone_request("app")),
        app.clone().oneshot(clone_request("app")),
        app.clone().oneshot(clone_request("app")),
    );

    for response in [a, b, c] {
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }
    assert_eq!(executor.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_clones_of_different_targets_run_in_parallel() {
    let tmp = tempfile::tempdir().unwrap();
    // both clones must be in flight at once for the barrier to open
    let executor = Arc::new(SlowExecutor::new(Some(Barrier::new(2))));
    let app = build_router(test_service(tmp.path(), executor.clone()));

    let both = async {
        futures::future::join(
            app.clone().oneshot(clone_request("app-a")),
            app.clone().oneshot(clone_request("app-b")),
        )
        .await
    };
    let (a, b) = tokio::time::timeout(Duration::from_secs(5), both)
        .await
        .expect("clones of different targets blocked each other");

    tokio_test::assert_ok!(a);
    tokio_test::assert_ok!(b);
    assert_eq!(executor.max_active.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_deploys_of_same_container_are_serialized() {
    let tmp = tempfile::tempdir().unwrap();
    let executor = Arc::new(SlowExecutor::new(None));
    let app = build_router(test_service(tmp.path(), executor.clone()));
    let deploy = || {
        post_json(
            "/deploy",
            json!({ "deployment": { "name": "web", "image": "nginx" } }),
        )
    };

    let (a, b) = tokio::join!(app.clone().oneshot(deploy()), app.clone().oneshot(deploy()));

    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);
    assert_eq!(executor.max_active.load(Ordering::SeqCst), 1);
}
