//! Changelog reports for controller payloads

use periphery::changelog::{build_changelog, deployment_changelog, server_changelog, NO_CHANGES};
use periphery::models::{Build, Deployment, Server};
use serde_json::json;

fn deployment(value: serde_json::Value) -> Deployment {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_same_deployment_has_no_changes() {
    let d = deployment(json!({
        "name": "web",
        "image": "nginx",
        "ports": [{ "local": "80", "container": "80" }],
        "volumes": [{ "local": "data", "container": "/data", "useSystemRoot": true }],
        "environment": [{ "variable": "A", "value": "1" }]
    }));
    assert_eq!(deployment_changelog(&d, &d).unwrap(), NO_CHANGES);
}

#[test]
fn test_deployment_update_report() {
    let old = deployment(json!({
        "name": "web",
        "image": "nginx",
        "restart": "always",
        "ports": [{ "local": "80", "container": "80" }, { "local": "443", "container": "443" }],
        "environment": [{ "variable": "A", "value": "1" }, { "variable": "B", "value": "2" }]
    }));
    let new = deployment(json!({
        "name": "web",
        "image": "nginx",
        "restart": "unless-stopped",
        "ports": [{ "local": "80", "container": "8080" }],
        "environment": [{ "variable": "A", "value": "1" }, { "variable": "B", "value": "3" }, { "variable": "C", "value": "4" }]
    }));

    assert_eq!(
        deployment_changelog(&old, &new).unwrap(),
        "Changelog:\n\n\
         Ports:\n\tChanges:\n\t\t80: 80 -> 8080, \n\tDeletions:\n\t\t443: 443, \n\
         Environment:\n\tAdditions:\n\t\tC: 4, \n\tChanges:\n\t\tB: 2 -> 3, \n\
         restart: \"always\" -> \"unless-stopped\", \n\n"
    );
}

#[test]
fn test_environment_additions_changes_and_deletions() {
    let old = deployment(json!({
        "name": "web",
        "environment": [{ "variable": "A", "value": "1" }, { "variable": "B", "value": "2" }]
    }));
    let new = deployment(json!({
        "name": "web",
        "environment": [{ "variable": "B", "value": "3" }, { "variable": "C", "value": "4" }]
    }));

    assert_eq!(
        deployment_changelog(&old, &new).unwrap(),
        "Changelog:\n\n\
         Environment:\n\tAdditions:\n\t\tC: 4, \n\tChanges:\n\t\tB: 2 -> 3, \n\tDeletions:\n\t\tA: 1, \n"
    );
}

#[test]
fn test_build_branch_change() {
    let old: Build = serde_json::from_value(json!({ "name": "api", "branch": "master" })).unwrap();
    let new: Build = serde_json::from_value(json!({ "name": "api", "branch": "develop" })).unwrap();
    assert_eq!(
        build_changelog(&old, &new).unwrap(),
        "Changelog:\n\nbranch: \"master\" -> \"develop\", \n\n"
    );
}

#[test]
fn test_server_alert_thresholds() {
    let old: Server = serde_json::from_value(json!({ "name": "edge", "cpuAlert": 50.0 })).unwrap();
    let new: Server = serde_json::from_value(json!({ "name": "edge", "cpuAlert": 75.0, "toNotify": ["ops"] })).unwrap();
    assert_eq!(
        server_changelog(&old, &new).unwrap(),
        "Changelog:\n\ntoNotify: [] -> [\n  \"ops\"\n], \n\ncpuAlert: 50 -> 75, \n\n"
    );
}
