//! Server models

use serde::{Deserialize, Serialize};

/// A managed server as stored by the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub to_notify: Vec<String>,

    #[serde(default)]
    pub cpu_alert: Option<f64>,

    #[serde(default)]
    pub mem_alert: Option<f64>,

    #[serde(default)]
    pub disk_alert: Option<f64>,
}
