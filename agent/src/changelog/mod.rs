//! Human readable change reports between two versions of a resource
//!
//! Only a fixed list of fields is compared per resource type. Scalar fields
//! are shown as pretty JSON `old -> new`. The `environment`, `ports` and
//! `volumes` lists are diffed by key into additions, changes and deletions.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::errors::AgentError;
use crate::models::{Build, Deployment, Server};

pub const NO_CHANGES: &str = "No Changes";
const HEADER: &str = "Changelog:\n\n";

/// A resource whose updates are reported field by field
pub trait Tracked: Serialize {
    /// Serialized field names compared, in report order
    const VIEWED_FIELDS: &'static [&'static str];
}

impl Tracked for Deployment {
    const VIEWED_FIELDS: &'static [&'static str] = &[
        "name",
        "image",
        "buildID",
        "ports",
        "volumes",
        "environment",
        "network",
        "restart",
        "containerUser",
        "postImage",
    ];
}

impl Tracked for Build {
    const VIEWED_FIELDS: &'static [&'static str] = &[
        "name",
        "repo",
        "branch",
        "onClone",
        "cliBuild",
        "dockerBuildArgs",
    ];
}

impl Tracked for Server {
    const VIEWED_FIELDS: &'static [&'static str] = &[
        "name",
        "address",
        "port",
        "enabled",
        "region",
        "toNotify",
        "cpuAlert",
        "memAlert",
        "diskAlert",
    ];
}

/// Change report between two versions of `T`
pub fn changelog<T: Tracked>(old: &T, new: &T) -> Result<String, AgentError> {
    let old = serde_json::to_value(old)?;
    let new = serde_json::to_value(new)?;
    Ok(changelog_values(&old, &new, T::VIEWED_FIELDS))
}

pub fn deployment_changelog(old: &Deployment, new: &Deployment) -> Result<String, AgentError> {
    changelog(old, new)
}

pub fn build_changelog(old: &Build, new: &Build) -> Result<String, AgentError> {
    changelog(old, new)
}

pub fn server_changelog(old: &Server, new: &Server) -> Result<String, AgentError> {
    changelog(old, new)
}

/// Change report between two JSON objects over `fields`
pub fn changelog_values(old: &Value, new: &Value, fields: &[&str]) -> String {
    let sections: Vec<String> = fields
        .iter()
        .filter_map(|field| {
            let before = old.get(field).unwrap_or(&Value::Null);
            let after = new.get(field).unwrap_or(&Value::Null);
            if before == after || (is_empty(before) && is_empty(after)) {
                return None;
            }
            let section = match KeyedList::for_field(field) {
                Some(list) => list.diff(before, after),
                None => format!("{field}: {} -> {}, \n\n", pretty(before), pretty(after)),
            };
            Some(section).filter(|s| !s.is_empty())
        })
        .collect();

    if sections.is_empty() {
        NO_CHANGES.to_string()
    } else {
        format!("{HEADER}{}", sections.concat())
    }
}

/// `null`, `""`, `false`, `0`, `[]` and `{}` count as unset
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn pretty(value: &Value) -> String {
    let value = whole_numbers(value);
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

/// Floats with no fractional part print as integers, `75.0` as `75`
fn whole_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0)
            .map(|f| Value::from(f as i64))
            .unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(whole_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), whole_numbers(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => whole_numbers(other).to_string(),
    }
}

/// A list field diffed by key
struct KeyedList {
    title: &'static str,
    key: &'static str,
    value: fn(&Value) -> String,
}

impl KeyedList {
    fn for_field(field: &str) -> Option<Self> {
        match field {
            "environment" => Some(Self {
                title: "Environment",
                key: "variable",
                value: |item| text(item.get("value")),
            }),
            "ports" => Some(Self {
                title: "Ports",
                key: "local",
                value: |item| text(item.get("container")),
            }),
            "volumes" => Some(Self {
                title: "Volumes",
                key: "local",
                value: volume_value,
            }),
            _ => None,
        }
    }

    fn entries(&self, list: &Value) -> Entries {
        let mut entries = Entries::default();
        if let Value::Array(items) = list {
            for item in items {
                entries.insert(text(item.get(self.key)), (self.value)(item));
            }
        }
        entries
    }

    fn diff(&self, old: &Value, new: &Value) -> String {
        let old = self.entries(old);
        let new = self.entries(new);

        let mut additions = String::new();
        let mut changes = String::new();
        let mut deletions = String::new();

        for (key, before) in &old.items {
            match new.get(key) {
                Some(after) if after != before => {
                    changes.push_str(&format!("\t\t{key}: {before} -> {after}, \n"));
                }
                Some(_) => {}
                None => deletions.push_str(&format!("\t\t{key}: {before}, \n")),
            }
        }
        for (key, after) in &new.items {
            if old.get(key).is_none() {
                additions.push_str(&format!("\t\t{key}: {after}, \n"));
            }
        }

        if additions.is_empty() && changes.is_empty() && deletions.is_empty() {
            return String::new();
        }

        let mut section = format!("{}:\n", self.title);
        for (label, items) in [
            ("Additions", additions),
            ("Changes", changes),
            ("Deletions", deletions),
        ] {
            if !items.is_empty() {
                section.push_str(&format!("\t{label}:\n{items}"));
            }
        }
        section
    }
}

fn volume_value(item: &Value) -> String {
    let container = text(item.get("container"));
    match item.get("useSystemRoot") {
        Some(Value::Bool(true)) => format!("{container} (system root)"),
        _ => container,
    }
}

/// Key/value pairs in first-seen key order. A repeated key keeps its first
/// position and takes the last value.
#[derive(Default)]
struct Entries {
    items: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Entries {
    fn insert(&mut self, key: String, value: String) {
        match self.index.get(&key) {
            Some(&i) => self.items[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.items.len());
                self.items.push((key, value));
            }
        }
    }

    fn get(&self, key: &str) -> Option<&String> {
        self.index.get(key).map(|&i| &self.items[i].1)
    }
}
