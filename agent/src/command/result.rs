//! Command outcomes

use serde::{Deserialize, Serialize};

/// Placeholder written over access tokens in logs
pub const TOKEN_PLACEHOLDER: &str = "<TOKEN>";

/// Placeholder written over registry passwords in logs
pub const PASSWORD_PLACEHOLDER: &str = "<PASSWORD>";

/// Current time in unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Outcome of one command chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// The command as logged (secrets redacted)
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,

    pub success: bool,

    #[serde(default)]
    pub start_ts: i64,

    #[serde(default)]
    pub end_ts: i64,
}

impl CommandResult {
    /// A successful result that did not come from a process
    pub fn simple(command: impl Into<String>, stdout: impl Into<String>) -> Self {
        let ts = now_ms();
        Self {
            command: command.into(),
            stdout: non_empty(stdout.into()),
            stderr: None,
            success: true,
            start_ts: ts,
            end_ts: ts,
        }
    }

    /// A failed result that did not come from a process
    pub fn error(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        let ts = now_ms();
        Self {
            command: command.into(),
            stdout: None,
            stderr: non_empty(stderr.into()),
            success: false,
            start_ts: ts,
            end_ts: ts,
        }
    }

    /// Replace every occurrence of `secret` in command, stdout and stderr
    pub fn redact(mut self, secret: &str, placeholder: &str) -> Self {
        if secret.is_empty() {
            return self;
        }
        self.command = self.command.replace(secret, placeholder);
        self.stdout = self.stdout.map(|s| s.replace(secret, placeholder));
        self.stderr = self.stderr.map(|s| s.replace(secret, placeholder));
        self
    }

    pub fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or_default()
    }

    pub fn stderr(&self) -> &str {
        self.stderr.as_deref().unwrap_or_default()
    }
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// A named phase of a [`CombinedLog`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub stage: String,

    #[serde(flatten)]
    pub result: CommandResult,
}

/// Ordered merge of several named command results.
///
/// `success` is the AND of every phase. `stdout` and `stderr` are the phase
/// outputs prefixed with their stage and separated by a blank line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedLog {
    phases: Vec<Phase>,
    stdout: String,
    stderr: String,
    success: bool,
}

impl Default for CombinedLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CombinedLog {
    pub fn new() -> Self {
        Self {
            phases: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn push(&mut self, stage: impl Into<String>, result: CommandResult) {
        let stage = stage.into();
        append_section(&mut self.stdout, &stage, result.stdout());
        append_section(&mut self.stderr, &stage, result.stderr());
        self.success &= result.success;
        self.phases.push(Phase { stage, result });
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// First phase recorded under `stage`
    pub fn phase(&self, stage: &str) -> Option<&CommandResult> {
        self.phases
            .iter()
            .find(|p| p.stage == stage)
            .map(|p| &p.result)
    }

    /// Whether the most recently pushed phase succeeded
    pub fn last_succeeded(&self) -> bool {
        self.phases.last().map(|p| p.result.success).unwrap_or(true)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

fn append_section(buf: &mut String, stage: &str, output: &str) {
    if output.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push_str("\n\n");
    }
    buf.push_str(stage);
    buf.push_str(": ");
    buf.push_str(output);
}
