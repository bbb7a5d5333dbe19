//! Recording executor for tests and dry runs

use std::sync::Mutex;

use async_trait::async_trait;

use crate::command::executor::Executor;
use crate::command::line::CommandLine;
use crate::command::result::{now_ms, CommandResult};

struct Rule {
    pattern: String,
    stdout: String,
    stderr: String,
    success: bool,
}

/// Executor that records every rendered command instead of running it.
///
/// Commands succeed with empty output unless a rule registered with
/// [`RecordingExecutor::respond`] or [`RecordingExecutor::fail`] matches a
/// substring of the rendered line. The first matching rule wins.
#[derive(Default)]
pub struct RecordingExecutor {
    rules: Mutex<Vec<Rule>>,
    executed: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout` for commands containing `pattern`
    pub fn respond(self, pattern: &str, stdout: &str) -> Self {
        self.push_rule(pattern, stdout, "", true)
    }

    /// Fail with `stderr` for commands containing `pattern`
    pub fn fail(self, pattern: &str, stderr: &str) -> Self {
        self.push_rule(pattern, "", stderr, false)
    }

    fn push_rule(self, pattern: &str, stdout: &str, stderr: &str, success: bool) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(Rule {
                pattern: pattern.to_string(),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                success,
            });
        }
        self
    }

    /// Every command executed so far, rendered as executed (unredacted)
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, command: &CommandLine) -> CommandResult {
        let rendered = command.to_string();
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(rendered.clone());
        }

        let ts = now_ms();
        let mut result = CommandResult {
            command: rendered,
            stdout: None,
            stderr: None,
            success: true,
            start_ts: ts,
            end_ts: ts,
        };

        if let Ok(rules) = self.rules.lock() {
            if let Some(rule) = rules.iter().find(|r| result.command.contains(&r.pattern)) {
                result.stdout = Some(rule.stdout.clone()).filter(|s| !s.is_empty());
                result.stderr = Some(rule.stderr.clone()).filter(|s| !s.is_empty());
                result.success = rule.success;
            }
        }
        result
    }
}
