//! Process executor

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::line::{Arg, CommandLine, Step};
use crate::command::result::{non_empty, now_ms, CommandResult};

/// Runs command chains to completion.
///
/// Implementations never fail: spawn errors and non-zero exits come back as
/// a `CommandResult` with `success = false`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, command: &CommandLine) -> CommandResult;
}

/// Executor options
#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Kill a step that runs longer than this. `None` waits forever.
    pub timeout: Option<Duration>,
}

/// Executor spawning real child processes
pub struct ProcessExecutor {
    options: ExecutorOptions,
    cancel: CancellationToken,
}

impl ProcessExecutor {
    pub fn new(options: ExecutorOptions, cancel: CancellationToken) -> Self {
        Self { options, cancel }
    }

    /// Token that kills every running child when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn run_step(&self, mut cmd: Command, program: &str, cwd: Option<&Path>) -> StepOutput {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = cwd {
            cmd.current_dir(cwd);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return StepOutput::failed(format!("failed to spawn {program}: {e}")),
        };
        let pid = child.id();

        let deadline = async {
            match self.options.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        // dropping the wait future drops the child, which kills it
        let outcome = tokio::select! {
            res = child.wait_with_output() => Outcome::Done(res),
            _ = self.cancel.cancelled() => Outcome::Cancelled,
            _ = deadline => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Done(Ok(output)) => StepOutput::from_output(output),
            Outcome::Done(Err(e)) => StepOutput::failed(format!("failed to wait for {program}: {e}")),
            Outcome::Cancelled => {
                kill_process_group(pid);
                warn!("{} cancelled", program);
                StepOutput::failed(format!("{program} cancelled"))
            }
            Outcome::TimedOut => {
                kill_process_group(pid);
                warn!("{} timed out", program);
                StepOutput::failed(format!(
                    "{program} timed out after {:?}",
                    self.options.timeout.unwrap_or_default()
                ))
            }
        }
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, command: &CommandLine) -> CommandResult {
        let start_ts = now_ms();
        debug!("executing: {}", command);

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut success = true;
        let mut cwd: Option<PathBuf> = None;

        for step in command.steps() {
            let output = match step {
                Step::Cd(dir) => {
                    let dir = match &cwd {
                        Some(current) => current.join(dir),
                        None => dir.clone(),
                    };
                    if tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
                        cwd = Some(dir);
                        continue;
                    }
                    StepOutput::failed(format!("cd: {}: No such file or directory", dir.display()))
                }
                Step::Exec { program, args } => {
                    let mut cmd = Command::new(program);
                    cmd.args(args.iter().map(Arg::value));
                    self.run_step(cmd, program, cwd.as_deref()).await
                }
                Step::Shell(script) => {
                    let mut cmd = Command::new("sh");
                    cmd.arg("-c").arg(script);
                    self.run_step(cmd, "sh", cwd.as_deref()).await
                }
            };

            stdout.push_str(&output.stdout);
            stderr.push_str(&output.stderr);
            if !output.success {
                success = false;
                break;
            }
        }

        CommandResult {
            command: command.to_string(),
            stdout: non_empty(stdout),
            stderr: non_empty(stderr),
            success,
            start_ts,
            end_ts: now_ms(),
        }
    }
}

enum Outcome {
    Done(std::io::Result<Output>),
    Cancelled,
    TimedOut,
}

struct StepOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

impl StepOutput {
    fn failed(stderr: String) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            success: false,
        }
    }

    fn from_output(output: Output) -> Self {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let success = output.status.success();
        if !success && stderr.trim().is_empty() {
            stderr = format!("process exited with {}", output.status);
        }
        Self {
            stdout,
            stderr,
            success,
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // SAFETY: killpg only sends a signal; the group was created by
        // process_group(0) at spawn, so its id equals the child's pid.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn executor() -> ProcessExecutor {
        ProcessExecutor::new(ExecutorOptions::default(), CancellationToken::new())
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let line = CommandLine::new().exec("echo", ["hello"]);
        let result = executor().execute(&line).await;
        assert!(result.success);
        assert_eq!(result.stdout(), "hello\n");
        assert_eq!(result.command, "echo hello");
    }

    #[tokio::test]
    async fn test_chain_short_circuits() {
        let line = CommandLine::new()
            .exec("echo", ["first"])
            .exec("false", Vec::<Arg>::new())
            .exec("echo", ["never"]);
        let result = executor().execute(&line).await;
        assert!(!result.success);
        assert_eq!(result.stdout(), "first\n");
        assert!(result.stderr().contains("exited with"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_data() {
        let line = CommandLine::new().exec("definitely-not-a-real-binary-xyz", ["--help"]);
        let result = executor().execute(&line).await;
        assert!(!result.success);
        assert!(result.stderr().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn test_cd_sets_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let line = CommandLine::new().cd(dir.path()).exec("ls", Vec::<Arg>::new());
        let result = executor().execute(&line).await;
        assert!(result.success);
        assert!(result.stdout().contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_cd_missing_directory_fails() {
        let line = CommandLine::new()
            .cd("/definitely/not/here")
            .exec("echo", ["never"]);
        let result = executor().execute(&line).await;
        assert!(!result.success);
        assert!(result.stdout.is_none());
        assert!(result.stderr().contains("No such file or directory"));
    }

    #[tokio::test]
    async fn test_shell_step_runs_script() {
        let line = CommandLine::new().shell("echo a && echo b");
        let result = executor().execute(&line).await;
        assert!(result.success);
        assert_eq!(result.stdout(), "a\nb\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_step() {
        let executor = ProcessExecutor::new(
            ExecutorOptions {
                timeout: Some(Duration::from_millis(100)),
            },
            CancellationToken::new(),
        );
        let line = CommandLine::new().exec("sleep", ["5"]);
        let result = executor.execute(&line).await;
        assert!(!result.success);
        assert!(result.stderr().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancellation_kills_step() {
        let cancel = CancellationToken::new();
        let executor = ProcessExecutor::new(ExecutorOptions::default(), cancel.clone());
        let line = CommandLine::new().exec("sleep", ["5"]);

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });
        let result = executor.execute(&line).await;
        trigger.await.unwrap();

        assert!(!result.success);
        assert!(result.stderr().contains("cancelled"));
    }
}
