//! Command executor module
//!
//! Hands command strings verbatim to the host interpreter and classifies
//! what came back. There is no allowlist or validation here: the shell tool
//! is an unrestricted capability and whatever the model asks for runs.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Appended to successful output so that silent commands (`mkdir`, `cd`)
/// still give the model something to read.
pub const SUCCESS_SUFFIX: &str = "Task Executed Successfully";

/// Outcome of running one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    /// Process ran, exited zero and wrote nothing to stderr; carries stdout
    Success(String),
    /// Spawn failure, non-zero exit or a non-empty error stream; carries the error text
    Failure(String),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }

    /// Single string the model sees. Success and failure are told apart by
    /// prefix only.
    pub fn render(&self) -> String {
        match self {
            ExecutionResult::Success(stdout) => {
                format!("Success {} || {}", stdout, SUCCESS_SUFFIX)
            }
            ExecutionResult::Failure(error) => format!("Error {}", error),
        }
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Runs shell commands one at a time
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandExecutor {
    /// Create an executor that runs in the process's current directory with no timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir` instead of the current directory
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Bound how long a single command may run. Unset means wait forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    /// Run `command` to completion and classify the outcome.
    ///
    /// Never returns an error: anything that goes wrong becomes a
    /// [`ExecutionResult::Failure`] for the model to react to.
    pub async fn execute(&self, command: &str) -> ExecutionResult {
        crate::debug_log!("Executing: {}", command);

        let mut cmd = shell_command(command);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    crate::warn_log!("Command timed out after {:?}: {}", limit, command);
                    return ExecutionResult::Failure(format!(
                        "Command timed out after {} seconds: {}",
                        limit.as_secs(),
                        command
                    ));
                }
            },
            None => cmd.output().await,
        };

        let result = match output {
            Ok(output) => classify(command, output),
            Err(e) => ExecutionResult::Failure(format!("Failed to run command '{}': {}", command, e)),
        };

        if !result.is_success() {
            crate::info_log!("Command failed: {} -> {}", command, result.render());
        }
        result
    }
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    }
}

fn classify(command: &str, output: Output) -> ExecutionResult {
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !stderr.is_empty() {
        return ExecutionResult::Failure(stderr);
    }

    if !output.status.success() {
        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "termination by signal".to_string(),
        };
        let mut message = format!("Command failed: {} ({})", command, status);
        if !stdout.trim().is_empty() {
            message.push('\n');
            message.push_str(&stdout);
        }
        return ExecutionResult::Failure(message);
    }

    ExecutionResult::Success(stdout)
}
