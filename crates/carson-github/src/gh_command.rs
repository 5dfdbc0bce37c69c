//! Process transport for the `gh` and `git` command-line tools.

use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;

use crate::GithubError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Captured result of one CLI invocation.
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
        }
    }

    /// Best available error text from stderr/stdout, or `fallback` when both are blank.
    pub fn error_text(&self, fallback: &str) -> String {
        let combined = [self.stderr.trim(), self.stdout.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" | ");
        if combined.is_empty() {
            fallback.to_string()
        } else {
            truncate_for_error(&combined, 800)
        }
    }
}

#[async_trait]
/// Runs one CLI program with the given arguments.
///
/// Implementations return `Err` only when the program cannot be started; a
/// non-zero exit is reported through [`CommandOutput::success`].
pub trait CommandRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<CommandOutput, GithubError>;
}

#[derive(Debug, Clone)]
pub struct ProcessCommandRunner {
    program: String,
    working_dir: PathBuf,
}

impl ProcessCommandRunner {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: working_dir.into(),
        }
    }

    pub fn gh(working_dir: impl Into<PathBuf>) -> Self {
        Self::new("gh", working_dir)
    }

    pub fn git(working_dir: impl Into<PathBuf>) -> Self {
        Self::new("git", working_dir)
    }
}

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, args: &[String]) -> Result<CommandOutput, GithubError> {
        tracing::debug!(program = %self.program, args = ?args, "running command");
        let mut command = tokio::process::Command::new(&self.program);
        command.args(args);
        command.current_dir(&self.working_dir);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        let output = command
            .output()
            .await
            .map_err(|error| GithubError::CommandUnavailable {
                program: self.program.clone(),
                message: error.to_string(),
            })?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

/// Truncates `text` to `max_chars` characters, marking the cut.
pub fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
