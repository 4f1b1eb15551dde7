//! Shell command execution.
//!
//! Every action that shells out goes through [`execute`]. Elevation is an
//! explicit per-call flag on [`CommandOptions`], never ambient: the argv is
//! assembled by [`build_argv`] so the sudo prefix can be tested without
//! actually invoking sudo.

use crate::error::{Result, RigupError};
use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
        }
    }
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<std::path::PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Capture stdout (if false, inherits from parent).
    pub capture_stdout: bool,

    /// Capture stderr (if false, inherits from parent).
    pub capture_stderr: bool,

    /// Run with elevated privileges via sudo.
    pub elevated: bool,
}

/// Build the argv for a shell command.
///
/// Returns `[sh, -c, command]` for plain execution and prefixes `sudo`
/// only when elevation is requested and the process is not already root.
/// Callers that do not set `elevated` never pick up a sudo prefix, no
/// matter what ran before them.
pub fn build_argv(command: &str, elevated: bool, already_root: bool) -> Vec<String> {
    let mut argv = Vec::with_capacity(4);
    if elevated && !already_root {
        argv.push("sudo".to_string());
    }
    argv.push(shell_program().to_string());
    argv.push("-c".to_string());
    argv.push(command.to_string());
    argv
}

/// Execute a shell command.
pub fn execute(command: &str, options: &CommandOptions) -> Result<CommandResult> {
    let start = Instant::now();

    let argv = build_argv(command, options.elevated, super::is_elevated());
    debug!(?argv, "executing");

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);

    // Set working directory
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    // Set environment
    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    // Configure stdio
    if options.capture_stdout {
        cmd.stdout(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit());
    }

    if options.capture_stderr {
        cmd.stderr(Stdio::piped());
    } else {
        cmd.stderr(Stdio::inherit());
    }

    // Execute; blocks until the external process exits
    let output = cmd.output().map_err(|_| RigupError::CommandFailed {
        command: command.to_string(),
        code: None,
    })?;

    let duration = start.elapsed();

    let stdout = if options.capture_stdout {
        String::from_utf8_lossy(&output.stdout).to_string()
    } else {
        String::new()
    };

    let stderr = if options.capture_stderr {
        String::from_utf8_lossy(&output.stderr).to_string()
    } else {
        String::new()
    };

    if output.status.success() {
        Ok(CommandResult::success(stdout, stderr, duration))
    } else {
        Ok(CommandResult::failure(
            output.status.code(),
            stdout,
            stderr,
            duration,
        ))
    }
}

/// Execute a command and return success/failure.
pub fn execute_check(command: &str, cwd: Option<&Path>) -> bool {
    let options = CommandOptions {
        cwd: cwd.map(|p| p.to_path_buf()),
        capture_stdout: true,
        capture_stderr: true,
        ..Default::default()
    };

    execute(command, &options)
        .map(|r| r.success)
        .unwrap_or(false)
}

/// Execute a command and collect output silently.
pub fn execute_quiet(command: &str, cwd: Option<&Path>) -> Result<CommandResult> {
    let options = CommandOptions {
        cwd: cwd.map(|p| p.to_path_buf()),
        capture_stdout: true,
        capture_stderr: true,
        ..Default::default()
    };
    execute(command, &options)
}

/// The shell used to run step commands.
///
/// Provisioning commands run under `sh` rather than the invoking user's
/// interactive shell so a half-provisioned zsh setup cannot change how
/// the remaining steps are interpreted.
fn shell_program() -> &'static str {
    if cfg!(target_os = "windows") {
        "cmd.exe"
    } else {
        "sh"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_successful_command() {
        let options = CommandOptions {
            capture_stdout: true,
            capture_stderr: true,
            ..Default::default()
        };

        let result = execute("echo hello", &options).unwrap();

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.contains("hello"));
    }

    #[test]
    fn execute_failing_command() {
        let options = CommandOptions {
            capture_stdout: true,
            capture_stderr: true,
            ..Default::default()
        };

        let result = execute("exit 3", &options).unwrap();

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
    }

    #[test]
    fn execute_with_env() {
        let mut options = CommandOptions {
            capture_stdout: true,
            capture_stderr: true,
            ..Default::default()
        };
        options
            .env
            .insert("MY_VAR".to_string(), "my_value".to_string());

        let result = execute("echo $MY_VAR", &options).unwrap();

        assert!(result.success);
        assert!(result.stdout.contains("my_value"));
    }

    #[test]
    fn execute_with_cwd() {
        let temp = tempfile::TempDir::new().unwrap();
        let options = CommandOptions {
            cwd: Some(temp.path().to_path_buf()),
            capture_stdout: true,
            ..Default::default()
        };

        let result = execute("pwd", &options).unwrap();

        assert!(result.success);
    }

    #[test]
    fn execute_check_returns_bool() {
        assert!(execute_check("exit 0", None));
        assert!(!execute_check("exit 1", None));
    }

    #[test]
    fn execute_quiet_captures_silently() {
        let result = execute_quiet("echo hello", None).unwrap();
        assert!(result.success);
        assert!(result.stdout.contains("hello"));
    }

    #[test]
    fn command_result_tracks_duration() {
        let options = CommandOptions {
            capture_stdout: true,
            ..Default::default()
        };

        let result = execute("echo fast", &options).unwrap();

        assert!(result.duration.as_millis() < 5000);
    }

    #[test]
    fn build_argv_plain() {
        let argv = build_argv("echo hi", false, false);
        assert_eq!(argv, vec!["sh", "-c", "echo hi"]);
    }

    #[test]
    fn build_argv_elevated_prefixes_sudo() {
        let argv = build_argv("make install", true, false);
        assert_eq!(argv, vec!["sudo", "sh", "-c", "make install"]);
    }

    #[test]
    fn build_argv_elevated_as_root_skips_sudo() {
        let argv = build_argv("make install", true, true);
        assert_eq!(argv, vec!["sh", "-c", "make install"]);
    }

    #[test]
    fn build_argv_non_elevated_never_gains_sudo() {
        // An elevated call beforehand must not leak into later calls.
        let _ = build_argv("make install", true, false);
        let argv = build_argv("make", false, false);
        assert!(!argv.contains(&"sudo".to_string()));
    }
}
