//! Shell command execution for boot-service managers.
//!
//! Managers never spawn processes directly; they go through a
//! [`CommandRunner`] so the daemon interaction can be captured in tests.
//! A nonzero exit is an ordinary [`ExecResult`], not an error: only a
//! failed spawn or an expired timeout is reported as `Err`.
//!
//! # Example
//!
//! ```ignore
//! use bootsync_common::shell::{self, shellquote, SYSTEMCTL_CMD};
//!
//! let cmd = format!("{} restart {}", SYSTEMCTL_CMD, shellquote("dhcpd"));
//! let result = shell::exec(&cmd, Duration::from_secs(30)).await?;
//! ```

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{BootSyncError, BootSyncResult};

/// Path to `systemctl` for service restarts.
pub const SYSTEMCTL_CMD: &str = "/usr/bin/systemctl";

/// Shell used to run command strings.
pub const SH_CMD: &str = "/bin/sh";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// Wraps the string in double quotes and escapes `$`, `` ` ``, `"`, `\`
/// and newline.
///
/// # Example
///
/// ```
/// use bootsync_common::shell::shellquote;
///
/// assert_eq!(shellquote("/etc/dhcpd.conf"), "\"/etc/dhcpd.conf\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Exit status and trimmed output of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// -1 when the process was killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    /// Builds a result with the given exit code and no output.
    pub fn with_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout and stderr joined by a newline, skipping an empty side.
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }

    /// Turns a nonzero exit of `cmd` into [`BootSyncError::ShellCommandFailed`].
    pub fn checked(self, cmd: &str) -> BootSyncResult<ExecResult> {
        if self.success() {
            return Ok(self);
        }
        Err(BootSyncError::ShellCommandFailed {
            command: cmd.to_string(),
            exit_code: self.exit_code,
            output: self.combined_output(),
        })
    }
}

/// Process-execution seam used by the service synchronizer.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `cmd`, waiting at most `timeout`.
    async fn run(&self, cmd: &str, timeout: Duration) -> BootSyncResult<ExecResult>;
}

/// Runs commands through `/bin/sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, cmd: &str, timeout: Duration) -> BootSyncResult<ExecResult> {
        exec(cmd, timeout).await
    }
}

/// Runs `cmd` under `sh -c`, killing it if `timeout` expires first.
///
/// A nonzero exit is returned as an ordinary [`ExecResult`]; only a failed
/// spawn ([`BootSyncError::ShellExec`]) or an expired timeout
/// ([`BootSyncError::ShellTimeout`]) is an error.
pub async fn exec(cmd: &str, timeout: Duration) -> BootSyncResult<ExecResult> {
    tracing::debug!(command = %cmd, ?timeout, "Running command");

    let child = Command::new(SH_CMD)
        .arg("-c")
        .arg(cmd)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(output) => output.map_err(|source| BootSyncError::ShellExec {
            command: cmd.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(BootSyncError::ShellTimeout {
                command: cmd.to_string(),
                timeout,
            })
        }
    };

    let trimmed = |bytes: &[u8]| String::from_utf8_lossy(bytes).trim().to_string();
    let result = ExecResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: trimmed(&output.stdout),
        stderr: trimmed(&output.stderr),
    };

    tracing::debug!(command = %cmd, exit_code = result.exit_code, "Command finished");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_shellquote() {
        assert_eq!(shellquote("dhcpd6"), "\"dhcpd6\"");
        assert_eq!(shellquote("/etc/dhcp/dhcpd 6.conf"), "\"/etc/dhcp/dhcpd 6.conf\"");
        assert_eq!(shellquote("$(reboot)"), "\"\\$(reboot)\"");
        assert_eq!(shellquote("a\"b`c"), "\"a\\\"b\\`c\"");
        assert_eq!(shellquote(""), "\"\"");
    }

    #[test]
    fn test_combined_output() {
        let mut result = ExecResult::with_code(1);
        assert_eq!(result.combined_output(), "");

        result.stderr = "line 3: semicolon expected.".to_string();
        assert_eq!(result.combined_output(), "line 3: semicolon expected.");

        result.stdout = "Internet Systems Consortium DHCP Server".to_string();
        assert_eq!(
            result.combined_output(),
            "Internet Systems Consortium DHCP Server\nline 3: semicolon expected."
        );
    }

    #[test]
    fn test_checked() {
        assert!(ExecResult::with_code(0).checked("true").is_ok());

        let mut failed = ExecResult::with_code(1);
        failed.stderr = "Configuration file errors encountered".to_string();
        match failed.checked("dhcpd -t") {
            Err(BootSyncError::ShellCommandFailed {
                command,
                exit_code,
                output,
            }) => {
                assert_eq!(command, "dhcpd -t");
                assert_eq!(exit_code, 1);
                assert_eq!(output, "Configuration file errors encountered");
            }
            other => panic!("expected ShellCommandFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exec_captures_output_and_status() {
        let result = exec("echo ok; echo warn >&2; exit 3", TIMEOUT).await.unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout, "ok");
        assert_eq!(result.stderr, "warn");
    }

    #[tokio::test]
    async fn test_exec_timeout() {
        let result = exec("sleep 5", Duration::from_millis(50)).await;
        assert!(matches!(result, Err(BootSyncError::ShellTimeout { .. })));
    }

    #[tokio::test]
    async fn test_shell_runner() {
        let result = ShellRunner.run("printf ' padded \\n'", TIMEOUT).await.unwrap();
        assert!(result.success());
        assert_eq!(result.stdout, "padded");
    }
}
