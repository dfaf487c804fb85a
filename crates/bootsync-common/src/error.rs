//! Error types for bootsync managers.
//!
//! Per-record problems (a host that does not resolve, a daemon whose
//! configuration check fails) are logged where they happen and never
//! become errors. What remains here are the failures a caller has to see.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for bootsync operations.
pub type BootSyncResult<T> = Result<T, BootSyncError>;

/// Errors that can occur while generating or applying boot-service configuration.
#[derive(Debug, Error)]
pub enum BootSyncError {
    /// A required template could not be read.
    #[error("error reading template: {}: {source}", path.display())]
    TemplateRead {
        /// Template path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Rendering or writing a generated file failed.
    #[error("failed to render {}: {message}", path.display())]
    Render {
        /// Output path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command did not finish in time.
    #[error("Shell command '{command}' timed out after {timeout:?}")]
    ShellTimeout {
        /// The command that was killed.
        command: String,
        /// The configured limit.
        timeout: Duration,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// Name resolution failed for a host.
    #[error("Could not resolve {host}: {message}")]
    Resolution {
        /// The host name that was looked up.
        host: String,
        /// Error message.
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Inventory snapshot could not be loaded or queried.
    #[error("Inventory error: {message}")]
    Inventory {
        /// Error message.
        message: String,
    },

    /// Manager registry misuse.
    #[error("Manager registry error: {message}")]
    Registry {
        /// Error message.
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error (unexpected state).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl BootSyncError {
    /// Creates a template read error.
    pub fn template_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::TemplateRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a render error.
    pub fn render(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Render {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a name resolution error.
    pub fn resolution(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an inventory error.
    pub fn inventory(message: impl Into<String>) -> Self {
        Self::Inventory {
            message: message.into(),
        }
    }

    /// Creates a registry error.
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error indicates a transient condition
    /// that may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BootSyncError::Resolution { .. }
                | BootSyncError::ShellTimeout { .. }
                | BootSyncError::ShellCommandFailed { .. }
        )
    }

    /// Returns true for the errors that abort a configuration write.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            BootSyncError::TemplateRead { .. } | BootSyncError::Render { .. }
        )
    }
}
