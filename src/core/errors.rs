/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::Pid;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process lifecycle errors with serialization support
///
/// Spawn failures are recorded on the resulting entry rather than raised,
/// so `ChannelCreation` and `ProcessCreation` usually travel as the
/// `spawn_error` of a `PIPE_FAILED` / `FORK_FAILED` process.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ProcessError {
    #[error("Invalid executable: {0}")]
    #[diagnostic(
        code(process::invalid_executable),
        help("Provide a non-empty program path without interior NUL bytes.")
    )]
    InvalidExecutable(String),

    #[error("Failed to create process channels: {0}")]
    #[diagnostic(
        code(process::channel_creation_failed),
        help("The process may have run out of file descriptors. Retrying with the same arguments will not help.")
    )]
    ChannelCreation(String),

    #[error("Failed to create process: {0}")]
    #[diagnostic(
        code(process::creation_failed),
        help("Check that the executable exists, is on PATH and is executable.")
    )]
    ProcessCreation(String),

    #[error("Unknown external process: ext-{0}")]
    #[diagnostic(
        code(process::unknown),
        help("The handle was never issued by this supervisor or has already been released.")
    )]
    UnknownProcess(u64),

    #[error("Channel already closed: {0}")]
    #[diagnostic(
        code(process::channel_closed),
        help("The channel end was closed or handed out with take_reader/take_writer.")
    )]
    ChannelClosed(String),

    #[error("Invalid process title: {0}")]
    #[diagnostic(code(process::invalid_title))]
    InvalidTitle(String),

    #[error("Channel I/O failed: {0}")]
    #[diagnostic(code(process::io))]
    Io(String),
}

impl From<std::io::Error> for ProcessError {
    fn from(err: std::io::Error) -> Self {
        ProcessError::Io(err.to_string())
    }
}

/// Resource introspection errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum IntrospectionError {
    #[error("Process {pid} cannot be inspected: {reason}")]
    #[diagnostic(
        code(introspect::lookup),
        help("The process does not exist or belongs to another user.")
    )]
    Lookup { pid: Pid, reason: String },

    #[error("Process accounting unsupported: {0}")]
    #[diagnostic(
        code(introspect::unsupported),
        help("This platform exposes no process accounting facility for the requested target.")
    )]
    Unsupported(String),
}

impl IntrospectionError {
    pub fn lookup(pid: Pid, reason: impl Into<String>) -> Self {
        IntrospectionError::Lookup {
            pid,
            reason: reason.into(),
        }
    }
}

/// Configuration errors raised while reading settings from the environment
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    #[diagnostic(
        code(config::invalid_value),
        help("Unset the variable to fall back to the built-in default.")
    )]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Unified supervisor error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum SupervisorError {
    #[error("Process error: {0}")]
    #[diagnostic(transparent)]
    Process(#[from] ProcessError),

    #[error("Introspection error: {0}")]
    #[diagnostic(transparent)]
    Introspection(#[from] IntrospectionError),

    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for lifecycle operations
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Result type for introspection queries
pub type IntrospectionResult<T> = std::result::Result<T, IntrospectionError>;

/// Result type spanning every subsystem
pub type Result<T> = std::result::Result<T, SupervisorError>;
