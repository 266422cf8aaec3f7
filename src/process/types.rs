/*!
 * Process Types
 * Identifiers, status model, and spawn configuration
 */

use crate::core::serde::{is_empty_vec, is_false, is_none};
use crate::core::types::{ExitCode, Pid, SignalNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for a process tracked by a supervisor
///
/// Issued monotonically and never reused, unlike OS pids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(u64);

impl ExternalId {
    #[inline]
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ext-{}", self.0)
    }
}

/// Lifecycle status of an external process
///
/// Exit codes and signals only exist on the variants where they are
/// meaningful, so a running process can never carry an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExternalStatus {
    /// Channel creation failed; no process was created
    PipeFailed,
    /// Process creation failed after the channels existed
    ForkFailed,
    /// Alive at the last check
    Running,
    /// The pid could no longer be found (reaped elsewhere)
    NotFound,
    /// Exited normally
    Terminated { exit_code: ExitCode },
    /// Killed by an uncaught signal
    Aborted { signal: SignalNumber },
    /// Suspended; may resume
    Stopped { signal: SignalNumber },
    /// A termination request could not be delivered; may still be alive
    KillFailed,
}

impl ExternalStatus {
    /// Terminal statuses are final: the pid is retired and never queried again
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExternalStatus::PipeFailed
                | ExternalStatus::ForkFailed
                | ExternalStatus::NotFound
                | ExternalStatus::Terminated { .. }
                | ExternalStatus::Aborted { .. }
        )
    }

    /// Whether the process may still exist at the OS level
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether the spawn attempt itself failed
    #[inline]
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, ExternalStatus::PipeFailed | ExternalStatus::ForkFailed)
    }

    /// Exit code of a normally terminated process
    pub fn exit_code(&self) -> Option<ExitCode> {
        match self {
            ExternalStatus::Terminated { exit_code } => Some(*exit_code),
            _ => None,
        }
    }

    /// Signal that aborted or stopped the process
    pub fn signal(&self) -> Option<SignalNumber> {
        match self {
            ExternalStatus::Aborted { signal } | ExternalStatus::Stopped { signal } => {
                Some(*signal)
            }
            _ => None,
        }
    }

    /// Stable upper-case name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ExternalStatus::PipeFailed => "PIPE_FAILED",
            ExternalStatus::ForkFailed => "FORK_FAILED",
            ExternalStatus::Running => "RUNNING",
            ExternalStatus::NotFound => "NOT_FOUND",
            ExternalStatus::Terminated { .. } => "TERMINATED",
            ExternalStatus::Aborted { .. } => "ABORTED",
            ExternalStatus::Stopped { .. } => "STOPPED",
            ExternalStatus::KillFailed => "KILL_FAILED",
        }
    }
}

impl fmt::Display for ExternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalStatus::Terminated { exit_code } => write!(f, "TERMINATED({})", exit_code),
            ExternalStatus::Aborted { signal } => write!(f, "ABORTED(signal {})", signal),
            ExternalStatus::Stopped { signal } => write!(f, "STOPPED(signal {})", signal),
            other => f.write_str(other.name()),
        }
    }
}

/// Outcome of a signal delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDelivery {
    /// The signal reached the process
    Delivered,
    /// The process was already gone; treated as success
    AlreadyExited,
    /// Delivery failed; status is now `KILL_FAILED`
    Failed,
    /// Nothing to signal (terminal status or failed spawn)
    Skipped,
}

/// Serializable view of one supervisor entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub id: ExternalId,
    pub executable: String,
    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub arguments: Vec<String>,
    /// Present while the process is live
    #[serde(default, skip_serializing_if = "is_none")]
    pub pid: Option<Pid>,
    pub status: ExternalStatus,
    #[serde(default, skip_serializing_if = "is_none")]
    pub spawn_error: Option<String>,
}

/// What to run and how
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpawnConfig {
    /// Program name or path; resolved through PATH like `execvp`
    pub executable: String,
    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub env_vars: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clear_env: bool,
    #[serde(default, skip_serializing_if = "is_none")]
    pub working_dir: Option<String>,
}

impl SpawnConfig {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: vec![],
            env_vars: vec![],
            clear_env: false,
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, env_vars: Vec<(String, String)>) -> Self {
        self.env_vars = env_vars;
        self
    }

    /// Start the child with only `env_vars` in its environment
    pub fn with_clean_env(mut self) -> Self {
        self.clear_env = true;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}
