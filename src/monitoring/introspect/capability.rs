/*!
 * Accounting Capability Detection
 * Decides once per process which accounting backend answers snapshots
 */

use crate::core::limits::PROC_SELF_STAT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

static CAPABILITY: OnceLock<AccountingCapability> = OnceLock::new();

/// Process accounting facility available on this host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountingCapability {
    /// `/proc/<pid>/stat` is readable: every counter for every visible pid
    ProcFs,
    /// Only `getrusage` for the calling process
    Rusage,
    /// No accounting facility at all
    Unavailable,
}

impl AccountingCapability {
    /// Probe the host
    pub fn detect() -> Self {
        if !cfg!(unix) {
            return AccountingCapability::Unavailable;
        }
        if Path::new(PROC_SELF_STAT).is_file() {
            AccountingCapability::ProcFs
        } else {
            AccountingCapability::Rusage
        }
    }

    /// Capability detected on first use, cached for the process lifetime
    pub fn current() -> Self {
        *CAPABILITY.get_or_init(|| {
            let capability = Self::detect();
            info!(capability = ?capability, "process accounting capability detected");
            capability
        })
    }

    /// Whether pids other than the caller's can be inspected
    pub fn supports_foreign_pids(&self) -> bool {
        matches!(self, AccountingCapability::ProcFs)
    }
}
