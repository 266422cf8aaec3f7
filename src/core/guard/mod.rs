/*!
 * RAII Resource Guards
 *
 * Owned OS resources with exactly-once release.
 *
 * ## Guard Types
 *
 * - **FdGuard**: One end of a pipe (or any owned descriptor), closed exactly
 *   once either by an explicit `release` or on drop
 *
 * ## Example
 *
 * ```rust,no_run
 * use procvisor::core::guard::{FdGuard, Guard};
 * use std::os::fd::OwnedFd;
 *
 * # fn demo(fd: OwnedFd) {
 * let mut guard = FdGuard::new(fd, "stdin");
 * guard.release().unwrap();
 * assert!(guard.release().is_err()); // never closed twice
 * # }
 * ```
 */

mod fd;
mod traits;

pub use fd::FdGuard;
pub use traits::{Guard, GuardDrop};

/// Result type for guard operations
pub type GuardResult<T> = Result<T, GuardError>;

/// Errors that can occur during guard operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum GuardError {
    #[error("Resource already released")]
    AlreadyReleased,

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Guard metadata for observability
#[derive(Debug, Clone)]
pub struct GuardMetadata {
    pub resource_type: &'static str,
    pub creation_time: std::time::Instant,
    pub pid: Option<crate::core::types::Pid>,
}

impl GuardMetadata {
    #[inline]
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            creation_time: std::time::Instant::now(),
            pid: None,
        }
    }

    #[inline]
    pub fn with_pid(mut self, pid: crate::core::types::Pid) -> Self {
        self.pid = Some(pid);
        self
    }

    #[inline]
    pub fn lifetime_micros(&self) -> u64 {
        self.creation_time.elapsed().as_micros() as u64
    }
}
