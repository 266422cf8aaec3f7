/*!
 * File Descriptor Guards
 *
 * RAII guards for file descriptors with exactly-once close
 */

use super::traits::{Guard, GuardDrop};
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::types::Pid;
use std::fs::File;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use tracing::{debug, error};

/// File descriptor guard with automatic close
///
/// The descriptor is closed exactly once: by `release` or, failing that,
/// on drop. After release every access reports `AlreadyReleased`, so a
/// closed descriptor number can never be used again through this guard.
pub struct FdGuard {
    file: Option<File>,
    label: &'static str,
    metadata: GuardMetadata,
}

impl FdGuard {
    /// Create a new file descriptor guard
    pub fn new(fd: OwnedFd, label: &'static str) -> Self {
        Self {
            file: Some(File::from(fd)),
            label,
            metadata: GuardMetadata::new("fd"),
        }
    }

    /// Attach the owning process for diagnostics
    pub fn with_pid(mut self, pid: Pid) -> Self {
        self.set_pid(pid);
        self
    }

    /// Attach the owning process after construction
    pub fn set_pid(&mut self, pid: Pid) {
        self.metadata.pid = Some(pid);
    }

    /// Human-readable role of this descriptor (`"stdin"`, `"stdout"`)
    #[inline]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Raw descriptor number while the guard is active
    #[inline]
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.file.as_ref().map(|f| f.as_raw_fd())
    }

    /// Borrow the open descriptor for I/O
    pub fn file_mut(&mut self) -> GuardResult<&mut File> {
        self.file.as_mut().ok_or(GuardError::AlreadyReleased)
    }
}

impl Guard for FdGuard {
    fn resource_type(&self) -> &'static str {
        "fd"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        self.file.is_some()
    }

    fn release(&mut self) -> GuardResult<()> {
        let file = self.file.take().ok_or(GuardError::AlreadyReleased)?;
        let raw = OwnedFd::from(file).into_raw_fd();

        debug!(
            fd = raw,
            channel = self.label,
            pid = ?self.metadata.pid,
            lifetime_us = self.metadata.lifetime_micros(),
            "closing channel"
        );

        // Ownership of `raw` moved out of the OwnedFd above, so this is its
        // only close. Errors still leave the descriptor closed.
        nix::unistd::close(raw).map_err(|e| GuardError::OperationFailed(e.to_string()))
    }
}

impl GuardDrop for FdGuard {
    fn on_drop(&mut self) {
        if self.is_active() {
            if let Err(e) = self.release() {
                error!(
                    channel = self.label,
                    pid = ?self.metadata.pid,
                    error = %e,
                    "fd guard drop failed"
                );
            }
        }
    }
}

impl Drop for FdGuard {
    fn drop(&mut self) {
        self.on_drop();
    }
}

impl std::fmt::Debug for FdGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdGuard")
            .field("fd", &self.raw_fd())
            .field("label", &self.label)
            .field("pid", &self.metadata.pid)
            .finish()
    }
}
