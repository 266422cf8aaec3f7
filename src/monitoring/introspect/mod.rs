/*!
 * Resource Introspection
 * Point-in-time CPU, memory, fault and thread accounting for any process
 *
 * Snapshots are pure reads of OS state: no caching, no locks, safe to call
 * from any number of threads for the same or different targets. The
 * backend is chosen once by [`AccountingCapability::current`].
 */

mod capability;
mod platform;
mod procfs;
#[cfg(unix)]
mod rusage;
mod types;

pub use capability::AccountingCapability;
pub use platform::{clock_ticks_per_second, page_size, timeval_to_micros};
pub use procfs::parse_stat;
pub use types::{ProcessInfo, ProcessTarget};

use crate::core::errors::{IntrospectionError, IntrospectionResult};
use crate::core::types::Pid;

/// Snapshot the resource usage of `target`
///
/// Fails with `Lookup` when the process does not exist or is not visible to
/// the caller, and with `Unsupported` when the platform has no accounting
/// facility for the target.
pub fn snapshot(target: impl Into<ProcessTarget>) -> IntrospectionResult<ProcessInfo> {
    snapshot_with(AccountingCapability::current(), target.into())
}

/// Snapshot the calling process
pub fn snapshot_self() -> IntrospectionResult<ProcessInfo> {
    snapshot(ProcessTarget::SelfProcess)
}

/// Virtual memory size of `target` in bytes
pub fn process_size(target: impl Into<ProcessTarget>) -> IntrospectionResult<u64> {
    snapshot(target).map(|info| info.virtual_size)
}

/// Snapshot using an explicit backend
pub fn snapshot_with(
    capability: AccountingCapability,
    target: ProcessTarget,
) -> IntrospectionResult<ProcessInfo> {
    if let ProcessTarget::Pid(pid) = target {
        validate_pid(pid)?;
    }

    match capability {
        AccountingCapability::ProcFs => procfs::snapshot(target),
        #[cfg(unix)]
        AccountingCapability::Rusage => rusage::snapshot(target),
        #[cfg(not(unix))]
        AccountingCapability::Rusage => Err(IntrospectionError::Unsupported(
            "getrusage is not available on this platform".to_string(),
        )),
        AccountingCapability::Unavailable => Err(IntrospectionError::Unsupported(
            "no process accounting facility on this platform".to_string(),
        )),
    }
}

fn validate_pid(pid: Pid) -> IntrospectionResult<()> {
    if pid == 0 || i32::try_from(pid).is_err() {
        return Err(IntrospectionError::lookup(pid, "not a valid process id"));
    }
    Ok(())
}
