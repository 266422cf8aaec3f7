/*!
 * getrusage Backend
 * Self-only accounting for Unix systems without procfs
 */

use super::platform::timeval_to_micros;
use super::types::{ProcessInfo, ProcessTarget};
use crate::core::errors::{IntrospectionError, IntrospectionResult};
use crate::core::limits::RUSAGE_TICKS_PER_SECOND;
use nix::errno::Errno;
use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::signal::kill;
use nix::unistd::Pid as NixPid;

/// Snapshot through getrusage
///
/// Only the calling process can be measured. A foreign pid is still
/// checked for existence so a missing process is reported as `Lookup`
/// rather than `Unsupported`.
pub fn snapshot(target: ProcessTarget) -> IntrospectionResult<ProcessInfo> {
    match target {
        ProcessTarget::SelfProcess => snapshot_self(),
        ProcessTarget::Pid(pid) if pid == std::process::id() => snapshot_self(),
        ProcessTarget::Pid(pid) => {
            let raw = i32::try_from(pid)
                .map_err(|_| IntrospectionError::lookup(pid, "pid out of range"))?;
            match kill(NixPid::from_raw(raw), None) {
                Err(Errno::ESRCH) => Err(IntrospectionError::lookup(pid, "no such process")),
                Err(Errno::EPERM) => Err(IntrospectionError::lookup(pid, "permission denied")),
                _ => Err(IntrospectionError::Unsupported(format!(
                    "no per-process accounting for pid {} on this platform",
                    pid
                ))),
            }
        }
    }
}

fn snapshot_self() -> IntrospectionResult<ProcessInfo> {
    let usage = getrusage(UsageWho::RUSAGE_SELF)
        .map_err(|e| IntrospectionError::Unsupported(format!("getrusage failed: {}", e)))?;

    let user = usage.user_time();
    let system = usage.system_time();

    Ok(ProcessInfo {
        minor_page_faults: usage.minor_page_faults().max(0) as u64,
        major_page_faults: usage.major_page_faults().max(0) as u64,
        user_time: timeval_to_micros(user.tv_sec() as i64, user.tv_usec() as i64),
        system_time: timeval_to_micros(system.tv_sec() as i64, system.tv_usec() as i64),
        // Not exposed by getrusage
        number_threads: 0,
        resident_size: max_rss_bytes(usage.max_rss()),
        virtual_size: 0,
        sc_clk_tck: RUSAGE_TICKS_PER_SECOND,
    })
}

/// `ru_maxrss` is bytes on Apple platforms and kilobytes elsewhere
#[inline]
fn max_rss_bytes(raw: nix::libc::c_long) -> u64 {
    let raw = raw.max(0) as u64;
    if cfg!(any(target_os = "macos", target_os = "ios")) {
        raw
    } else {
        raw.saturating_mul(1024)
    }
}
