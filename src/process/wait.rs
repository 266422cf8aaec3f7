/*!
 * Wait Observation
 * waitpid probing and the status transition table
 */

use super::config::SupervisorConfig;
use super::types::ExternalStatus;
use crate::core::limits::MIN_POLL_INTERVAL;
use crate::core::types::Pid;
use nix::errno::Errno;
#[cfg(any(target_os = "linux", target_os = "android"))]
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// What a single waitpid call reported about a child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observation {
    /// No state change since the last report
    Unchanged,
    Exited(i32),
    Signaled(i32),
    Stopped(i32),
    Continued,
    /// The pid is not (or no longer) our child
    Missing,
}

/// Ask the OS about `pid`, optionally blocking until its state changes
///
/// Reports exits, stops and continues. Interrupted calls are retried.
pub(crate) fn observe(pid: Pid, block: bool) -> Observation {
    let target = nix::unistd::Pid::from_raw(pid as i32);
    let mut flags = WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    if !block {
        flags |= WaitPidFlag::WNOHANG;
    }

    loop {
        match waitpid(target, Some(flags)) {
            Ok(status) => {
                trace!(pid, block, ?status, "waitpid");
                return classify(status);
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => return Observation::Missing,
            Err(errno) => {
                warn!(pid, error = %errno, "waitpid failed, treating process as missing");
                return Observation::Missing;
            }
        }
    }
}

fn classify(status: WaitStatus) -> Observation {
    match status {
        WaitStatus::Exited(_, code) => Observation::Exited(code),
        WaitStatus::Signaled(_, signal, _) => Observation::Signaled(signal as i32),
        WaitStatus::Stopped(_, signal) => Observation::Stopped(signal as i32),
        #[cfg(any(target_os = "linux", target_os = "android"))]
        WaitStatus::PtraceEvent(_, signal, _) => Observation::Stopped(signal as i32),
        #[cfg(any(target_os = "linux", target_os = "android"))]
        WaitStatus::PtraceSyscall(_) => Observation::Stopped(Signal::SIGTRAP as i32),
        WaitStatus::Continued(_) => Observation::Continued,
        WaitStatus::StillAlive => Observation::Unchanged,
    }
}

/// Status that follows `current` after `observation`
///
/// A stopped process that resumes goes back to `Running`. A failed kill
/// followed by a quiet probe reverts to `before_kill_failure`, the status
/// the failure replaced, since the process is evidently still in it.
pub(crate) fn next_status(
    current: ExternalStatus,
    before_kill_failure: ExternalStatus,
    observation: Observation,
) -> ExternalStatus {
    if current.is_terminal() {
        return current;
    }

    match observation {
        Observation::Unchanged => match current {
            ExternalStatus::KillFailed => match before_kill_failure {
                ExternalStatus::Stopped { signal } => ExternalStatus::Stopped { signal },
                _ => ExternalStatus::Running,
            },
            other => other,
        },
        Observation::Exited(exit_code) => ExternalStatus::Terminated { exit_code },
        Observation::Signaled(signal) => ExternalStatus::Aborted { signal },
        Observation::Stopped(signal) => ExternalStatus::Stopped { signal },
        Observation::Continued => ExternalStatus::Running,
        Observation::Missing => ExternalStatus::NotFound,
    }
}

/// Whether a wait that began at `initial` can return with `current`
#[inline]
pub(crate) fn settled(initial: ExternalStatus, current: ExternalStatus) -> bool {
    current.is_terminal() || normalize(current) != normalize(initial)
}

#[inline]
fn normalize(status: ExternalStatus) -> ExternalStatus {
    match status {
        ExternalStatus::KillFailed => ExternalStatus::Running,
        other => other,
    }
}

/// Probe with exponential backoff until the status moves away from
/// `initial` or `timeout` passes
///
/// `probe` must be non-blocking. It is called at least once, and the last
/// status it returned is the result. Without a timeout the loop only ends
/// once the status settles.
pub(crate) fn poll_until<F>(
    config: &SupervisorConfig,
    initial: ExternalStatus,
    timeout: Option<Duration>,
    mut probe: F,
) -> ExternalStatus
where
    F: FnMut() -> ExternalStatus,
{
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
    let mut interval = config.poll_initial_interval.max(MIN_POLL_INTERVAL);

    let mut current = probe();
    if settled(initial, current) {
        return current;
    }

    loop {
        let sleep = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return current;
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        std::thread::sleep(sleep);
        interval = config.next_interval(interval).max(MIN_POLL_INTERVAL);

        current = probe();
        if settled(initial, current) {
            return current;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return current;
        }
    }
}
