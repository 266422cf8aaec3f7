/*!
 * Orphan Reaper
 * Waits for children that were released while still running
 *
 * A released child keeps its process table slot until somebody calls
 * waitpid on it. The supervisor adopts such pids here and sweeps them
 * with non-blocking waits on later operations.
 */

use super::wait::{self, Observation};
use crate::core::types::Pid;
use parking_lot::Mutex;
use tracing::debug;

/// Released children still owed a waitpid
#[derive(Debug, Default)]
pub(crate) struct Reaper {
    pending: Mutex<Vec<Pid>>,
}

impl Reaper {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Take over reaping `pid`
    ///
    /// The pid must belong to an unreaped child of this process. Until it
    /// is reaped the kernel cannot hand the number to anyone else.
    pub(crate) fn adopt(&self, pid: Pid) {
        self.pending.lock().push(pid);
        debug!(pid, "released child adopted for reaping");
    }

    /// Reap every adopted child that has exited; returns how many
    pub(crate) fn sweep(&self) -> usize {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return 0;
        }

        let before = pending.len();
        pending.retain(|&pid| match wait::observe(pid, false) {
            Observation::Exited(_) | Observation::Signaled(_) | Observation::Missing => {
                debug!(pid, "released child reaped");
                false
            }
            Observation::Unchanged | Observation::Stopped(_) | Observation::Continued => true,
        });
        before - pending.len()
    }

    /// Number of adopted children not reaped yet
    pub(crate) fn pending(&self) -> usize {
        self.pending.lock().len()
    }
}
