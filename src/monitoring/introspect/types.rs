/*!
 * Introspection Types
 * Snapshot value returned by resource queries
 */

use crate::core::types::{Pid, Ticks};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which process a snapshot describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessTarget {
    /// The calling process
    SelfProcess,
    /// Any process by OS id
    Pid(Pid),
}

impl ProcessTarget {
    /// Numeric pid for error reporting (the caller's own pid for `SelfProcess`)
    pub fn pid(&self) -> Pid {
        match self {
            ProcessTarget::SelfProcess => std::process::id(),
            ProcessTarget::Pid(pid) => *pid,
        }
    }
}

impl From<Pid> for ProcessTarget {
    fn from(pid: Pid) -> Self {
        ProcessTarget::Pid(pid)
    }
}

impl fmt::Display for ProcessTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessTarget::SelfProcess => write!(f, "self"),
            ProcessTarget::Pid(pid) => write!(f, "{}", pid),
        }
    }
}

/// Point-in-time resource usage of one process
///
/// CPU counters are in clock ticks; divide by `sc_clk_tck` for seconds.
/// Counters the platform cannot source are zero. Every field is always
/// serialized so consumers see a fixed shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessInfo {
    pub minor_page_faults: u64,
    pub major_page_faults: u64,
    pub user_time: Ticks,
    pub system_time: Ticks,
    pub number_threads: u64,
    /// Resident set size in bytes
    pub resident_size: u64,
    /// Virtual memory size in bytes
    pub virtual_size: u64,
    /// Clock ticks per second for `user_time` / `system_time`
    pub sc_clk_tck: u64,
}

impl ProcessInfo {
    /// User CPU time in seconds
    pub fn user_seconds(&self) -> f64 {
        ticks_to_seconds(self.user_time, self.sc_clk_tck)
    }

    /// System CPU time in seconds
    pub fn system_seconds(&self) -> f64 {
        ticks_to_seconds(self.system_time, self.sc_clk_tck)
    }

    /// Total CPU time (user + system)
    pub fn cpu_time(&self) -> Duration {
        if self.sc_clk_tck == 0 {
            return Duration::ZERO;
        }
        let ticks = self.user_time.saturating_add(self.system_time) as u128;
        let nanos = ticks * 1_000_000_000 / self.sc_clk_tck as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }
}

#[inline]
fn ticks_to_seconds(ticks: Ticks, per_second: u64) -> f64 {
    if per_second == 0 {
        0.0
    } else {
        ticks as f64 / per_second as f64
    }
}
