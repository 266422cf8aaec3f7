/*!
 * Lock-Free Supervisor Statistics
 * Atomic counters updated on every lifecycle operation
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time copy of the supervisor counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorStats {
    /// Children successfully started
    pub spawned: u64,
    pub pipe_failures: u64,
    pub fork_failures: u64,
    /// Signals that reached a live process
    pub kills_delivered: u64,
    pub kill_failures: u64,
    /// Children observed in a terminal status after having run
    pub reaped: u64,
    /// Released children reaped after they exited
    pub orphans_reaped: u64,
    /// Entries whose process may still exist
    pub live: usize,
}

/// Atomic supervisor statistics
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering
#[repr(C, align(64))]
#[derive(Debug, Default)]
pub struct AtomicSupervisorStats {
    spawned: AtomicU64,
    pipe_failures: AtomicU64,
    fork_failures: AtomicU64,
    kills_delivered: AtomicU64,
    kill_failures: AtomicU64,
    reaped: AtomicU64,
    orphans_reaped: AtomicU64,
    live: AtomicUsize,
}

impl AtomicSupervisorStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// A child started and is live
    #[inline(always)]
    pub fn inc_spawned(&self) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
        self.live.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_pipe_failures(&self) {
        self.pipe_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_fork_failures(&self) {
        self.fork_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_kills_delivered(&self) {
        self.kills_delivered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_kill_failures(&self) {
        self.kill_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A live child reached a terminal status
    #[inline(always)]
    pub fn inc_reaped(&self) {
        self.reaped.fetch_add(1, Ordering::Relaxed);
        self.dec_live();
    }

    #[inline(always)]
    pub fn add_orphans_reaped(&self, count: u64) {
        self.orphans_reaped.fetch_add(count, Ordering::Relaxed);
    }

    /// A live entry left the registry without being reaped
    #[inline]
    pub fn dec_live(&self) {
        let _ = self
            .live
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Counter values may be mutually inconsistent under concurrent
    /// updates, but each individual value is accurate.
    #[inline]
    pub fn snapshot(&self) -> SupervisorStats {
        SupervisorStats {
            spawned: self.spawned.load(Ordering::Relaxed),
            pipe_failures: self.pipe_failures.load(Ordering::Relaxed),
            fork_failures: self.fork_failures.load(Ordering::Relaxed),
            kills_delivered: self.kills_delivered.load(Ordering::Relaxed),
            kill_failures: self.kill_failures.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
            orphans_reaped: self.orphans_reaped.load(Ordering::Relaxed),
            live: self.live.load(Ordering::Relaxed),
        }
    }
}
