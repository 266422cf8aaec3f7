/*!
 * System Limits and Constants
 *
 * Centralized location for defaults, thresholds, and platform constants.
 * Organized by domain for maintainability and discoverability.
 *
 * - Performance-critical constants are marked with [PERF]
 * - Linux-compatible values are marked with [LINUX-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// LIFECYCLE POLLING
// =============================================================================

/// First sleep between non-blocking probes of a bounded wait (1ms)
/// [PERF] Short-lived children usually exit within the first few probes
pub const DEFAULT_POLL_INITIAL_INTERVAL: Duration = Duration::from_millis(1);

/// Floor for every probe sleep, whatever the configured backoff (1ms)
/// [PERF] A zero backoff still sleeps this long between probes
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Upper bound for the exponential probe backoff (50ms)
pub const DEFAULT_POLL_MAX_INTERVAL: Duration = Duration::from_millis(50);

/// Tight probe ceiling used by the aggressive preset (5ms)
pub const AGGRESSIVE_POLL_MAX_INTERVAL: Duration = Duration::from_millis(5);

/// Time a live child gets to exit after the kill signal during shutdown (1s)
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Shutdown grace used by the aggressive preset (100ms)
pub const AGGRESSIVE_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

// =============================================================================
// CHANNELS
// =============================================================================

/// Buffer size for draining a child's output channel (8KB)
/// [PERF] Matches the default pipe page granularity on most systems
pub const CHANNEL_READ_CHUNK: usize = 8 * 1024;

// =============================================================================
// PROCESS ACCOUNTING
// =============================================================================

/// Root of the proc filesystem
/// [LINUX-COMPAT]
pub const PROC_ROOT: &str = "/proc";

/// Stat file of the calling process, probed once for capability detection
/// [LINUX-COMPAT]
pub const PROC_SELF_STAT: &str = "/proc/self/stat";

/// Clock ticks per second assumed when sysconf cannot answer
/// [LINUX-COMPAT] USER_HZ on every mainstream Linux architecture
pub const FALLBACK_CLOCK_TICKS: u64 = 100;

/// Page size assumed when sysconf cannot answer (4KB)
pub const FALLBACK_PAGE_SIZE: u64 = 4 * 1024;

/// Resolution of getrusage CPU counters (microseconds per second)
pub const RUSAGE_TICKS_PER_SECOND: u64 = 1_000_000;

/// Longest process title the kernel keeps, in bytes (TASK_COMM_LEN - 1)
/// [LINUX-COMPAT]
pub const PROCESS_TITLE_MAX: usize = 15;

// =============================================================================
// CONFIGURATION KEYS
// =============================================================================

/// Environment variable selecting the kill signal (name or number)
pub const ENV_KILL_SIGNAL: &str = "PROCVISOR_KILL_SIGNAL";

/// Environment variable for the initial probe interval in milliseconds
pub const ENV_POLL_INITIAL_MS: &str = "PROCVISOR_POLL_INITIAL_MS";

/// Environment variable for the maximum probe interval in milliseconds
pub const ENV_POLL_MAX_MS: &str = "PROCVISOR_POLL_MAX_MS";

/// Environment variable enabling kill-on-release (`1`/`true`/`0`/`false`)
pub const ENV_KILL_ON_RELEASE: &str = "PROCVISOR_KILL_ON_RELEASE";

/// Environment variable for the shutdown grace period in milliseconds
pub const ENV_SHUTDOWN_GRACE_MS: &str = "PROCVISOR_SHUTDOWN_GRACE_MS";

/// Environment variable switching tracing output to JSON
pub const ENV_TRACE_JSON: &str = "PROCVISOR_TRACE_JSON";
