/*!
 * Core Types
 * Common types used across the supervisor
 */

/// OS process ID type
pub type Pid = u32;

/// Exit code reported by a normally terminated process
pub type ExitCode = i32;

/// Raw signal number as reported by the OS
pub type SignalNumber = i32;

/// Clock ticks (units of `1 / sc_clk_tck` seconds)
pub type Ticks = u64;
