/*!
 * Platform Constants
 * sysconf lookups with conservative fallbacks
 */

use crate::core::limits::{FALLBACK_CLOCK_TICKS, FALLBACK_PAGE_SIZE};

/// Clock ticks per second (`_SC_CLK_TCK`)
pub fn clock_ticks_per_second() -> u64 {
    #[cfg(unix)]
    {
        sysconf_positive(nix::unistd::SysconfVar::CLK_TCK).unwrap_or(FALLBACK_CLOCK_TICKS)
    }
    #[cfg(not(unix))]
    {
        FALLBACK_CLOCK_TICKS
    }
}

/// Memory page size in bytes (`_SC_PAGESIZE`)
pub fn page_size() -> u64 {
    #[cfg(unix)]
    {
        sysconf_positive(nix::unistd::SysconfVar::PAGE_SIZE).unwrap_or(FALLBACK_PAGE_SIZE)
    }
    #[cfg(not(unix))]
    {
        FALLBACK_PAGE_SIZE
    }
}

#[cfg(unix)]
fn sysconf_positive(var: nix::unistd::SysconfVar) -> Option<u64> {
    match nix::unistd::sysconf(var) {
        Ok(Some(value)) if value > 0 => Some(value as u64),
        _ => None,
    }
}

/// Convert a `timeval` split into seconds and microseconds to microseconds
///
/// Negative components (never produced by the kernel) clamp to zero.
#[inline]
pub fn timeval_to_micros(seconds: i64, microseconds: i64) -> u64 {
    let seconds = seconds.max(0) as u64;
    let microseconds = microseconds.max(0) as u64;
    seconds.saturating_mul(1_000_000).saturating_add(microseconds)
}
