/*!
 * Supervisor Configuration
 *
 * Kill signal, wait backoff, and teardown policy. Built from presets,
 * `with_*` builders, or the environment.
 */

use crate::core::errors::ConfigError;
use crate::core::limits::*;
use crate::core::serde::{duration_millis, signal_name};
use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every process a supervisor owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SupervisorConfig {
    /// Signal sent by `kill` (default: SIGTERM)
    #[serde(with = "signal_name")]
    pub kill_signal: Signal,

    /// First sleep of a bounded wait (default: 1ms)
    #[serde(with = "duration_millis")]
    pub poll_initial_interval: Duration,

    /// Backoff ceiling of a bounded wait (default: 50ms)
    #[serde(with = "duration_millis")]
    pub poll_max_interval: Duration,

    /// Signal still-live children when their entry is released
    pub kill_on_release: bool,

    /// How long `shutdown` waits for each child after signalling it (default: 1s)
    #[serde(with = "duration_millis")]
    pub shutdown_grace: Duration,
}

impl SupervisorConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self {
            kill_signal: Signal::SIGTERM,
            poll_initial_interval: DEFAULT_POLL_INITIAL_INTERVAL,
            poll_max_interval: DEFAULT_POLL_MAX_INTERVAL,
            kill_on_release: false,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// SIGKILL, tight backoff, and no orphans left behind on release
    pub fn aggressive() -> Self {
        Self {
            kill_signal: Signal::SIGKILL,
            poll_initial_interval: DEFAULT_POLL_INITIAL_INTERVAL,
            poll_max_interval: AGGRESSIVE_POLL_MAX_INTERVAL,
            kill_on_release: true,
            shutdown_grace: AGGRESSIVE_SHUTDOWN_GRACE,
        }
    }

    /// Defaults overridden by `PROCVISOR_*` environment variables
    ///
    /// Unset variables keep their default; set but unparsable ones fail.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(raw) = lookup(ENV_KILL_SIGNAL) {
            config.kill_signal = signal_name::parse(&raw)
                .ok_or_else(|| invalid(ENV_KILL_SIGNAL, &raw, "unknown signal"))?;
        }
        if let Some(raw) = lookup(ENV_POLL_INITIAL_MS) {
            config.poll_initial_interval = parse_millis(ENV_POLL_INITIAL_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_MAX_MS) {
            config.poll_max_interval = parse_millis(ENV_POLL_MAX_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_KILL_ON_RELEASE) {
            config.kill_on_release = parse_bool(ENV_KILL_ON_RELEASE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SHUTDOWN_GRACE_MS) {
            config.shutdown_grace = parse_millis(ENV_SHUTDOWN_GRACE_MS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_initial_interval.is_zero() {
            return Err(invalid(ENV_POLL_INITIAL_MS, "0", "must be at least 1ms"));
        }
        if self.poll_initial_interval > self.poll_max_interval {
            return Err(invalid(
                ENV_POLL_MAX_MS,
                &self.poll_max_interval.as_millis().to_string(),
                "must not be smaller than the initial interval",
            ));
        }
        Ok(())
    }

    pub fn with_kill_signal(mut self, signal: Signal) -> Self {
        self.kill_signal = signal;
        self
    }

    pub fn with_poll_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.poll_initial_interval = initial;
        self.poll_max_interval = max;
        self
    }

    pub fn with_kill_on_release(mut self, enabled: bool) -> Self {
        self.kill_on_release = enabled;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Next backoff step after `current`
    #[inline]
    pub(crate) fn next_interval(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.poll_max_interval)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| invalid(key, raw, "expected milliseconds"))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, raw, "expected a boolean")),
    }
}
