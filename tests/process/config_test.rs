/*!
 * Supervisor Configuration Tests
 * Environment overrides; serialized because they mutate process env
 */

use pretty_assertions::assert_eq;
use procvisor::core::limits::{
    ENV_KILL_ON_RELEASE, ENV_KILL_SIGNAL, ENV_POLL_INITIAL_MS, ENV_POLL_MAX_MS,
    ENV_SHUTDOWN_GRACE_MS,
};
use procvisor::process::{ProcessSupervisor, Signal, SupervisorConfig};
use procvisor::ConfigError;
use serial_test::serial;
use std::time::Duration;

const ALL_KEYS: [&str; 5] = [
    ENV_KILL_SIGNAL,
    ENV_POLL_INITIAL_MS,
    ENV_POLL_MAX_MS,
    ENV_KILL_ON_RELEASE,
    ENV_SHUTDOWN_GRACE_MS,
];

struct EnvScope;

impl EnvScope {
    fn set(pairs: &[(&str, &str)]) -> Self {
        for key in ALL_KEYS {
            std::env::remove_var(key);
        }
        for (key, value) in pairs {
            std::env::set_var(key, value);
        }
        EnvScope
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for key in ALL_KEYS {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    let _env = EnvScope::set(&[]);
    assert_eq!(SupervisorConfig::from_env().unwrap(), SupervisorConfig::default());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    let _env = EnvScope::set(&[
        (ENV_KILL_SIGNAL, "SIGINT"),
        (ENV_POLL_INITIAL_MS, "3"),
        (ENV_POLL_MAX_MS, "30"),
        (ENV_KILL_ON_RELEASE, "yes"),
        (ENV_SHUTDOWN_GRACE_MS, "500"),
    ]);

    let supervisor = ProcessSupervisor::from_env().unwrap();
    let config = supervisor.config();
    assert_eq!(config.kill_signal, Signal::SIGINT);
    assert_eq!(config.poll_initial_interval, Duration::from_millis(3));
    assert_eq!(config.poll_max_interval, Duration::from_millis(30));
    assert!(config.kill_on_release);
    assert_eq!(config.shutdown_grace, Duration::from_millis(500));
}

#[test]
#[serial]
fn test_from_env_rejects_garbage() {
    let _env = EnvScope::set(&[(ENV_SHUTDOWN_GRACE_MS, "a while")]);

    let err = SupervisorConfig::from_env().unwrap_err();
    let ConfigError::InvalidValue { key, value, .. } = err;
    assert_eq!(key, ENV_SHUTDOWN_GRACE_MS);
    assert_eq!(value, "a while");
}

#[test]
#[serial]
fn test_from_env_kill_signal_by_number() {
    let _env = EnvScope::set(&[(ENV_KILL_SIGNAL, "9")]);
    assert_eq!(SupervisorConfig::from_env().unwrap().kill_signal, Signal::SIGKILL);
}
