/*!
 * Resource Introspection Tests
 * Snapshots of self, of a live child, and of pids that do not exist
 */

use procvisor::monitoring::introspect::{clock_ticks_per_second, page_size};
use procvisor::monitoring::{
    process_size, snapshot, snapshot_self, AccountingCapability, ProcessTarget,
};
use procvisor::process::{ExternalProcess, SpawnConfig, SupervisorConfig};
use procvisor::IntrospectionError;
use std::time::Duration;

/// Larger than any pid_max the kernel allows, yet a valid pid_t
const NONEXISTENT_PID: u32 = i32::MAX as u32;

#[test]
fn test_self_snapshot_is_populated() {
    let info = snapshot_self().unwrap();
    assert!(info.resident_size > 0);
    assert!(info.sc_clk_tck > 0);
    if AccountingCapability::current() == AccountingCapability::ProcFs {
        assert!(info.number_threads >= 1);
        assert!(info.virtual_size >= info.resident_size);
    }
}

#[test]
fn test_nonexistent_pid_is_lookup_error() {
    match snapshot(NONEXISTENT_PID) {
        Err(IntrospectionError::Lookup { pid, .. }) => assert_eq!(pid, NONEXISTENT_PID),
        other => panic!("expected lookup error, got {:?}", other),
    }
    assert!(process_size(NONEXISTENT_PID).is_err());
}

#[cfg(target_os = "linux")]
#[test]
fn test_child_snapshot() {
    let config = SpawnConfig::new("sleep").with_args(["30"]);
    let mut child = ExternalProcess::spawn(&config, &SupervisorConfig::aggressive()).unwrap();
    let pid = child.pid().unwrap();

    let info = snapshot(ProcessTarget::Pid(pid)).unwrap();
    assert!(info.number_threads >= 1);
    assert!(info.virtual_size > 0);
    assert_eq!(info.sc_clk_tck, clock_ticks_per_second());

    child.kill();
    assert!(child.wait_timeout(Duration::from_secs(10)).is_terminal());

    // Reaped: the pid is gone
    assert!(matches!(
        snapshot(pid),
        Err(IntrospectionError::Lookup { .. })
    ));
}

#[test]
fn test_cpu_time_does_not_go_backwards() {
    let before = snapshot_self().unwrap();

    let mut acc = 0u64;
    for i in 0..2_000_000u64 {
        acc = acc.wrapping_mul(31).wrapping_add(i);
    }
    std::hint::black_box(acc);

    let after = snapshot_self().unwrap();
    assert!(after.user_time >= before.user_time);
    assert!(after.cpu_time() >= before.cpu_time());
}

#[test]
fn test_concurrent_snapshots() {
    let handles: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| snapshot_self().map(|info| info.resident_size)))
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().unwrap() > 0);
    }
}

#[test]
fn test_snapshot_json_shape_is_stable() {
    let info = snapshot_self().unwrap();
    let json = serde_json::to_value(info).unwrap();
    for key in [
        "minor_page_faults",
        "major_page_faults",
        "user_time",
        "system_time",
        "number_threads",
        "resident_size",
        "virtual_size",
        "sc_clk_tck",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
}

#[test]
fn test_platform_constants() {
    assert!(page_size() >= 1024);
    assert!(page_size().is_power_of_two());
    assert!(clock_ticks_per_second() > 0);
}
