/*!
 * Process Supervisor Tests
 * Registry behavior, pid index, counters, and cross-thread kill/wait
 */

use pretty_assertions::assert_eq;
use procvisor::process::{
    ExternalStatus, ProcessSupervisor, Signal, SignalDelivery, SpawnConfig, SupervisorConfig,
};
use procvisor::ProcessError;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(10);

fn no_args() -> Vec<String> {
    Vec::new()
}

#[test]
fn test_echo_hello_through_supervisor() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("echo", ["hello"]).unwrap();

    assert_eq!(supervisor.read_to_end(id).unwrap(), b"hello\n");
    assert_eq!(
        supervisor.poll(id, true).unwrap(),
        ExternalStatus::Terminated { exit_code: 0 }
    );
    assert_eq!(
        supervisor.release(id),
        Some(ExternalStatus::Terminated { exit_code: 0 })
    );
}

#[test]
fn test_fork_failure_is_registered() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor
        .spawn_command("/nonexistent/procvisor-test-binary", no_args())
        .unwrap();

    assert_eq!(supervisor.status(id).unwrap(), ExternalStatus::ForkFailed);
    assert_eq!(supervisor.pid(id).unwrap(), None);

    let summary = supervisor.summary(id).unwrap();
    assert!(summary.spawn_error.is_some());
    assert_eq!(summary.pid, None);

    let stats = supervisor.stats();
    assert_eq!(stats.fork_failures, 1);
    assert_eq!(stats.spawned, 0);
    assert_eq!(stats.live, 0);

    assert_eq!(supervisor.release(id), Some(ExternalStatus::ForkFailed));
}

#[test]
fn test_invalid_executable_is_an_error() {
    let supervisor = ProcessSupervisor::new();
    assert!(matches!(
        supervisor.spawn(&SpawnConfig::new("  ")),
        Err(ProcessError::InvalidExecutable(_))
    ));
    assert!(supervisor.is_empty());
}

#[test]
fn test_kill_then_wait_retires_pid() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("sleep", ["30"]).unwrap();
    let pid = supervisor.pid(id).unwrap().unwrap();
    assert_eq!(supervisor.find_by_pid(pid), Some(id));

    assert_eq!(supervisor.kill(id).unwrap(), SignalDelivery::Delivered);
    let status = supervisor.wait_timeout(id, WAIT).unwrap();
    assert_eq!(
        status,
        ExternalStatus::Aborted {
            signal: Signal::SIGTERM as i32
        }
    );

    assert_eq!(supervisor.find_by_pid(pid), None);
    assert_eq!(supervisor.pid(id).unwrap(), None);

    // Terminal: further kills are no-ops
    assert_eq!(supervisor.kill(id).unwrap(), SignalDelivery::Skipped);

    let stats = supervisor.stats();
    assert_eq!(stats.kills_delivered, 1);
    assert_eq!(stats.reaped, 1);
    assert_eq!(stats.live, 0);
}

#[test]
fn test_kill_from_another_thread_while_waiting() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("sleep", ["30"]).unwrap();

    let waiter = {
        let supervisor = supervisor.clone();
        std::thread::spawn(move || supervisor.poll(id, true))
    };

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(supervisor.kill(id).unwrap(), SignalDelivery::Delivered);

    let status = waiter.join().unwrap().unwrap();
    assert!(status.is_terminal());
}

#[test]
fn test_wait_timeout_bounds_latency() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("sleep", ["30"]).unwrap();

    let started = std::time::Instant::now();
    let status = supervisor.wait_timeout(id, Duration::from_millis(50)).unwrap();
    assert_eq!(status, ExternalStatus::Running);
    assert!(started.elapsed() < Duration::from_secs(5));

    supervisor.signal(id, Signal::SIGKILL).unwrap();
    assert!(supervisor.wait_timeout(id, WAIT).unwrap().is_terminal());
}

#[test]
fn test_cat_roundtrip_through_supervisor() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("cat", no_args()).unwrap();

    supervisor.write_input(id, b"abc").unwrap();
    supervisor.close_input(id).unwrap();
    assert_eq!(supervisor.read_to_end(id).unwrap(), b"abc");

    assert!(matches!(
        supervisor.write_input(id, b"late"),
        Err(ProcessError::ChannelClosed(_))
    ));
    assert_eq!(
        supervisor.poll(id, true).unwrap(),
        ExternalStatus::Terminated { exit_code: 0 }
    );
}

#[test]
fn test_read_output_in_chunks() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("printf", ["abcdef"]).unwrap();

    let mut collected = Vec::new();
    let mut buf = [0u8; 2];
    loop {
        let n = supervisor.read_output(id, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }
    assert_eq!(collected, b"abcdef");
    supervisor.poll(id, true).unwrap();
}

#[test]
fn test_release_is_idempotent_and_forgets_id() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("true", no_args()).unwrap();
    supervisor.poll(id, true).unwrap();

    assert!(supervisor.release(id).is_some());
    assert_eq!(supervisor.release(id), None);
    assert!(matches!(
        supervisor.status(id),
        Err(ProcessError::UnknownProcess(_))
    ));
    assert!(matches!(
        supervisor.kill(id),
        Err(ProcessError::UnknownProcess(_))
    ));
}

#[test]
fn test_release_live_process_with_kill_on_release() {
    let supervisor = ProcessSupervisor::with_config(SupervisorConfig::aggressive());
    let id = supervisor.spawn_command("sleep", ["30"]).unwrap();
    let pid = supervisor.pid(id).unwrap().unwrap();

    assert!(supervisor.release(id).is_some());
    assert_eq!(supervisor.find_by_pid(pid), None);
    assert_eq!(supervisor.stats().live, 0);
}

/// Scheduler state letter from `/proc/<pid>/stat`, if the pid exists
#[cfg(target_os = "linux")]
fn proc_state(pid: u32) -> Option<char> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    stat.rsplit_once(')')?.1.trim_start().chars().next()
}

#[cfg(target_os = "linux")]
#[test]
fn test_released_running_child_does_not_stay_zombie() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("sh", ["-c", "sleep 0.2"]).unwrap();
    let pid = supervisor.pid(id).unwrap().unwrap();

    assert_eq!(supervisor.release(id), Some(ExternalStatus::Running));
    assert_eq!(supervisor.orphans(), 1);
    assert_eq!(supervisor.stats().live, 0);

    // Exited but not yet waited for
    let deadline = Instant::now() + WAIT;
    while proc_state(pid) != Some('Z') && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(proc_state(pid), Some('Z'));

    // The next spawn sweeps it
    let next = supervisor.spawn_command("true", no_args()).unwrap();
    assert_ne!(proc_state(pid), Some('Z'));
    assert_eq!(supervisor.orphans(), 0);
    assert_eq!(supervisor.stats().orphans_reaped, 1);

    supervisor.poll(next, true).unwrap();
    supervisor.release(next);
}

#[test]
fn test_reap_orphans_after_kill() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("sleep", ["30"]).unwrap();
    let pid = supervisor.pid(id).unwrap().unwrap();
    supervisor.release(id);
    assert_eq!(supervisor.reap_orphans(), 0);

    let target = nix::unistd::Pid::from_raw(pid as i32);
    nix::sys::signal::kill(target, Signal::SIGKILL).unwrap();

    let deadline = Instant::now() + WAIT;
    let mut reaped = 0;
    while reaped == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
        reaped = supervisor.reap_orphans();
    }
    assert_eq!(reaped, 1);
    assert_eq!(supervisor.orphans(), 0);
}

#[test]
fn test_live_ids_and_shutdown() {
    let supervisor = ProcessSupervisor::with_config(
        SupervisorConfig::new().with_shutdown_grace(Duration::from_secs(5)),
    );
    let done = supervisor.spawn_command("true", no_args()).unwrap();
    supervisor.poll(done, true).unwrap();

    let sleepers: Vec<_> = (0..3)
        .map(|_| supervisor.spawn_command("sleep", ["30"]).unwrap())
        .collect();

    assert_eq!(supervisor.len(), 4);
    assert_eq!(supervisor.live_ids(), sleepers);

    assert_eq!(supervisor.shutdown(), 4);
    assert!(supervisor.is_empty());

    let stats = supervisor.stats();
    assert_eq!(stats.spawned, 4);
    assert_eq!(stats.reaped, 4);
    assert_eq!(stats.live, 0);
}

#[test]
fn test_summary_serializes() {
    let supervisor = ProcessSupervisor::new();
    let id = supervisor.spawn_command("sh", ["-c", "exit 2"]).unwrap();
    supervisor.poll(id, true).unwrap();

    let summary = supervisor.summary(id).unwrap();
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["executable"], "sh");
    assert_eq!(json["status"]["status"], "terminated");
    assert_eq!(json["status"]["exit_code"], 2);
    assert!(json.get("pid").is_none());
}
