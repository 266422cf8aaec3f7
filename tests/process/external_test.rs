/*!
 * External Process Tests
 * Spawn, channel, signal and reap behavior of a single child
 */

use pretty_assertions::assert_eq;
use procvisor::process::{
    ExternalProcess, ExternalStatus, Signal, SignalDelivery, SpawnConfig, SupervisorConfig,
};
use procvisor::ProcessError;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn spawn(exe: &str, args: &[&str]) -> ExternalProcess {
    spawn_config(SpawnConfig::new(exe).with_args(args.iter().copied()))
}

fn spawn_config(config: SpawnConfig) -> ExternalProcess {
    ExternalProcess::spawn(&config, &SupervisorConfig::new()).unwrap()
}

#[test]
fn test_echo_output_then_terminated() {
    let mut process = spawn("echo", &["hello"]);
    assert_eq!(process.status(), ExternalStatus::Running);
    assert!(process.pid().is_some());

    assert_eq!(process.read_to_end().unwrap(), b"hello\n");
    assert_eq!(process.poll(true), ExternalStatus::Terminated { exit_code: 0 });
    assert_eq!(process.exit_code(), Some(0));
}

#[test]
fn test_arguments_are_not_shell_expanded() {
    let mut process = spawn("echo", &["$HOME", "*"]);
    assert_eq!(process.read_to_end().unwrap(), b"$HOME *\n");
    assert_eq!(process.arguments(), &["$HOME".to_string(), "*".to_string()]);
    process.poll(true);
}

#[test]
fn test_nonzero_exit_code_surfaces() {
    let mut process = spawn("sh", &["-c", "exit 3"]);
    assert_eq!(process.poll(true), ExternalStatus::Terminated { exit_code: 3 });
}

#[test]
fn test_script_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("exit7.sh");
    std::fs::write(&script, "#!/bin/sh\nexit 7\n").unwrap();

    // Run through sh so the script never needs the exec bit
    let mut process = spawn("sh", &[script.to_str().unwrap()]);
    assert_eq!(process.poll(true), ExternalStatus::Terminated { exit_code: 7 });
}

#[test]
fn test_nonexistent_executable_is_fork_failed() {
    let mut process = spawn("/nonexistent/procvisor-test-binary", &[]);
    assert_eq!(process.status(), ExternalStatus::ForkFailed);
    assert_eq!(process.pid(), None);
    assert!(matches!(
        process.spawn_error(),
        Some(ProcessError::ProcessCreation(_))
    ));
    assert!(process.take_reader().is_none());
    assert!(process.take_writer().is_none());
    // Polling a failed spawn answers from the cache
    assert_eq!(process.poll(false), ExternalStatus::ForkFailed);
}

#[test]
fn test_cat_echoes_input_after_close() {
    let mut process = spawn("cat", &[]);
    process.write_input(b"ping\n").unwrap();
    process.write_input(b"pong\n").unwrap();
    process.close_input().unwrap();

    assert_eq!(process.read_to_end().unwrap(), b"ping\npong\n");
    assert_eq!(process.poll(true), ExternalStatus::Terminated { exit_code: 0 });

    assert!(matches!(
        process.close_input(),
        Err(ProcessError::ChannelClosed(_))
    ));
}

#[test]
fn test_kill_long_running_process() {
    let mut process = spawn("sleep", &["30"]);
    assert_eq!(process.kill(), SignalDelivery::Delivered);

    let status = process.wait_timeout(WAIT);
    assert_eq!(
        status,
        ExternalStatus::Aborted {
            signal: Signal::SIGTERM as i32
        }
    );
    assert_eq!(process.pid(), None);
}

#[test]
fn test_kill_after_exit_is_not_a_failure() {
    let mut process = spawn("true", &[]);
    // Give the child time to exit; it stays a zombie until polled
    std::thread::sleep(Duration::from_millis(100));

    let delivery = process.kill();
    assert_ne!(delivery, SignalDelivery::Failed);
    assert_ne!(process.status(), ExternalStatus::KillFailed);

    let status = process.poll(true);
    assert!(status.is_terminal());

    // Retired: nothing left to signal
    assert_eq!(process.kill(), SignalDelivery::Skipped);
    assert_eq!(process.status(), status);
}

#[test]
fn test_stop_then_resume() {
    let mut process = spawn("sleep", &["30"]);

    assert_eq!(process.signal(Signal::SIGSTOP), SignalDelivery::Delivered);
    let stopped = ExternalStatus::Stopped {
        signal: Signal::SIGSTOP as i32,
    };
    assert_eq!(process.wait_timeout(WAIT), stopped);
    // No further change: a non-blocking poll keeps the stop
    assert_eq!(process.poll(false), stopped);
    assert!(process.pid().is_some());

    assert_eq!(process.signal(Signal::SIGCONT), SignalDelivery::Delivered);
    assert_eq!(process.wait_timeout(WAIT), ExternalStatus::Running);

    process.signal(Signal::SIGKILL);
    assert_eq!(
        process.wait_timeout(WAIT),
        ExternalStatus::Aborted {
            signal: Signal::SIGKILL as i32
        }
    );
}

#[test]
fn test_kill_reaches_stopped_process() {
    let mut process = spawn("sleep", &["30"]);
    process.signal(Signal::SIGSTOP);
    assert!(matches!(process.wait_timeout(WAIT), ExternalStatus::Stopped { .. }));

    assert_eq!(process.kill(), SignalDelivery::Delivered);
    let mut status = process.wait_timeout(WAIT);
    // The resume may be observed before the exit
    if status == ExternalStatus::Running {
        status = process.wait_timeout(WAIT);
    }
    assert_eq!(
        status,
        ExternalStatus::Aborted {
            signal: Signal::SIGTERM as i32
        }
    );
}

#[test]
fn test_environment_and_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let expected_dir = dir.path().canonicalize().unwrap();

    let mut process = spawn_config(
        SpawnConfig::new("sh")
            .with_args(["-c", "printf '%s:%s' \"$PROCVISOR_TEST_VALUE\" \"$(pwd -P)\""])
            .with_env(vec![("PROCVISOR_TEST_VALUE".into(), "bar".into())])
            .with_working_dir(dir.path().to_str().unwrap()),
    );

    let output = String::from_utf8(process.read_to_end().unwrap()).unwrap();
    assert_eq!(output, format!("bar:{}", expected_dir.display()));
    process.poll(true);
}

#[test]
fn test_clean_environment() {
    let mut process = spawn_config(
        SpawnConfig::new("/bin/sh")
            .with_args(["-c", "printf '%s-%s' \"$ONLY\" \"$HOME\""])
            .with_env(vec![("ONLY".into(), "1".into())])
            .with_clean_env(),
    );

    assert_eq!(process.read_to_end().unwrap(), b"1-");
    process.poll(true);
}

#[test]
fn test_double_release_is_idempotent() {
    let mut process = spawn("cat", &[]);
    process.release();
    process.release();
    assert!(process.is_released());

    assert!(matches!(
        process.write_input(b"late"),
        Err(ProcessError::ChannelClosed(_))
    ));
    // cat saw EOF on release; reap it
    assert_eq!(process.wait_timeout(WAIT), ExternalStatus::Terminated { exit_code: 0 });
}

#[test]
fn test_kill_on_release() {
    let config = SupervisorConfig::aggressive();
    let mut process =
        ExternalProcess::spawn(&SpawnConfig::new("sleep").with_args(["30"]), &config).unwrap();

    process.release();
    assert_eq!(
        process.wait_timeout(WAIT),
        ExternalStatus::Aborted {
            signal: Signal::SIGKILL as i32
        }
    );
}

#[test]
fn test_take_reader_moves_ownership() {
    use std::io::Read;

    let mut process = spawn("echo", &["moved"]);
    let mut reader = process.take_reader().unwrap();
    assert!(process.take_reader().is_none());
    assert!(matches!(
        process.read_output(&mut [0u8; 4]),
        Err(ProcessError::ChannelClosed(_))
    ));

    let mut output = String::new();
    reader.read_to_string(&mut output).unwrap();
    assert_eq!(output, "moved\n");
    process.poll(true);
}
