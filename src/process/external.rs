/*!
 * External Process
 * One supervised child: its pid, stdin/stdout channels, and cached status
 */

use super::channel::{ChannelReader, ChannelSet, ChannelWriter};
use super::config::SupervisorConfig;
use super::types::{ExternalStatus, SignalDelivery, SpawnConfig};
use super::validation::validate_spawn;
use super::wait::{self, Observation};
use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::limits::CHANNEL_READ_CHUNK;
use crate::core::types::{ExitCode, Pid};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A spawned (or failed-to-spawn) child process
///
/// The entry owns the parent-side channel ends and closes each of them
/// exactly once, on `release` or drop. Its pid is forgotten as soon as a
/// terminal status is observed, so a recycled pid is never signalled or
/// waited on through this entry.
#[derive(Debug)]
pub struct ExternalProcess {
    executable: String,
    arguments: Vec<String>,
    pid: Option<Pid>,
    reader: Option<ChannelReader>,
    writer: Option<ChannelWriter>,
    status: ExternalStatus,
    /// Status a failed kill replaced; a quiet probe reverts to it
    before_kill_failure: ExternalStatus,
    spawn_error: Option<ProcessError>,
    config: SupervisorConfig,
    released: bool,
}

impl ExternalProcess {
    /// Start `spawn.executable` with its stdin and stdout wired to new pipes
    ///
    /// Only malformed input is an error. Channel or process creation
    /// failures produce an entry in `PIPE_FAILED` or `FORK_FAILED` whose
    /// `spawn_error` carries the cause.
    pub fn spawn(spawn: &SpawnConfig, config: &SupervisorConfig) -> ProcessResult<Self> {
        validate_spawn(spawn)?;

        let mut process = Self {
            executable: spawn.executable.clone(),
            arguments: spawn.args.clone(),
            pid: None,
            reader: None,
            writer: None,
            status: ExternalStatus::PipeFailed,
            before_kill_failure: ExternalStatus::Running,
            spawn_error: None,
            config: config.clone(),
            released: false,
        };

        let channels = match ChannelSet::create() {
            Ok(channels) => channels,
            Err(e) => {
                warn!(executable = %spawn.executable, error = %e, "channel creation failed");
                process.spawn_error = Some(ProcessError::ChannelCreation(e.to_string()));
                return Ok(process);
            }
        };

        let ChannelSet {
            child_stdin,
            child_stdout,
            mut writer,
            mut reader,
        } = channels;

        let mut command = Command::new(&spawn.executable);
        command.args(&spawn.args);
        if spawn.clear_env {
            command.env_clear();
        }
        for (key, value) in &spawn.env_vars {
            command.env(key, value);
        }
        if let Some(dir) = &spawn.working_dir {
            command.current_dir(dir);
        }
        command
            .stdin(Stdio::from(child_stdin))
            .stdout(Stdio::from(child_stdout))
            .stderr(Stdio::inherit());

        let spawned = command.spawn();
        // The command owns the child-side ends; dropping it closes them here
        drop(command);

        match spawned {
            Ok(child) => {
                let pid = child.id();
                // Reaping goes through waitpid on the pid, not through `Child`
                drop(child);

                reader.attach(pid);
                writer.attach(pid);
                process.pid = Some(pid);
                process.reader = Some(reader);
                process.writer = Some(writer);
                process.status = ExternalStatus::Running;

                info!(
                    executable = %process.executable,
                    args = process.arguments.len(),
                    pid,
                    "spawned external process"
                );
            }
            Err(e) => {
                warn!(executable = %spawn.executable, error = %e, "process creation failed");
                drop(reader);
                drop(writer);
                process.status = ExternalStatus::ForkFailed;
                process.spawn_error = Some(ProcessError::ProcessCreation(format!(
                    "{}: {}",
                    spawn.executable, e
                )));
            }
        }

        Ok(process)
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Status as of the last poll, kill or spawn
    #[inline]
    pub fn status(&self) -> ExternalStatus {
        self.status
    }

    /// OS pid while the process is considered live
    #[inline]
    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    pub fn exit_code(&self) -> Option<ExitCode> {
        self.status.exit_code()
    }

    /// Why the spawn failed, for `PIPE_FAILED` and `FORK_FAILED` entries
    pub fn spawn_error(&self) -> Option<&ProcessError> {
        self.spawn_error.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Refresh the status from the OS
    ///
    /// Entries in a terminal status answer from the cache. With `block`,
    /// waits until the child exits, stops or resumes.
    pub fn poll(&mut self, block: bool) -> ExternalStatus {
        match self.pid {
            Some(pid) => {
                let observation = wait::observe(pid, block);
                self.apply(observation)
            }
            None => self.status,
        }
    }

    /// Poll until the status changes or `timeout` elapses
    pub fn wait_timeout(&mut self, timeout: Duration) -> ExternalStatus {
        let config = self.config.clone();
        let initial = self.status;
        wait::poll_until(&config, initial, Some(timeout), || self.poll(false))
    }

    /// Send the configured kill signal without waiting for the exit
    pub fn kill(&mut self) -> SignalDelivery {
        self.signal(self.config.kill_signal)
    }

    /// Send `sig` to the process
    ///
    /// A process that is already gone counts as success. Any other delivery
    /// failure moves the entry to `KILL_FAILED`.
    pub fn signal(&mut self, sig: Signal) -> SignalDelivery {
        let pid = match self.pid {
            Some(pid) => pid,
            None => return SignalDelivery::Skipped,
        };
        let target = nix::unistd::Pid::from_raw(pid as i32);

        match signal::kill(target, sig) {
            Ok(()) => {
                debug!(pid, signal = %sig, "signal delivered");
                if self.status == ExternalStatus::KillFailed {
                    self.status = self.before_kill_failure;
                }
                // A stopped child only acts on the signal once resumed
                if matches!(self.status, ExternalStatus::Stopped { .. })
                    && !matches!(sig, Signal::SIGKILL | Signal::SIGCONT | Signal::SIGSTOP)
                {
                    let _ = signal::kill(target, Signal::SIGCONT);
                }
                SignalDelivery::Delivered
            }
            Err(Errno::ESRCH) => {
                debug!(pid, signal = %sig, "process already exited");
                SignalDelivery::AlreadyExited
            }
            Err(errno) => {
                warn!(pid, signal = %sig, error = %errno, "signal delivery failed");
                self.mark_kill_failed();
                SignalDelivery::Failed
            }
        }
    }

    /// Write all of `data` to the child's stdin
    pub fn write_input(&mut self, data: &[u8]) -> ProcessResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| ProcessError::ChannelClosed("stdin".to_string()))?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// Read whatever the child has written to stdout, blocking until some
    /// data or EOF is available; `Ok(0)` is EOF
    pub fn read_output(&mut self, buf: &mut [u8]) -> ProcessResult<usize> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ProcessError::ChannelClosed("stdout".to_string()))?;
        Ok(reader.read(buf)?)
    }

    /// Drain stdout until the child closes it
    pub fn read_to_end(&mut self) -> ProcessResult<Vec<u8>> {
        let mut output = Vec::new();
        let mut chunk = vec![0u8; CHANNEL_READ_CHUNK];
        loop {
            let n = self.read_output(&mut chunk)?;
            if n == 0 {
                return Ok(output);
            }
            output.extend_from_slice(&chunk[..n]);
        }
    }

    /// Close stdin so the child sees EOF
    pub fn close_input(&mut self) -> ProcessResult<()> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| ProcessError::ChannelClosed("stdin".to_string()))?;
        writer.close()?;
        Ok(())
    }

    /// Hand the stdout end to the caller, e.g. for a reader thread
    pub fn take_reader(&mut self) -> Option<ChannelReader> {
        self.reader.take()
    }

    /// Hand the stdin end to the caller
    pub fn take_writer(&mut self) -> Option<ChannelWriter> {
        self.writer.take()
    }

    /// Put back a channel end checked out with `take_reader`
    ///
    /// Closed instead when the entry was released meanwhile.
    pub(crate) fn restore_reader(&mut self, reader: ChannelReader) {
        if !self.released && self.reader.is_none() {
            self.reader = Some(reader);
        }
    }

    pub(crate) fn restore_writer(&mut self, writer: ChannelWriter) {
        if !self.released && self.writer.is_none() {
            self.writer = Some(writer);
        }
    }

    /// Close both channels and, if the child is still live, try once to reap it
    ///
    /// Idempotent. With `kill_on_release` the child is signalled first. A
    /// child that has not exited yet is left running; its pid stays
    /// available through `pid()` so the owner can reap it later.
    /// `ProcessSupervisor::release` does that automatically.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if self.pid.is_some() {
            if self.config.kill_on_release {
                self.kill();
            }
            self.poll(false);
        }

        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.close() {
                debug!(error = %e, "stdin close on release failed");
            }
        }
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.close() {
                debug!(error = %e, "stdout close on release failed");
            }
        }

        debug!(
            executable = %self.executable,
            status = %self.status,
            pid = ?self.pid,
            "external process released"
        );
    }

    /// Give up the pid of a released, still-live child
    ///
    /// Afterwards the entry answers every poll from its cached status and
    /// never signals or waits on that pid again.
    pub(crate) fn detach_pid(&mut self) -> Option<Pid> {
        if !self.released {
            return None;
        }
        self.pid.take()
    }

    fn mark_kill_failed(&mut self) {
        if self.status != ExternalStatus::KillFailed {
            self.before_kill_failure = self.status;
        }
        self.status = ExternalStatus::KillFailed;
    }

    fn apply(&mut self, observation: Observation) -> ExternalStatus {
        let next = wait::next_status(self.status, self.before_kill_failure, observation);
        if next != self.status {
            debug!(
                pid = ?self.pid,
                from = %self.status,
                to = %next,
                "status changed"
            );
            self.status = next;
        }
        if next.is_terminal() {
            // Retire the pid: the OS may hand it to an unrelated process
            self.pid = None;
        }
        next
    }
}

impl Drop for ExternalProcess {
    fn drop(&mut self) {
        self.release();
    }
}
