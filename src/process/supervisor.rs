/*!
 * Process Supervisor
 * Registry of external processes keyed by opaque id, with a pid index
 *
 * Each entry sits behind its own lock, so operations on unrelated
 * processes never contend. Blocking waits probe without holding the
 * entry lock between probes, which keeps `kill` usable while another
 * thread waits on the same process.
 */

use super::channel::{ChannelReader, ChannelWriter};
use super::config::SupervisorConfig;
use super::external::ExternalProcess;
use super::reaper::Reaper;
use super::stats::{AtomicSupervisorStats, SupervisorStats};
use super::types::{ExternalId, ExternalStatus, ProcessSummary, SignalDelivery, SpawnConfig};
use super::wait;
use crate::core::errors::{ConfigError, ProcessError, ProcessResult};
use crate::core::types::Pid;
use crate::monitoring::span_lifecycle;
use ahash::RandomState;
use dashmap::DashMap;
use nix::sys::signal::Signal;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type Entry = Arc<Mutex<ExternalProcess>>;

/// Owns every external process it spawns
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct ProcessSupervisor {
    processes: Arc<DashMap<ExternalId, Entry, RandomState>>,
    pids: Arc<DashMap<Pid, ExternalId, RandomState>>,
    next_id: Arc<AtomicU64>,
    config: SupervisorConfig,
    stats: Arc<AtomicSupervisorStats>,
    reaper: Arc<Reaper>,
}

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self::with_config(SupervisorConfig::new())
    }

    /// Supervisor with explicit settings
    ///
    /// An invalid configuration is logged and used as is; probe sleeps
    /// never drop below `MIN_POLL_INTERVAL` either way.
    pub fn with_config(config: SupervisorConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "supervisor configuration is invalid");
        }
        info!(
            kill_signal = %config.kill_signal,
            kill_on_release = config.kill_on_release,
            "process supervisor initialized"
        );
        Self {
            processes: Arc::new(DashMap::with_hasher(RandomState::new())),
            pids: Arc::new(DashMap::with_hasher(RandomState::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            config,
            stats: Arc::new(AtomicSupervisorStats::new()),
            reaper: Arc::new(Reaper::new()),
        }
    }

    /// Supervisor configured from `PROCVISOR_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::with_config(SupervisorConfig::from_env()?))
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Spawn a process and register it
    ///
    /// Failed spawns are registered too, in `PIPE_FAILED` or `FORK_FAILED`,
    /// so their cause can be inspected and the entry released like any
    /// other. Only malformed input is returned as an error.
    pub fn spawn(&self, spawn: &SpawnConfig) -> ProcessResult<ExternalId> {
        self.reap_orphans();
        let id = ExternalId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let span = span_lifecycle("spawn", Some(id.as_u64()));
        let _entered = span.enter();

        let process = ExternalProcess::spawn(spawn, &self.config)?;
        let status = process.status();
        span.record_status(status.name());

        match status {
            ExternalStatus::PipeFailed => self.stats.inc_pipe_failures(),
            ExternalStatus::ForkFailed => self.stats.inc_fork_failures(),
            _ => self.stats.inc_spawned(),
        }
        if let Some(pid) = process.pid() {
            self.pids.insert(pid, id);
        }
        self.processes.insert(id, Arc::new(Mutex::new(process)));

        debug!(%id, %status, "external process registered");
        Ok(id)
    }

    /// Spawn `executable` with `args` and default settings
    pub fn spawn_command<I, S>(&self, executable: &str, args: I) -> ProcessResult<ExternalId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spawn(&SpawnConfig::new(executable).with_args(args))
    }

    /// Last known status, without asking the OS
    pub fn status(&self, id: ExternalId) -> ProcessResult<ExternalStatus> {
        Ok(self.entry(id)?.lock().status())
    }

    /// Refresh the status from the OS
    ///
    /// Non-blocking polls return immediately. A blocking poll returns once
    /// the process exits, stops or resumes; use `wait_timeout` to bound it.
    pub fn poll(&self, id: ExternalId, block: bool) -> ProcessResult<ExternalStatus> {
        let entry = self.entry(id)?;
        if block {
            let initial = entry.lock().status();
            Ok(wait::poll_until(&self.config, initial, None, || {
                self.probe(&entry)
            }))
        } else {
            Ok(self.probe(&entry))
        }
    }

    /// Poll until the status changes or `timeout` elapses
    pub fn wait_timeout(&self, id: ExternalId, timeout: Duration) -> ProcessResult<ExternalStatus> {
        let entry = self.entry(id)?;
        let initial = entry.lock().status();
        Ok(wait::poll_until(&self.config, initial, Some(timeout), || {
            self.probe(&entry)
        }))
    }

    /// Send the configured kill signal; does not wait for the exit
    pub fn kill(&self, id: ExternalId) -> ProcessResult<SignalDelivery> {
        self.signal(id, self.config.kill_signal)
    }

    /// Send an arbitrary signal
    pub fn signal(&self, id: ExternalId, sig: Signal) -> ProcessResult<SignalDelivery> {
        let delivery = self.entry(id)?.lock().signal(sig);
        match delivery {
            SignalDelivery::Delivered => self.stats.inc_kills_delivered(),
            SignalDelivery::Failed => self.stats.inc_kill_failures(),
            SignalDelivery::AlreadyExited | SignalDelivery::Skipped => {}
        }
        Ok(delivery)
    }

    /// Write all of `data` to the child's stdin
    ///
    /// The stdin end is checked out of the entry for the duration of the
    /// write, so a concurrent writer on the same process sees
    /// `ChannelClosed` instead of interleaving.
    pub fn write_input(&self, id: ExternalId, data: &[u8]) -> ProcessResult<()> {
        use std::io::Write;

        self.with_writer(id, |writer| {
            writer.write_all(data)?;
            writer.flush()
        })
    }

    /// Read from the child's stdout; `Ok(0)` is EOF
    pub fn read_output(&self, id: ExternalId, buf: &mut [u8]) -> ProcessResult<usize> {
        use std::io::Read;

        self.with_reader(id, |reader| reader.read(buf))
    }

    /// Read the child's stdout until EOF
    pub fn read_to_end(&self, id: ExternalId) -> ProcessResult<Vec<u8>> {
        use std::io::Read;

        self.with_reader(id, |reader| {
            let mut output = Vec::new();
            reader.read_to_end(&mut output)?;
            Ok(output)
        })
    }

    /// Close the child's stdin so it sees EOF
    pub fn close_input(&self, id: ExternalId) -> ProcessResult<()> {
        self.entry(id)?.lock().close_input()
    }

    /// Move the stdout end out of the supervisor
    pub fn take_reader(&self, id: ExternalId) -> ProcessResult<Option<ChannelReader>> {
        Ok(self.entry(id)?.lock().take_reader())
    }

    /// Move the stdin end out of the supervisor
    pub fn take_writer(&self, id: ExternalId) -> ProcessResult<Option<ChannelWriter>> {
        Ok(self.entry(id)?.lock().take_writer())
    }

    /// OS pid while the process is live
    pub fn pid(&self, id: ExternalId) -> ProcessResult<Option<Pid>> {
        Ok(self.entry(id)?.lock().pid())
    }

    /// Entry currently holding `pid`, if any
    pub fn find_by_pid(&self, pid: Pid) -> Option<ExternalId> {
        self.pids.get(&pid).map(|id| *id)
    }

    pub fn summary(&self, id: ExternalId) -> ProcessResult<ProcessSummary> {
        let entry = self.entry(id)?;
        let process = entry.lock();
        Ok(ProcessSummary {
            id,
            executable: process.executable().to_string(),
            arguments: process.arguments().to_vec(),
            pid: process.pid(),
            status: process.status(),
            spawn_error: process.spawn_error().map(ToString::to_string),
        })
    }

    /// Remove an entry, closing its channels and reaping it if it has exited
    ///
    /// A child that is still running is not waited for. The supervisor
    /// keeps its pid and reaps it once it exits, during later `spawn`,
    /// `poll`, `release`, `shutdown` or `reap_orphans` calls.
    ///
    /// Returns the final status, or `None` when the id is not (or no longer)
    /// registered; releasing twice is harmless.
    pub fn release(&self, id: ExternalId) -> Option<ExternalStatus> {
        let (_, entry) = self.processes.remove(&id)?;
        let status = {
            let mut process = entry.lock();

            let pid = process.pid();
            process.release();
            let status = process.status();

            if let Some(pid) = pid {
                self.pids.remove_if(&pid, |_, owner| *owner == id);
                if status.is_terminal() {
                    self.stats.inc_reaped();
                } else {
                    // Under the entry lock: other handles see no pid after this
                    if let Some(pid) = process.detach_pid() {
                        self.reaper.adopt(pid);
                    }
                    self.stats.dec_live();
                }
            }
            status
        };

        self.reap_orphans();
        debug!(%id, %status, "external process released");
        Some(status)
    }

    /// Reap released children that have exited since; returns how many
    pub fn reap_orphans(&self) -> usize {
        let reaped = self.reaper.sweep();
        if reaped > 0 {
            self.stats.add_orphans_reaped(reaped as u64);
            debug!(reaped, "released children reaped");
        }
        reaped
    }

    /// Released children still waiting to be reaped
    pub fn orphans(&self) -> usize {
        self.reaper.pending()
    }

    /// Number of registered entries, live or not
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Every registered id, ascending
    pub fn ids(&self) -> Vec<ExternalId> {
        let mut ids: Vec<ExternalId> = self.processes.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Ids whose last known status is not terminal, ascending
    pub fn live_ids(&self) -> Vec<ExternalId> {
        let entries: Vec<(ExternalId, Entry)> = self
            .processes
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();

        let mut ids: Vec<ExternalId> = entries
            .into_iter()
            .filter(|(_, entry)| entry.lock().status().is_live())
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats.snapshot()
    }

    /// Tear down every entry
    ///
    /// Live processes get the kill signal and up to `shutdown_grace` to
    /// exit, then all entries are released. Returns how many were released.
    pub fn shutdown(&self) -> usize {
        let span = span_lifecycle("shutdown", None);
        let _entered = span.enter();

        let live = self.live_ids();
        for id in &live {
            let _ = self.kill(*id);
        }
        for id in &live {
            let _ = self.wait_timeout(*id, self.config.shutdown_grace);
        }

        let released = self
            .ids()
            .into_iter()
            .filter_map(|id| self.release(id))
            .count();

        self.reap_orphans();
        let orphans = self.orphans();
        if orphans > 0 {
            warn!(orphans, "released children still running at shutdown");
        }

        info!(released, signalled = live.len(), "process supervisor shut down");
        span.record_status("done");
        released
    }

    fn entry(&self, id: ExternalId) -> ProcessResult<Entry> {
        self.processes
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ProcessError::UnknownProcess(id.as_u64()))
    }

    /// One non-blocking poll, keeping the pid index and counters in step
    fn probe(&self, entry: &Entry) -> ExternalStatus {
        let status = {
            let mut process = entry.lock();
            let pid = process.pid();
            let status = process.poll(false);

            if let (Some(pid), true) = (pid, status.is_terminal()) {
                if let Some((_, id)) = self.pids.remove(&pid) {
                    debug!(%id, pid, %status, "pid retired");
                }
                self.stats.inc_reaped();
            }
            status
        };

        self.reap_orphans();
        status
    }

    fn with_writer<T, F>(&self, id: ExternalId, f: F) -> ProcessResult<T>
    where
        F: FnOnce(&mut ChannelWriter) -> io::Result<T>,
    {
        let entry = self.entry(id)?;
        let mut writer = entry
            .lock()
            .take_writer()
            .ok_or_else(|| ProcessError::ChannelClosed("stdin".to_string()))?;
        let result = f(&mut writer);
        entry.lock().restore_writer(writer);
        result.map_err(ProcessError::from)
    }

    fn with_reader<T, F>(&self, id: ExternalId, f: F) -> ProcessResult<T>
    where
        F: FnOnce(&mut ChannelReader) -> io::Result<T>,
    {
        let entry = self.entry(id)?;
        let mut reader = entry
            .lock()
            .take_reader()
            .ok_or_else(|| ProcessError::ChannelClosed("stdout".to_string()))?;
        let result = f(&mut reader);
        entry.lock().restore_reader(reader);
        result.map_err(ProcessError::from)
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
