/*!
 * procvisor - Command Line Entry Point
 *
 * - `run`: supervise one external command, stream its output, report status
 * - `info`: print a resource snapshot for a pid or for procvisor itself
 */

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, WrapErr};
use procvisor::monitoring::{snapshot, AccountingCapability, ProcessInfo, ProcessTarget};
use procvisor::{init_tracing, set_process_title};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "procvisor")]
#[command(version)]
#[command(about = "External process supervisor with resource introspection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command under supervision and exit with its exit code
    Run {
        /// Kill the command if it is still running after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the final status as JSON
        #[arg(long)]
        json: bool,

        /// Program and arguments, after `--`
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Show CPU, memory and fault counters for a process
    Info {
        /// Process id (default: procvisor itself)
        pid: Option<u32>,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let title = match cli.command {
        Commands::Run { .. } => "procvisor run",
        Commands::Info { .. } => "procvisor info",
    };
    if let Err(e) = set_process_title(title) {
        warn!(error = %e, "could not set process title");
    }

    let code = match cli.command {
        Commands::Run {
            timeout_ms,
            json,
            command,
        } => run::execute(command, timeout_ms, json)?,
        Commands::Info { pid, json } => {
            show_info(pid, json)?;
            0
        }
    };

    std::process::exit(code);
}

fn show_info(pid: Option<u32>, json: bool) -> miette::Result<()> {
    let target = pid.map(ProcessTarget::Pid).unwrap_or(ProcessTarget::SelfProcess);
    let capability = AccountingCapability::current();
    info!(%target, ?capability, "taking snapshot");
    if pid.is_some() && !capability.supports_foreign_pids() {
        warn!(%target, "only procvisor itself can be measured on this platform");
    }

    let usage: ProcessInfo =
        snapshot(target).wrap_err_with(|| format!("cannot inspect {}", target))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&usage).into_diagnostic()?);
        return Ok(());
    }

    println!("target:          {}", target);
    println!("user time:       {:.3}s", usage.user_seconds());
    println!("system time:     {:.3}s", usage.system_seconds());
    println!("resident size:   {} bytes", usage.resident_size);
    println!("virtual size:    {} bytes", usage.virtual_size);
    println!("threads:         {}", usage.number_threads);
    println!("minor faults:    {}", usage.minor_page_faults);
    println!("major faults:    {}", usage.major_page_faults);
    println!("clock ticks/s:   {}", usage.sc_clk_tck);
    Ok(())
}

#[cfg(unix)]
mod run {
    use miette::{IntoDiagnostic, WrapErr};
    use procvisor::process::{ExternalId, ExternalStatus, ProcessSupervisor, Signal};
    use std::io;
    use std::time::{Duration, Instant};
    use tracing::warn;

    /// Exit code reported when the program could not be started
    const EXIT_NOT_STARTED: i32 = 127;

    pub fn execute(command: Vec<String>, timeout_ms: Option<u64>, json: bool) -> miette::Result<i32> {
        let supervisor = ProcessSupervisor::from_env().wrap_err("invalid PROCVISOR_* setting")?;
        let (executable, args) = command
            .split_first()
            .ok_or_else(|| miette::miette!("no command given"))?;

        let id = supervisor.spawn_command(executable, args.iter().cloned())?;

        // procvisor does not forward its own stdin
        let _ = supervisor.close_input(id);
        let forwarder = supervisor.take_reader(id)?.map(|mut reader| {
            std::thread::spawn(move || io::copy(&mut reader, &mut io::stdout().lock()))
        });

        let status = wait_for_exit(&supervisor, id, timeout_ms.map(Duration::from_millis))?;

        if let Some(handle) = forwarder {
            match handle.join() {
                Ok(Err(e)) => warn!(error = %e, "output forwarding stopped early"),
                Err(_) => warn!("output forwarding thread panicked"),
                Ok(Ok(_)) => {}
            }
        }

        let summary = supervisor.summary(id)?;
        if json {
            eprintln!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
        } else {
            match &summary.spawn_error {
                Some(error) => eprintln!("{}: {} ({})", summary.executable, summary.status, error),
                None => eprintln!("{}: {}", summary.executable, summary.status),
            }
        }
        supervisor.release(id);

        Ok(exit_code(status))
    }

    fn wait_for_exit(
        supervisor: &ProcessSupervisor,
        id: ExternalId,
        timeout: Option<Duration>,
    ) -> miette::Result<ExternalStatus> {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut status = supervisor.status(id)?;

        while status.is_live() {
            let Some(deadline) = deadline else {
                status = supervisor.poll(id, true)?;
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                status = supervisor.wait_timeout(id, remaining)?;
                continue;
            }

            warn!(%id, "timeout reached, killing");
            supervisor.kill(id)?;
            status = supervisor.wait_timeout(id, supervisor.config().shutdown_grace)?;
            if status.is_live() {
                supervisor.signal(id, Signal::SIGKILL)?;
                status = supervisor.poll(id, true)?;
            }
        }

        Ok(status)
    }

    fn exit_code(status: ExternalStatus) -> i32 {
        match status {
            ExternalStatus::Terminated { exit_code } => exit_code,
            ExternalStatus::Aborted { signal } => 128 + signal,
            ExternalStatus::PipeFailed | ExternalStatus::ForkFailed => EXIT_NOT_STARTED,
            _ => 1,
        }
    }
}

#[cfg(not(unix))]
mod run {
    pub fn execute(_: Vec<String>, _: Option<u64>, _: bool) -> miette::Result<i32> {
        miette::bail!("process supervision requires a Unix platform")
    }
}
