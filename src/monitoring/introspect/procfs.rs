/*!
 * procfs Backend
 * Reads `/proc/<pid>/stat` into a `ProcessInfo`
 */

use super::platform::{clock_ticks_per_second, page_size};
use super::types::{ProcessInfo, ProcessTarget};
use crate::core::errors::{IntrospectionError, IntrospectionResult};
use crate::core::limits::PROC_ROOT;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::trace;

// Field positions counted from the first field after the command name,
// i.e. `state` is 0. See proc(5); numbering there starts at pid = 1.
const FIELD_MINFLT: usize = 7;
const FIELD_MAJFLT: usize = 9;
const FIELD_UTIME: usize = 11;
const FIELD_STIME: usize = 12;
const FIELD_NUM_THREADS: usize = 17;
const FIELD_VSIZE: usize = 20;
const FIELD_RSS: usize = 21;

fn stat_path(target: ProcessTarget) -> PathBuf {
    match target {
        ProcessTarget::SelfProcess => PathBuf::from(PROC_ROOT).join("self").join("stat"),
        ProcessTarget::Pid(pid) => PathBuf::from(PROC_ROOT).join(pid.to_string()).join("stat"),
    }
}

/// Snapshot a process through procfs
pub fn snapshot(target: ProcessTarget) -> IntrospectionResult<ProcessInfo> {
    let path = stat_path(target);
    let contents = fs::read_to_string(&path).map_err(|e| lookup_error(target, &e))?;

    trace!(target = %target, path = %path.display(), "read stat file");
    Ok(parse_stat(&contents, page_size(), clock_ticks_per_second()))
}

fn lookup_error(target: ProcessTarget, err: &io::Error) -> IntrospectionError {
    let reason = match err.kind() {
        io::ErrorKind::NotFound => "no such process".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => err.to_string(),
    };
    IntrospectionError::lookup(target.pid(), reason)
}

/// Parse the contents of a stat file
///
/// Format: `pid (comm) state ppid ...`. The command name may itself contain
/// spaces and parentheses, so fields are counted from the last `)`.
/// Fields that are missing or not numeric are reported as zero.
pub fn parse_stat(contents: &str, page_size: u64, clk_tck: u64) -> ProcessInfo {
    let after_comm = match contents.rfind(')') {
        Some(close_paren) => &contents[close_paren + 1..],
        None => "",
    };
    let fields: Vec<&str> = after_comm.split_whitespace().collect();

    let field = |index: usize| -> u64 {
        fields
            .get(index)
            .and_then(|raw| raw.parse::<u64>().ok())
            .unwrap_or(0)
    };

    ProcessInfo {
        minor_page_faults: field(FIELD_MINFLT),
        major_page_faults: field(FIELD_MAJFLT),
        user_time: field(FIELD_UTIME),
        system_time: field(FIELD_STIME),
        number_threads: field(FIELD_NUM_THREADS),
        resident_size: field(FIELD_RSS).saturating_mul(page_size),
        virtual_size: field(FIELD_VSIZE),
        sc_clk_tck: clk_tck,
    }
}
