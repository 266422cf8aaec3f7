/*!
 * Process Title
 * Names the calling thread as shown by ps, top and /proc/<pid>/comm
 */

use crate::core::errors::{ProcessError, ProcessResult};
use crate::core::limits::PROCESS_TITLE_MAX;
use std::ffi::CString;
use tracing::debug;

/// Set the title of the calling thread
///
/// Called from the main thread this renames the process. Titles longer
/// than `PROCESS_TITLE_MAX` bytes are cut short by the kernel. On
/// platforms without a naming facility the call only logs.
pub fn set_process_title(title: &str) -> ProcessResult<()> {
    let name = CString::new(title)
        .map_err(|_| ProcessError::InvalidTitle("title contains a NUL byte".to_string()))?;
    apply_title(&name)?;
    debug!(title, truncated = title.len() > PROCESS_TITLE_MAX, "process title set");
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_title(name: &CString) -> ProcessResult<()> {
    nix::sys::prctl::set_name(name)
        .map_err(|e| ProcessError::Io(format!("prctl(PR_SET_NAME) failed: {}", e)))
}

#[cfg(not(target_os = "linux"))]
fn apply_title(name: &CString) -> ProcessResult<()> {
    debug!(title = ?name, "process titles are not supported on this platform");
    Ok(())
}
