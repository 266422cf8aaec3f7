/*!
 * Spawn Validation
 * Rejects malformed spawn requests before any OS resource is created
 */

use super::types::SpawnConfig;
use crate::core::errors::{ProcessError, ProcessResult};

/// Validate a spawn request
///
/// Arguments are never interpreted by a shell, so metacharacters are fine;
/// only inputs that cannot be turned into a C string or name no program at
/// all are rejected.
pub(super) fn validate_spawn(config: &SpawnConfig) -> ProcessResult<()> {
    validate_executable(&config.executable)?;

    for (index, arg) in config.args.iter().enumerate() {
        if arg.contains('\0') {
            return Err(ProcessError::InvalidExecutable(format!(
                "argument {} contains a NUL byte",
                index
            )));
        }
    }

    for (key, value) in &config.env_vars {
        if key.is_empty() || key.contains('=') || key.contains('\0') || value.contains('\0') {
            return Err(ProcessError::InvalidExecutable(format!(
                "invalid environment entry {:?}",
                key
            )));
        }
    }

    Ok(())
}

fn validate_executable(executable: &str) -> ProcessResult<()> {
    if executable.trim().is_empty() {
        return Err(ProcessError::InvalidExecutable(
            "executable path is empty".to_string(),
        ));
    }

    if executable.contains('\0') {
        return Err(ProcessError::InvalidExecutable(
            "executable path contains a NUL byte".to_string(),
        ));
    }

    Ok(())
}
