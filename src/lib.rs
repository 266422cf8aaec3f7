/*!
 * procvisor
 * External process supervision and resource introspection
 */

pub mod core;
pub mod monitoring;
#[cfg(unix)]
pub mod process;

// Re-exports
pub use crate::core::errors::*;
pub use monitoring::{
    init_tracing, process_size, set_process_title, snapshot, snapshot_self, AccountingCapability,
    ProcessInfo, ProcessTarget,
};
#[cfg(unix)]
pub use process::{
    ExternalId, ExternalProcess, ExternalStatus, ProcessSupervisor, SignalDelivery, SpawnConfig,
    SupervisorConfig,
};
