/*!
 * Process Module
 * External process spawning, status tracking, and supervision
 */

mod channel;
pub mod config;
mod external;
mod reaper;
mod stats;
mod supervisor;
pub mod types;
mod validation;
mod wait;

// Re-export for convenience
pub use channel::{ChannelReader, ChannelWriter};
pub use config::SupervisorConfig;
pub use external::ExternalProcess;
pub use stats::{AtomicSupervisorStats, SupervisorStats};
pub use supervisor::ProcessSupervisor;
pub use types::{ExternalId, ExternalStatus, ProcessSummary, SignalDelivery, SpawnConfig};

pub use nix::sys::signal::Signal;
