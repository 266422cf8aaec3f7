/*!
 * Core Module
 * Fundamental types, limits, guards, and error handling
 */

pub mod errors;
#[cfg(unix)]
pub mod guard;
pub mod limits;
pub mod serde;
pub mod types;

// Re-export for convenience
pub use errors::*;
#[cfg(unix)]
pub use guard::{FdGuard, Guard, GuardDrop, GuardError, GuardResult};
pub use types::*;
