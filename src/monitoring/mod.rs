/*!
 * Monitoring
 * Resource introspection and structured tracing
 */

pub mod introspect;
mod title;
mod tracer;

pub use introspect::{
    process_size, snapshot, snapshot_self, AccountingCapability, ProcessInfo, ProcessTarget,
};
pub use title::set_process_title;
pub use tracer::{init_tracing, span_lifecycle, LifecycleSpan};
