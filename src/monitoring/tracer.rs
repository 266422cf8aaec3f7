/*!
 * Structured Tracing
 * Subscriber setup and lifecycle spans using the tracing crate
 *
 * Features:
 * - JSON-formatted logs for structured parsing
 * - Per-operation spans correlated by external process id
 * - Slow-operation warnings with durations embedded in the trace
 */

use crate::core::limits::ENV_TRACE_JSON;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Operations slower than this are reported at warn level
const SLOW_OPERATION_MS: u128 = 100;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PROCVISOR_TRACE_JSON: Enable JSON output (default: false)
///
/// Calling this more than once is harmless; later calls keep the first
/// subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "structured tracing initialized");
    }
}

/// Span covering one lifecycle operation (spawn, wait, shutdown)
pub struct LifecycleSpan {
    span: Span,
    start: Instant,
    operation: &'static str,
}

impl LifecycleSpan {
    pub fn new(operation: &'static str, id: Option<u64>) -> Self {
        let span = span!(
            Level::DEBUG,
            "lifecycle",
            operation = operation,
            id = ?id,
            duration_us = tracing::field::Empty,
            status = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            operation,
        }
    }

    /// Record the status observed at the end of the operation
    pub fn record_status(&self, status: &str) {
        self.span.record("status", status);
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for LifecycleSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();

        if duration.as_millis() > SLOW_OPERATION_MS {
            warn!(
                operation = self.operation,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow lifecycle operation"
            );
        } else {
            debug!(
                operation = self.operation,
                duration_us = duration.as_micros() as u64,
                "lifecycle operation completed"
            );
        }
    }
}

/// Helper to create a lifecycle span
#[inline]
pub fn span_lifecycle(operation: &'static str, id: Option<u64>) -> LifecycleSpan {
    LifecycleSpan::new(operation, id)
}
