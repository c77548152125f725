// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Processing stages that log records pass through after emission.
//!
//! Every stage implements [`LogRecordProcessor`], so stages compose into a
//! tree built once when the provider is configured:
//!
//! ```text
//!                 ┌────────────────────┐
//!                 │  LoggerProvider    │
//!                 └─────────┬──────────┘
//!                           │ on_emit
//!                           v
//!              ┌─────────────────────────┐
//!              │ SeverityBased (>= WARN) │  drop below threshold
//!              └────────────┬────────────┘
//!                           │
//!                           v
//!                 ┌───────────────────┐
//!                 │  Multi (fan-out)  │
//!                 └───┬───────────┬───┘
//!                     │           │
//!                     v           v
//!            ┌────────────┐  ┌──────────────┐
//!            │   Simple   │  │    Batch     │  (worker thread)
//!            └─────┬──────┘  └──────┬───────┘
//!                  │                │
//!                  v                v
//!             [Exporter]       [Exporter]
//! ```
//!
//! # Components
//!
//! - **[`severity`]**: forwards records at or above a minimum severity
//! - **[`trace_based`]**: forwards records correlated with a sampled span
//! - **[`multi`]**: forwards every record to all children
//! - **[`simple`]**: exports each record as it is emitted
//! - **[`batch`]**: buffers records and exports them in batches from a worker
//!
//! # Failure containment
//!
//! `on_emit` never reports failures. A child that panics is caught and logged
//! so its siblings still see the record. Flush and shutdown report failures
//! through the returned [`CompletableResult`].

use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

use crate::export::LogRecordExporter;
use crate::record::LogRecord;
use crate::result::CompletableResult;
use crate::trace::Context;

pub mod batch;
pub mod multi;
pub mod severity;
pub mod simple;
pub mod trace_based;

pub use batch::{BatchLogRecordProcessor, BatchLogRecordProcessorBuilder, BatchState};
pub use multi::MultiLogRecordProcessor;
pub use severity::{SeverityBasedLogRecordProcessor, SeverityBasedLogRecordProcessorBuilder};
pub use simple::SimpleLogRecordProcessor;
pub use trace_based::{TraceBasedLogRecordProcessor, TraceBasedLogRecordProcessorBuilder};

/// A stage of the emission pipeline.
pub trait LogRecordProcessor: Send + Sync + Debug {
    /// Called on the emitting thread. Must not block for long and must not panic
    /// into the caller.
    fn on_emit(&self, context: &Context, record: &Arc<LogRecord>);

    /// Exports everything buffered in this stage and below.
    fn force_flush(&self) -> CompletableResult;

    /// Flushes, then releases resources. Only the first call has any effect.
    fn shutdown(&self) -> CompletableResult;
}

/// Runs `f` for one child, logging instead of unwinding into the caller.
pub(crate) fn guard_emit(child: &dyn LogRecordProcessor, f: impl FnOnce()) {
    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(f)) {
        error!(
            "Log record processor {:?} panicked in on_emit: {}",
            child,
            panic_message(&panic)
        );
    }
}

/// Runs a lifecycle call for one child; a panic becomes a failed result.
pub(crate) fn guard_lifecycle(
    child: &dyn LogRecordProcessor,
    operation: &str,
    f: impl FnOnce() -> CompletableResult,
) -> CompletableResult {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            error!(
                "Log record processor {:?} panicked in {}: {}",
                child,
                operation,
                panic_message(&panic)
            );
            CompletableResult::of_failure()
        }
    }
}

/// Runs an exporter call; a panic becomes a failed result.
pub(crate) fn guard_export(
    exporter: &dyn LogRecordExporter,
    operation: &str,
    f: impl FnOnce() -> CompletableResult,
) -> CompletableResult {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            error!(
                "Log record exporter {:?} panicked in {}: {}",
                exporter,
                operation,
                panic_message(&panic)
            );
            CompletableResult::of_failure()
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
