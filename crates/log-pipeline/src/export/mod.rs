// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Terminal sinks that receive batches of finished records.

use std::fmt::Debug;
use std::sync::Arc;

use crate::record::LogRecord;
use crate::result::CompletableResult;

pub mod in_memory;
pub mod json_lines;

pub use in_memory::InMemoryLogRecordExporter;
pub use json_lines::JsonLinesExporter;

/// Sends finished records somewhere outside the pipeline.
///
/// Processors call `export` with at most one batch in flight per stage, so
/// implementations do not need to handle concurrent exports from the same
/// batching stage. Failures are reported through the returned result.
pub trait LogRecordExporter: Send + Sync + Debug {
    fn export(&self, batch: Vec<Arc<LogRecord>>) -> CompletableResult;

    /// Pushes out anything the exporter buffers internally.
    fn force_flush(&self) -> CompletableResult {
        CompletableResult::of_success()
    }

    fn shutdown(&self) -> CompletableResult;
}
