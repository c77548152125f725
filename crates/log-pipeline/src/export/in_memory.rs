// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::debug;

use super::LogRecordExporter;
use crate::record::LogRecord;
use crate::result::CompletableResult;

#[derive(Debug, Default)]
struct Exported {
    records: Vec<Arc<LogRecord>>,
    batch_sizes: Vec<usize>,
}

/// Keeps every exported record in memory and counts lifecycle calls.
///
/// Failure and latency can be injected to exercise the processors' error
/// paths. Once shut down, every export fails.
#[derive(Debug, Default)]
pub struct InMemoryLogRecordExporter {
    exported: Mutex<Exported>,
    export_calls: AtomicUsize,
    flush_calls: AtomicUsize,
    shutdown_calls: AtomicUsize,
    failing: AtomicBool,
    export_delay: Mutex<Option<Duration>>,
    is_shutdown: AtomicBool,
}

impl InMemoryLogRecordExporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn exported(&self) -> MutexGuard<'_, Exported> {
        self.exported.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// All records exported so far, in export order.
    #[must_use]
    pub fn finished_log_records(&self) -> Vec<Arc<LogRecord>> {
        self.exported().records.clone()
    }

    /// Size of every batch received, in export order.
    #[must_use]
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.exported().batch_sizes.clone()
    }

    /// Forgets exported records. Call counters are kept.
    pub fn reset(&self) {
        let mut exported = self.exported();
        exported.records.clear();
        exported.batch_sizes.clear();
    }

    /// When set, batches are recorded but their results fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Completes each export's result only after `delay`.
    pub fn set_export_delay(&self, delay: Option<Duration>) {
        *self
            .export_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = delay;
    }

    #[must_use]
    pub fn export_calls(&self) -> usize {
        self.export_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn flush_calls(&self) -> usize {
        self.flush_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn shutdown_calls(&self) -> usize {
        self.shutdown_calls.load(Ordering::SeqCst)
    }
}

impl LogRecordExporter for InMemoryLogRecordExporter {
    fn export(&self, batch: Vec<Arc<LogRecord>>) -> CompletableResult {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_shutdown.load(Ordering::SeqCst) {
            debug!("Dropping {} records exported after shutdown", batch.len());
            return CompletableResult::of_failure();
        }

        {
            let mut exported = self.exported();
            exported.batch_sizes.push(batch.len());
            exported.records.extend(batch);
        }

        let success = !self.failing.load(Ordering::SeqCst);
        let delay = *self
            .export_delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match delay {
            None if success => CompletableResult::of_success(),
            None => CompletableResult::of_failure(),
            Some(delay) => {
                let result = CompletableResult::new();
                let pending = result.clone();
                thread::spawn(move || {
                    thread::sleep(delay);
                    if success {
                        pending.succeed();
                    } else {
                        pending.fail();
                    }
                });
                result
            }
        }
    }

    fn force_flush(&self) -> CompletableResult {
        self.flush_calls.fetch_add(1, Ordering::SeqCst);
        CompletableResult::of_success()
    }

    fn shutdown(&self) -> CompletableResult {
        self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        self.is_shutdown.store(true, Ordering::SeqCst);
        CompletableResult::of_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InstrumentationScope;
    use crate::result::Outcome;

    fn record(body: &str) -> Arc<LogRecord> {
        Arc::new(
            LogRecord::builder(Arc::new(InstrumentationScope::new("memory")))
                .with_body(body)
                .build(),
        )
    }

    #[test]
    fn test_records_batches_in_order() {
        let exporter = InMemoryLogRecordExporter::new();
        assert!(exporter.export(vec![record("a"), record("b")]).is_success());
        assert!(exporter.export(vec![record("c")]).is_success());

        let bodies: Vec<_> = exporter
            .finished_log_records()
            .iter()
            .filter_map(|r| r.body().and_then(|b| b.as_str()).map(str::to_string))
            .collect();
        assert_eq!(bodies, vec!["a", "b", "c"]);
        assert_eq!(exporter.batch_sizes(), vec![2, 1]);
        assert_eq!(exporter.export_calls(), 2);
    }

    #[test]
    fn test_reset_clears_records_but_not_counters() {
        let exporter = InMemoryLogRecordExporter::new();
        let _ = exporter.export(vec![record("a")]);
        exporter.reset();
        assert!(exporter.finished_log_records().is_empty());
        assert_eq!(exporter.export_calls(), 1);
    }

    #[test]
    fn test_injected_failure() {
        let exporter = InMemoryLogRecordExporter::new();
        exporter.set_failing(true);
        let result = exporter.export(vec![record("a")]);
        assert!(result.is_done());
        assert!(!result.is_success());
    }

    #[test]
    fn test_injected_delay_completes_later() {
        let exporter = InMemoryLogRecordExporter::new();
        exporter.set_export_delay(Some(Duration::from_millis(50)));
        let result = exporter.export(vec![record("a")]);
        assert!(!result.is_done());
        assert_eq!(result.join(Duration::from_secs(5)), Outcome::Success);
    }

    #[test]
    fn test_export_after_shutdown_fails() {
        let exporter = InMemoryLogRecordExporter::new();
        assert!(exporter.shutdown().is_success());
        assert!(!exporter.export(vec![record("late")]).is_success());
        assert!(exporter.finished_log_records().is_empty());
        assert_eq!(exporter.shutdown_calls(), 1);
    }
}
