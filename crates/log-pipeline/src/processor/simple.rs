// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::{guard_export, LogRecordProcessor};
use crate::export::LogRecordExporter;
use crate::record::LogRecord;
use crate::result::CompletableResult;
use crate::trace::Context;

/// Exports every record on the emitting thread as a batch of one.
#[derive(Debug)]
pub struct SimpleLogRecordProcessor {
    exporter: Arc<dyn LogRecordExporter>,
    /// Exports that had not completed when `export` returned.
    in_flight: Mutex<Vec<CompletableResult>>,
    is_shutdown: AtomicBool,
}

impl SimpleLogRecordProcessor {
    #[must_use]
    pub fn new(exporter: Arc<dyn LogRecordExporter>) -> Self {
        Self {
            exporter,
            in_flight: Mutex::new(Vec::new()),
            is_shutdown: AtomicBool::new(false),
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, Vec<CompletableResult>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_in_flight(&self) -> Vec<CompletableResult> {
        let mut in_flight = self.in_flight();
        in_flight.retain(|result| !result.is_done());
        std::mem::take(&mut *in_flight)
    }

    /// Completes `then`'s result once `pending` and then `then` are done.
    fn after(
        pending: Vec<CompletableResult>,
        exporter: Arc<dyn LogRecordExporter>,
        operation: &'static str,
        then: fn(&dyn LogRecordExporter) -> CompletableResult,
    ) -> CompletableResult {
        let combined = CompletableResult::new();
        let completion = combined.clone();
        CompletableResult::of_all(pending).when_complete(move |exports_ok| {
            let result = guard_export(exporter.as_ref(), operation, || then(exporter.as_ref()));
            result.when_complete(move |ok| {
                if exports_ok && ok {
                    completion.succeed();
                } else {
                    completion.fail();
                }
            });
        });
        combined
    }
}

impl LogRecordProcessor for SimpleLogRecordProcessor {
    fn on_emit(&self, _context: &Context, record: &Arc<LogRecord>) {
        if self.is_shutdown.load(Ordering::Acquire) {
            return;
        }
        let result = guard_export(self.exporter.as_ref(), "export", || {
            self.exporter.export(vec![Arc::clone(record)])
        });
        result.when_complete(|success| {
            if !success {
                warn!("Failed to export log record");
            }
        });
        if !result.is_done() {
            let mut in_flight = self.in_flight();
            in_flight.retain(|pending| !pending.is_done());
            in_flight.push(result);
        }
    }

    fn force_flush(&self) -> CompletableResult {
        Self::after(
            self.take_in_flight(),
            Arc::clone(&self.exporter),
            "force_flush",
            |exporter| exporter.force_flush(),
        )
    }

    fn shutdown(&self) -> CompletableResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            debug!("Simple log record processor already shut down");
            return CompletableResult::of_success();
        }
        Self::after(
            self.take_in_flight(),
            Arc::clone(&self.exporter),
            "shutdown",
            |exporter| exporter.shutdown(),
        )
    }
}
