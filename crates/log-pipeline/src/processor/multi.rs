// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{guard_emit, guard_lifecycle, LogRecordProcessor};
use crate::record::LogRecord;
use crate::result::CompletableResult;
use crate::trace::Context;

/// Forwards every record to all children, in order.
#[derive(Debug)]
pub struct MultiLogRecordProcessor {
    processors: Vec<Arc<dyn LogRecordProcessor>>,
    is_shutdown: AtomicBool,
}

impl MultiLogRecordProcessor {
    #[must_use]
    pub fn new(processors: Vec<Arc<dyn LogRecordProcessor>>) -> Self {
        Self {
            processors,
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Collapses a single processor instead of wrapping it.
    #[must_use]
    pub fn create(mut processors: Vec<Arc<dyn LogRecordProcessor>>) -> Arc<dyn LogRecordProcessor> {
        if processors.len() == 1 {
            if let Some(only) = processors.pop() {
                return only;
            }
        }
        Arc::new(Self::new(processors))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl LogRecordProcessor for MultiLogRecordProcessor {
    fn on_emit(&self, context: &Context, record: &Arc<LogRecord>) {
        for processor in &self.processors {
            guard_emit(processor.as_ref(), || processor.on_emit(context, record));
        }
    }

    fn force_flush(&self) -> CompletableResult {
        CompletableResult::of_all(self.processors.iter().map(|processor| {
            guard_lifecycle(processor.as_ref(), "force_flush", || {
                processor.force_flush()
            })
        }))
    }

    fn shutdown(&self) -> CompletableResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            debug!("Multi log record processor already shut down");
            return CompletableResult::of_success();
        }
        CompletableResult::of_all(self.processors.iter().map(|processor| {
            guard_lifecycle(processor.as_ref(), "shutdown", || processor.shutdown())
        }))
    }
}
