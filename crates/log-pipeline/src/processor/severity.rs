// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use super::{LogRecordProcessor, MultiLogRecordProcessor};
use crate::error::PipelineError;
use crate::record::LogRecord;
use crate::result::CompletableResult;
use crate::severity::Severity;
use crate::trace::Context;

/// Forwards records whose severity is at least `minimum_severity`.
///
/// Records without a severity never pass.
#[derive(Debug)]
pub struct SeverityBasedLogRecordProcessor {
    minimum_severity: Severity,
    delegate: MultiLogRecordProcessor,
}

impl SeverityBasedLogRecordProcessor {
    #[must_use]
    pub fn builder(minimum_severity: Severity) -> SeverityBasedLogRecordProcessorBuilder {
        SeverityBasedLogRecordProcessorBuilder {
            minimum_severity,
            processors: Vec::new(),
        }
    }

    #[must_use]
    pub fn minimum_severity(&self) -> Severity {
        self.minimum_severity
    }

    fn accepts(&self, record: &LogRecord) -> bool {
        record
            .severity()
            .is_some_and(|severity| severity.number() >= self.minimum_severity.number())
    }
}

impl LogRecordProcessor for SeverityBasedLogRecordProcessor {
    fn on_emit(&self, context: &Context, record: &Arc<LogRecord>) {
        if self.accepts(record) {
            self.delegate.on_emit(context, record);
        }
    }

    fn force_flush(&self) -> CompletableResult {
        self.delegate.force_flush()
    }

    fn shutdown(&self) -> CompletableResult {
        self.delegate.shutdown()
    }
}

#[derive(Debug)]
pub struct SeverityBasedLogRecordProcessorBuilder {
    minimum_severity: Severity,
    processors: Vec<Arc<dyn LogRecordProcessor>>,
}

impl SeverityBasedLogRecordProcessorBuilder {
    #[must_use]
    pub fn add_processor(mut self, processor: Arc<dyn LogRecordProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    #[must_use]
    pub fn add_processors<I>(mut self, processors: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn LogRecordProcessor>>,
    {
        self.processors.extend(processors);
        self
    }

    pub fn build(self) -> Result<SeverityBasedLogRecordProcessor, PipelineError> {
        if self.processors.is_empty() {
            return Err(PipelineError::invalid(
                "at least one processor must be configured",
            ));
        }
        Ok(SeverityBasedLogRecordProcessor {
            minimum_severity: self.minimum_severity,
            delegate: MultiLogRecordProcessor::new(self.processors),
        })
    }
}
