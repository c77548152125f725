// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use super::{LogRecordProcessor, MultiLogRecordProcessor};
use crate::error::PipelineError;
use crate::record::LogRecord;
use crate::result::CompletableResult;
use crate::trace::Context;

/// Forwards only records correlated with a valid, sampled span.
#[derive(Debug)]
pub struct TraceBasedLogRecordProcessor {
    delegate: MultiLogRecordProcessor,
}

impl TraceBasedLogRecordProcessor {
    #[must_use]
    pub fn builder() -> TraceBasedLogRecordProcessorBuilder {
        TraceBasedLogRecordProcessorBuilder {
            processors: Vec::new(),
        }
    }
}

impl LogRecordProcessor for TraceBasedLogRecordProcessor {
    fn on_emit(&self, context: &Context, record: &Arc<LogRecord>) {
        let sampled = record
            .span_context()
            .is_some_and(|span| span.is_valid() && span.is_sampled());
        if sampled {
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

#[derive(Debug, Default)]
pub struct TraceBasedLogRecordProcessorBuilder {
    processors: Vec<Arc<dyn LogRecordProcessor>>,
}

impl TraceBasedLogRecordProcessorBuilder {
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

    pub fn build(self) -> Result<TraceBasedLogRecordProcessor, PipelineError> {
        if self.processors.is_empty() {
            return Err(PipelineError::invalid(
                "at least one processor must be configured",
            ));
        }
        Ok(TraceBasedLogRecordProcessor {
            delegate: MultiLogRecordProcessor::new(self.processors),
        })
    }
}
