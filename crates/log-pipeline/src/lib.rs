// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-process log record pipeline.
//!
//! Records are created through a [`Logger`], gated by the logger's
//! [`LoggerConfig`], frozen into an immutable [`LogRecord`] and handed to a
//! tree of [`LogRecordProcessor`]s. Processors filter, fan out, export
//! directly or buffer for batched export through a [`LogRecordExporter`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use log_pipeline::{
//!     BatchLogRecordProcessor, JsonLinesExporter, LoggerProvider, Severity,
//!     SeverityBasedLogRecordProcessor,
//! };
//!
//! let batch = BatchLogRecordProcessor::builder(Arc::new(JsonLinesExporter::stdout())).build()?;
//! let filter = SeverityBasedLogRecordProcessor::builder(Severity::Warn)
//!     .add_processor(Arc::new(batch))
//!     .build()?;
//! let provider = LoggerProvider::builder().with_processor(Arc::new(filter)).build();
//!
//! provider
//!     .logger("checkout")
//!     .log_record_builder()
//!     .with_severity(Severity::Error)
//!     .with_body("payment declined")
//!     .emit();
//! provider.shutdown_with_timeout(std::time::Duration::from_secs(5))?;
//! ```
//!
//! ## Modules
//!
//! - [`logger`]: providers, loggers and per-scope configuration
//! - [`processor`]: filter, fan-out, simple and batching stages
//! - [`export`]: exporter trait and bundled exporters
//! - [`record`]: the record type and its limits
//! - [`config`]: batching and pipeline configuration from the environment
//! - [`diagnostics`]: formatter for the pipeline's own `tracing` output

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod flag;
pub mod logger;
pub mod processor;
pub mod record;
pub mod result;
pub mod severity;
pub mod trace;

pub use config::{BatchConfig, OverflowPolicy, PipelineConfig};
pub use error::PipelineError;
pub use export::{InMemoryLogRecordExporter, JsonLinesExporter, LogRecordExporter};
pub use flag::EventuallyVisibleBool;
pub use logger::{
    Clock, LogRecordBuilder, Logger, LoggerConfig, LoggerProvider, LoggerProviderBuilder,
    ScopeConfigurator, ScopeMatcher, SystemClock,
};
pub use processor::{
    BatchLogRecordProcessor, BatchState, LogRecordProcessor, MultiLogRecordProcessor,
    SeverityBasedLogRecordProcessor, SimpleLogRecordProcessor, TraceBasedLogRecordProcessor,
};
pub use record::{AnyValue, InstrumentationScope, LogLimits, LogRecord};
pub use result::{CompletableResult, Outcome};
pub use severity::Severity;
pub use trace::{Context, SpanContext, SpanId, TraceFlags, TraceId};
