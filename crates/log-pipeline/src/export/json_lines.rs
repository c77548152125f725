// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

use super::LogRecordExporter;
use crate::record::LogRecord;
use crate::result::CompletableResult;

/// Writes one JSON object per record, newline separated.
pub struct JsonLinesExporter<W: Write + Send> {
    writer: Mutex<W>,
    is_shutdown: AtomicBool,
}

impl<W: Write + Send> fmt::Debug for JsonLinesExporter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLinesExporter")
            .field("is_shutdown", &self.is_shutdown.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl JsonLinesExporter<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesExporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Returns the writer, dropping the exporter.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_batch(&self, batch: &[Arc<LogRecord>]) -> io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        for record in batch {
            serde_json::to_writer(&mut *writer, record.as_ref())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl<W: Write + Send> LogRecordExporter for JsonLinesExporter<W> {
    fn export(&self, batch: Vec<Arc<LogRecord>>) -> CompletableResult {
        if self.is_shutdown.load(Ordering::Acquire) {
            debug!("JSON lines exporter is shut down, dropping {} records", batch.len());
            return CompletableResult::of_failure();
        }
        match self.write_batch(&batch) {
            Ok(()) => CompletableResult::of_success(),
            Err(e) => {
                error!("Failed to write {} log records: {}", batch.len(), e);
                CompletableResult::of_failure()
            }
        }
    }

    fn force_flush(&self) -> CompletableResult {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        match writer.flush() {
            Ok(()) => CompletableResult::of_success(),
            Err(e) => {
                error!("Failed to flush log record writer: {}", e);
                CompletableResult::of_failure()
            }
        }
    }

    fn shutdown(&self) -> CompletableResult {
        if self.is_shutdown.swap(true, Ordering::AcqRel) {
            return CompletableResult::of_success();
        }
        self.force_flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InstrumentationScope;
    use crate::severity::Severity;
    use serde_json::Value;

    fn record(body: &str, severity: Severity) -> Arc<LogRecord> {
        Arc::new(
            LogRecord::builder(Arc::new(InstrumentationScope::new("json")))
                .with_severity(severity)
                .with_body(body)
                .with_attribute("attempt", 3i64)
                .build(),
        )
    }

    #[test]
    fn test_writes_one_object_per_line() {
        let exporter = JsonLinesExporter::new(Vec::new());
        assert!(exporter
            .export(vec![record("first", Severity::Info), record("second", Severity::Error)])
            .is_success());

        let output = String::from_utf8(exporter.into_inner()).expect("utf8 output");
        let lines: Vec<Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).expect("valid json line"))
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["body"], "first");
        assert_eq!(lines[0]["severity"], 9);
        assert_eq!(lines[0]["attributes"]["attempt"], 3);
        assert_eq!(lines[0]["scope"]["name"], "json");
        assert_eq!(lines[1]["body"], "second");
        assert_eq!(lines[1]["severity"], 17);
    }

    #[test]
    fn test_export_after_shutdown_fails() {
        let exporter = JsonLinesExporter::new(Vec::new());
        assert!(exporter.shutdown().is_success());
        assert!(exporter.shutdown().is_success());
        assert!(!exporter.export(vec![record("late", Severity::Warn)]).is_success());
        assert!(exporter.into_inner().is_empty());
    }

    #[derive(Debug)]
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_write_error_fails_the_batch() {
        let exporter = JsonLinesExporter::new(BrokenWriter);
        assert!(!exporter.export(vec![record("x", Severity::Info)]).is_success());
        assert!(!exporter.force_flush().is_success());
    }
}
