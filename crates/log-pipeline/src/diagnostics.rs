// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Formatter for the pipeline's own diagnostics.
//!
//! Lines are prefixed with `LOG_PIPELINE` so they can be told apart from the
//! records the pipeline forwards when both end up on the same stream:
//!
//! ```text
//! LOG_PIPELINE | LEVEL | [thread] target: [span_name{span_fields}: ]message {event_fields}
//! ```
//!
//! The thread and target columns are off by default. The batch worker runs
//! on a thread named `log-batch-worker`, so the thread column tells its
//! export diagnostics apart from those raised on the emitting threads.
//!
//! ```rust,ignore
//! let subscriber = tracing_subscriber::fmt()
//!     .with_ansi(false)
//!     .event_format(log_pipeline::diagnostics::Formatter::new().with_thread_names(true))
//!     .with_writer(std::io::stderr)
//!     .finish();
//! tracing::subscriber::set_global_default(subscriber)?;
//! ```

use std::fmt;
use std::thread;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

pub const PREFIX: &str = "LOG_PIPELINE";

#[derive(Debug, Clone, Copy, Default)]
pub struct Formatter {
    thread_names: bool,
    targets: bool,
}

impl Formatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prints the emitting thread's name, or its id when unnamed.
    #[must_use]
    pub fn with_thread_names(mut self, display: bool) -> Self {
        self.thread_names = display;
        self
    }

    /// Prints the event's target, usually the module path.
    #[must_use]
    pub fn with_targets(mut self, display: bool) -> Self {
        self.targets = display;
        self
    }
}

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "{} | {} | ", PREFIX, metadata.level())?;

        if self.thread_names {
            let current = thread::current();
            match current.name() {
                Some(name) => write!(writer, "[{name}] ")?,
                None => write!(writer, "[{:?}] ", current.id())?,
            }
        }
        if self.targets {
            write!(writer, "{}: ", metadata.target())?;
        }

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::{info_span, warn};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(formatter: Formatter, f: impl FnOnce()) -> String {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(formatter)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = capture.0.lock().expect("lock poisoned").clone();
        String::from_utf8(bytes).expect("utf8 output")
    }

    #[test]
    fn test_formats_level_and_message() {
        let output = capture(Formatter::new(), || warn!(dropped = 3, "Dropped log records"));
        assert_eq!(output, "LOG_PIPELINE | WARN | Dropped log records dropped=3\n");
    }

    #[test]
    fn test_includes_span_hierarchy() {
        let output = capture(Formatter::new(), || {
            let _outer = info_span!("batch_worker", stage = 1).entered();
            let _inner = info_span!("export").entered();
            warn!("Export timed out");
        });
        assert_eq!(
            output,
            "LOG_PIPELINE | WARN | batch_worker{stage=1}: export: Export timed out\n"
        );
    }

    #[test]
    fn test_thread_and_target_columns() {
        let formatter = Formatter::new().with_thread_names(true).with_targets(true);
        let output = thread::Builder::new()
            .name("log-batch-worker".to_string())
            .spawn(move || capture(formatter, || warn!("Export timed out")))
            .expect("failed to spawn thread")
            .join()
            .expect("thread panicked");
        assert_eq!(
            output,
            "LOG_PIPELINE | WARN | [log-batch-worker] log_pipeline::diagnostics::tests: Export timed out\n"
        );
    }
}
