// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use anyhow::{Context as _, Result};
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use log_pipeline::{
    diagnostics, BatchLogRecordProcessor, JsonLinesExporter, Logger, LoggerProvider,
    OverflowPolicy, PipelineConfig, Severity, SeverityBasedLogRecordProcessor,
};

const LOGGER_NAME: &str = "log-pipeline-forwarder";
/// Leading tokens searched for a level word.
const LEVEL_SEARCH_TOKENS: usize = 4;

#[tokio::main]
pub async fn main() -> Result<()> {
    let config = PipelineConfig::from_env().context("invalid pipeline configuration")?;
    init_logging(&config.log_level)?;
    debug!("Logging subsystem enabled");

    let provider = build_provider(&config)?;
    let logger = provider.logger(LOGGER_NAME);

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => error!("Failed to listen for interrupt: {e}"),
        }
        signal_cancel.cancel();
    });

    let blocking = matches!(config.batch.overflow_policy, OverflowPolicy::Block { .. });
    let forwarded = forward_stdin(&logger, &cancel, blocking).await;
    info!("Forwarded {forwarded} lines, shutting down pipeline");

    let shutdown_timeout = config.shutdown_timeout;
    tokio::task::spawn_blocking(move || provider.shutdown_with_timeout(shutdown_timeout))
        .await
        .context("shutdown task failed")?
        .context("pipeline did not shut down cleanly")?;

    debug!("Pipeline shut down");
    Ok(())
}

fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_level).context("could not parse log level in configuration")?,
        )
        .with_ansi(false)
        .event_format(diagnostics::Formatter::new().with_thread_names(true))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    Ok(())
}

/// `stdin lines -> severity filter -> batch -> JSON lines on stdout`
fn build_provider(config: &PipelineConfig) -> Result<LoggerProvider> {
    let batch = BatchLogRecordProcessor::builder(Arc::new(JsonLinesExporter::stdout()))
        .with_config(config.batch.clone())
        .build()?;
    let filter = SeverityBasedLogRecordProcessor::builder(config.min_severity)
        .add_processor(Arc::new(batch))
        .build()?;
    debug!(
        "Forwarding records at or above {} in batches of up to {}",
        config.min_severity, config.batch.max_export_batch_size
    );
    Ok(LoggerProvider::builder()
        .with_processor(Arc::new(filter))
        .build())
}

/// Emits every stdin line until EOF or cancellation. Returns the number of lines read.
async fn forward_stdin(logger: &Logger, cancel: &CancellationToken, blocking: bool) -> u64 {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut forwarded = 0u64;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    forward_line(logger, line, blocking);
                    forwarded += 1;
                }
                Ok(None) => {
                    debug!("Reached end of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read from stdin: {e}");
                    break;
                }
            },
        }
    }
    forwarded
}

/// With the blocking overflow policy an emit can wait on a full queue, so it
/// is moved off the runtime's worker for the duration.
fn forward_line(logger: &Logger, line: String, blocking: bool) {
    if blocking {
        tokio::task::block_in_place(|| emit_line(logger, line));
    } else {
        emit_line(logger, line);
    }
}

fn emit_line(logger: &Logger, line: String) {
    if line.trim().is_empty() {
        return;
    }
    let mut record = logger.log_record_builder();
    if let Some(severity) = infer_severity(&line) {
        record = record
            .with_severity(severity)
            .with_severity_text(severity.name());
    }
    record.with_body(line).emit();
}

/// Finds a level word such as `ERROR`, `[warn]` or `level=info` near the start of a line.
///
/// Bare words only count when upper case, so prose like "more info" is not a level.
fn infer_severity(line: &str) -> Option<Severity> {
    line.split_whitespace()
        .take(LEVEL_SEARCH_TOKENS)
        .find_map(|token| {
            let (token, explicit) = match token.split_once('=') {
                Some((key, value)) if key.eq_ignore_ascii_case("level") => (value, true),
                Some(_) => return None,
                None => (token, false),
            };
            let word = token.trim_matches(|c: char| !c.is_ascii_alphanumeric());
            if word.is_empty() || !(explicit || word.chars().all(|c| !c.is_ascii_lowercase())) {
                return None;
            }
            match word.to_ascii_uppercase().as_str() {
                "CRITICAL" | "CRIT" => Some(Severity::Fatal),
                "ERR" => Some(Severity::Error),
                "WRN" => Some(Severity::Warn),
                other => other.parse().ok(),
            }
        })
}
