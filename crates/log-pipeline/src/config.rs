// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::PipelineError;
use crate::severity::Severity;
use std::env;
use std::time::Duration;

pub const DEFAULT_MAX_QUEUE_SIZE: usize = 2048;
pub const DEFAULT_SCHEDULE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_EXPORT_BATCH_SIZE: usize = 512;
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_ADMISSION_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// What a batching stage does with a record that arrives while its buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Drop the incoming record and count it.
    #[default]
    DropNewest,
    /// Wait up to `timeout` for space, then drop and count.
    Block { timeout: Duration },
}

/// Batching stage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Records buffered before admission overflows
    pub max_queue_size: usize,
    /// Longest a record waits before a drain is triggered
    pub schedule_delay: Duration,
    /// Upper bound on records per export call
    pub max_export_batch_size: usize,
    /// How long the worker waits for one export before giving up on it
    pub export_timeout: Duration,
    pub overflow_policy: OverflowPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            schedule_delay: DEFAULT_SCHEDULE_DELAY,
            max_export_batch_size: DEFAULT_MAX_EXPORT_BATCH_SIZE,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            overflow_policy: OverflowPolicy::DropNewest,
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_millis(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

impl BatchConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, PipelineError> {
        let max_queue_size = env_usize("OTEL_BLRP_MAX_QUEUE_SIZE", DEFAULT_MAX_QUEUE_SIZE);
        let schedule_delay = env_millis("OTEL_BLRP_SCHEDULE_DELAY", DEFAULT_SCHEDULE_DELAY);
        let max_export_batch_size = env_usize(
            "OTEL_BLRP_MAX_EXPORT_BATCH_SIZE",
            DEFAULT_MAX_EXPORT_BATCH_SIZE,
        );
        let export_timeout = env_millis("OTEL_BLRP_EXPORT_TIMEOUT", DEFAULT_EXPORT_TIMEOUT);
        let overflow_policy = match env::var("LOG_PIPELINE_OVERFLOW")
            .map(|val| val.trim().to_lowercase())
            .as_deref()
        {
            Ok("block") => OverflowPolicy::Block {
                timeout: env_millis("LOG_PIPELINE_ADMISSION_TIMEOUT", DEFAULT_ADMISSION_TIMEOUT),
            },
            Ok("drop") | Ok("") | Err(_) => OverflowPolicy::DropNewest,
            Ok(other) => {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "Invalid overflow policy '{}'. Must be one of: drop, block",
                    other
                )))
            }
        };

        let config = Self {
            max_queue_size,
            schedule_delay,
            max_export_batch_size,
            export_timeout,
            overflow_policy,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_queue_size == 0 {
            return Err(PipelineError::invalid("max_queue_size must be greater than 0"));
        }
        if self.max_export_batch_size == 0 {
            return Err(PipelineError::invalid(
                "max_export_batch_size must be greater than 0",
            ));
        }
        if self.max_export_batch_size > self.max_queue_size {
            return Err(PipelineError::InvalidConfiguration(format!(
                "max_export_batch_size ({}) must not exceed max_queue_size ({})",
                self.max_export_batch_size, self.max_queue_size
            )));
        }
        if self.schedule_delay.is_zero() {
            return Err(PipelineError::invalid("schedule_delay must be non-zero"));
        }
        if self.export_timeout.is_zero() {
            return Err(PipelineError::invalid("export_timeout must be non-zero"));
        }
        if let OverflowPolicy::Block { timeout } = self.overflow_policy {
            if timeout.is_zero() {
                return Err(PipelineError::invalid(
                    "admission timeout must be non-zero when blocking on overflow",
                ));
            }
        }
        Ok(())
    }
}

/// Configuration for a complete forwarding pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Records below this severity are dropped before batching
    pub min_severity: Severity,
    /// Level for the pipeline's own diagnostics (trace, debug, info, warn, error)
    pub log_level: String,
    /// Upper bound on how long shutdown may take
    pub shutdown_timeout: Duration,
    pub batch: BatchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            log_level: "info".to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            batch: BatchConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, PipelineError> {
        let min_severity = match env::var("LOG_PIPELINE_MIN_SEVERITY") {
            Ok(val) => val.parse::<Severity>().map_err(|e| {
                PipelineError::InvalidConfiguration(format!("LOG_PIPELINE_MIN_SEVERITY: {}", e))
            })?,
            Err(_) => Severity::Info,
        };
        let log_level = env::var("LOG_PIPELINE_LOG_LEVEL")
            .map(|val| val.trim().to_lowercase())
            .unwrap_or_else(|_| "info".to_string());
        let shutdown_timeout =
            env_millis("LOG_PIPELINE_SHUTDOWN_TIMEOUT", DEFAULT_SHUTDOWN_TIMEOUT);

        let config = Self {
            min_severity,
            log_level,
            shutdown_timeout,
            batch: BatchConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }
        if self.shutdown_timeout.is_zero() {
            return Err(PipelineError::invalid("shutdown timeout must be non-zero"));
        }
        self.batch.validate()
    }
}
