// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can occur when building or driving a log pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to start batch worker: {0}")]
    WorkerSpawn(String),

    #[error("Flush timeout exceeded")]
    FlushTimeout,

    #[error("Shutdown timeout exceeded")]
    ShutdownTimeout,

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Pipeline already shut down")]
    AlreadyShutdown,
}

impl PipelineError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        PipelineError::InvalidConfiguration(msg.into())
    }
}
