// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Buffers records and exports them in batches from a dedicated worker.
//!
//! Producers push into a bounded FIFO under a short lock. A single worker
//! thread, running its own current-thread runtime, owns dequeuing and wakes
//! on the first of:
//!
//! - the schedule-delay timer,
//! - the buffer reaching `max_export_batch_size`,
//! - a flush or shutdown command.
//!
//! Only the worker calls the exporter, so at most one export is in flight.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, warn};

use super::{guard_export, LogRecordProcessor};
use crate::config::{BatchConfig, OverflowPolicy};
use crate::error::PipelineError;
use crate::export::LogRecordExporter;
use crate::record::LogRecord;
use crate::result::{CompletableResult, Outcome};
use crate::trace::Context;

/// Lifecycle of a batching stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BatchState {
    /// Accepting records; the worker exports on its own schedule.
    Running = 0,
    /// A forced flush or shutdown is draining the buffer.
    Draining = 1,
    /// Terminal. Emits are ignored.
    Shutdown = 2,
}

impl BatchState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => BatchState::Running,
            1 => BatchState::Draining,
            _ => BatchState::Shutdown,
        }
    }
}

#[derive(Debug)]
enum Command {
    /// Export everything admitted before `target`, then flush the exporter.
    Flush {
        result: CompletableResult,
        target: u64,
    },
    Shutdown(CompletableResult),
}

#[derive(Debug, Default)]
struct Buffer {
    records: VecDeque<Arc<LogRecord>>,
    /// Total records ever admitted.
    enqueued: u64,
    /// Total records ever taken by the worker.
    dequeued: u64,
}

/// State shared by producers and the worker.
#[derive(Debug)]
struct Shared {
    buffer: Mutex<Buffer>,
    space_available: Condvar,
    batch_ready: Notify,
    state: AtomicU8,
    is_shutdown: AtomicBool,
    dropped: AtomicU64,
    dropped_since_report: AtomicU64,
    max_queue_size: usize,
    max_export_batch_size: usize,
    overflow_policy: OverflowPolicy,
}

impl Shared {
    fn new(config: &BatchConfig) -> Self {
        Self {
            buffer: Mutex::new(Buffer::default()),
            space_available: Condvar::new(),
            batch_ready: Notify::new(),
            state: AtomicU8::new(BatchState::Running as u8),
            is_shutdown: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            dropped_since_report: AtomicU64::new(0),
            max_queue_size: config.max_queue_size,
            max_export_batch_size: config.max_export_batch_size,
            overflow_policy: config.overflow_policy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> BatchState {
        BatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: BatchState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::Acquire)
    }

    fn enqueued(&self) -> u64 {
        self.lock().enqueued
    }

    /// Returns `false` if the record was dropped.
    fn admit(&self, record: Arc<LogRecord>) -> bool {
        let mut buffer = self.lock();
        if buffer.records.len() >= self.max_queue_size {
            let OverflowPolicy::Block { timeout } = self.overflow_policy else {
                return self.reject();
            };
            let deadline = Instant::now() + timeout;
            while buffer.records.len() >= self.max_queue_size {
                let now = Instant::now();
                if now >= deadline || self.is_shutdown() {
                    return self.reject();
                }
                buffer = self
                    .space_available
                    .wait_timeout(buffer, deadline - now)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
        }
        buffer.records.push_back(record);
        buffer.enqueued += 1;
        let ready = buffer.records.len() >= self.max_export_batch_size;
        drop(buffer);

        if ready {
            self.batch_ready.notify_one();
        }
        true
    }

    fn reject(&self) -> bool {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        self.dropped_since_report.fetch_add(1, Ordering::Relaxed);
        false
    }

    fn take(buffer: &mut Buffer, count: usize) -> Vec<Arc<LogRecord>> {
        let batch: Vec<_> = buffer.records.drain(..count).collect();
        buffer.dequeued += batch.len() as u64;
        batch
    }

    /// Next batch of records admitted before `target`; empty once they are all taken.
    fn take_until(&self, target: u64) -> Vec<Arc<LogRecord>> {
        let batch = {
            let mut buffer = self.lock();
            let owed = usize::try_from(target.saturating_sub(buffer.dequeued)).unwrap_or(usize::MAX);
            let count = owed
                .min(self.max_export_batch_size)
                .min(buffer.records.len());
            Self::take(&mut buffer, count)
        };
        if !batch.is_empty() {
            self.space_available.notify_all();
        }
        batch
    }

    fn take_full_batch(&self) -> Option<Vec<Arc<LogRecord>>> {
        let batch = {
            let mut buffer = self.lock();
            if buffer.records.len() < self.max_export_batch_size {
                return None;
            }
            Self::take(&mut buffer, self.max_export_batch_size)
        };
        self.space_available.notify_all();
        Some(batch)
    }
}

/// Owns dequeuing and every call into the exporter.
struct Worker {
    shared: Arc<Shared>,
    exporter: Arc<dyn LogRecordExporter>,
    commands: mpsc::UnboundedReceiver<Command>,
    schedule_delay: Duration,
    export_timeout: Duration,
}

impl Worker {
    async fn run(mut self) {
        debug!("Batch log record processor worker started");

        let mut ticker = interval(self.schedule_delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Flush { result, target }) => {
                        self.shared.set_state(BatchState::Draining);
                        let exported = self.drain_until(target).await;
                        let flushed = self
                            .call_exporter("force_flush", || self.exporter.force_flush())
                            .await;
                        if !self.shared.is_shutdown() {
                            let _ = self.shared.state.compare_exchange(
                                BatchState::Draining as u8,
                                BatchState::Running as u8,
                                Ordering::AcqRel,
                                Ordering::Acquire,
                            );
                        }
                        complete(&result, exported && flushed);
                    }
                    Some(Command::Shutdown(result)) => {
                        let success = self.finish().await;
                        complete(&result, success);
                        break;
                    }
                    None => {
                        debug!("Batch log record processor dropped, draining remaining records");
                        let target = self.shared.enqueued();
                        self.drain_until(target).await;
                        break;
                    }
                },
                _ = self.shared.batch_ready.notified() => {
                    while let Some(batch) = self.shared.take_full_batch() {
                        self.export_batch(batch).await;
                    }
                    self.report_dropped();
                }
                _ = ticker.tick() => {
                    let target = self.shared.enqueued();
                    self.drain_until(target).await;
                }
            }
        }

        self.settle_pending();
        debug!("Batch log record processor worker stopped");
    }

    /// Completes commands that raced the worker's exit. The buffer is already
    /// drained, so there is nothing left for them to wait on.
    fn settle_pending(&mut self) {
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Flush { result, .. } | Command::Shutdown(result) => {
                    result.succeed();
                }
            }
        }
    }

    /// Final drain, then shuts the exporter down.
    async fn finish(&self) -> bool {
        self.shared.set_state(BatchState::Draining);
        let target = self.shared.enqueued();
        let exported = self.drain_until(target).await;
        self.shared.set_state(BatchState::Shutdown);
        self.shared.space_available.notify_all();
        let shut_down = self
            .call_exporter("shutdown", || self.exporter.shutdown())
            .await;
        exported && shut_down
    }

    /// Exports, in batches, every record admitted before `target`.
    async fn drain_until(&self, target: u64) -> bool {
        let mut success = true;
        loop {
            let batch = self.shared.take_until(target);
            if batch.is_empty() {
                break;
            }
            success &= self.export_batch(batch).await;
        }
        self.report_dropped();
        success
    }

    async fn export_batch(&self, batch: Vec<Arc<LogRecord>>) -> bool {
        let size = batch.len();
        let success = self
            .call_exporter("export", || self.exporter.export(batch))
            .await;
        if !success {
            warn!("Failed to export batch of {} log records", size);
        }
        success
    }

    /// Waits for an exporter call for at most `export_timeout`.
    async fn call_exporter(
        &self,
        operation: &str,
        f: impl FnOnce() -> CompletableResult,
    ) -> bool {
        let result = guard_export(self.exporter.as_ref(), operation, f);
        match timeout(self.export_timeout, result.wait()).await {
            Ok(outcome) => outcome == Outcome::Success,
            Err(_) => {
                error!(
                    "Log record exporter {} timed out after {:?}",
                    operation, self.export_timeout
                );
                false
            }
        }
    }

    fn report_dropped(&self) {
        let dropped = self.shared.dropped_since_report.swap(0, Ordering::Relaxed);
        if dropped > 0 {
            warn!(
                "Dropped {} log records because the batch queue was full",
                dropped
            );
        }
    }
}

fn complete(result: &CompletableResult, success: bool) {
    if success {
        result.succeed();
    } else {
        result.fail();
    }
}

/// Batching stage. Each instance owns one worker thread.
#[derive(Debug)]
pub struct BatchLogRecordProcessor {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl BatchLogRecordProcessor {
    #[must_use]
    pub fn builder(exporter: Arc<dyn LogRecordExporter>) -> BatchLogRecordProcessorBuilder {
        BatchLogRecordProcessorBuilder {
            exporter,
            config: BatchConfig::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> BatchState {
        self.shared.state()
    }

    /// Records rejected at admission since the stage was built.
    #[must_use]
    pub fn dropped_records(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    fn spawn(
        exporter: Arc<dyn LogRecordExporter>,
        config: BatchConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let shared = Arc::new(Shared::new(&config));
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            shared: Arc::clone(&shared),
            exporter,
            commands: rx,
            schedule_delay: config.schedule_delay,
            export_timeout: config.export_timeout,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| PipelineError::WorkerSpawn(e.to_string()))?;
        thread::Builder::new()
            .name("log-batch-worker".to_string())
            .spawn(move || runtime.block_on(worker.run()))
            .map_err(|e| PipelineError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            shared,
            commands: tx,
        })
    }
}

impl LogRecordProcessor for BatchLogRecordProcessor {
    fn on_emit(&self, _context: &Context, record: &Arc<LogRecord>) {
        if self.shared.is_shutdown() {
            return;
        }
        self.shared.admit(Arc::clone(record));
    }

    fn force_flush(&self) -> CompletableResult {
        if self.shared.is_shutdown() {
            return CompletableResult::of_success();
        }
        let result = CompletableResult::new();
        let target = self.shared.enqueued();
        if self
            .commands
            .send(Command::Flush {
                result: result.clone(),
                target,
            })
            .is_err()
        {
            error!("Batch worker is not running, cannot flush");
            result.fail();
        }
        result
    }

    fn shutdown(&self) -> CompletableResult {
        if self.shared.is_shutdown.swap(true, Ordering::AcqRel) {
            debug!("Batch log record processor already shut down");
            return CompletableResult::of_success();
        }
        self.shared.set_state(BatchState::Draining);
        self.shared.space_available.notify_all();

        let result = CompletableResult::new();
        if self.commands.send(Command::Shutdown(result.clone())).is_err() {
            error!("Batch worker is not running, cannot drain on shutdown");
            self.shared.set_state(BatchState::Shutdown);
            result.fail();
        }
        result
    }
}

#[derive(Debug)]
pub struct BatchLogRecordProcessorBuilder {
    exporter: Arc<dyn LogRecordExporter>,
    config: BatchConfig,
}

impl BatchLogRecordProcessorBuilder {
    /// Replaces every setting at once, e.g. with [`BatchConfig::from_env`].
    #[must_use]
    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.config.max_queue_size = max_queue_size;
        self
    }

    #[must_use]
    pub fn with_schedule_delay(mut self, schedule_delay: Duration) -> Self {
        self.config.schedule_delay = schedule_delay;
        self
    }

    #[must_use]
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.config.max_export_batch_size = max_export_batch_size;
        self
    }

    #[must_use]
    pub fn with_export_timeout(mut self, export_timeout: Duration) -> Self {
        self.config.export_timeout = export_timeout;
        self
    }

    #[must_use]
    pub fn with_overflow_policy(mut self, overflow_policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = overflow_policy;
        self
    }

    /// Validates the configuration and starts the worker thread.
    pub fn build(self) -> Result<BatchLogRecordProcessor, PipelineError> {
        BatchLogRecordProcessor::spawn(self.exporter, self.config)
    }
}
