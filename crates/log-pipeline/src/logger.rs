// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Entry point for emitting records: providers, loggers and their configuration.
//!
//! A [`LoggerProvider`] owns the root processor and hands out one [`Logger`]
//! per instrumentation scope. Each logger carries a [`LoggerConfig`] chosen by
//! the provider's [`ScopeConfigurator`]; replacing the configurator swaps every
//! logger's config in place, so loggers already handed out pick it up.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::flag::EventuallyVisibleBool;
use crate::processor::{LogRecordProcessor, MultiLogRecordProcessor};
use crate::record::{AnyValue, InstrumentationScope, LogLimits, RecordBuilder};
use crate::result::{CompletableResult, Outcome};
use crate::severity::Severity;
use crate::trace::{Context, SpanContext};

const UNKNOWN_LOGGER_NAME: &str = "unknown";

/// Source of observed timestamps.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> SystemTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Per-logger gate applied before a record is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerConfig {
    enabled: bool,
    minimum_severity: Option<Severity>,
    trace_based: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::enabled()
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            minimum_severity: None,
            trace_based: false,
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::enabled()
        }
    }

    /// Drops records whose severity is set and below `minimum`.
    #[must_use]
    pub fn with_minimum_severity(mut self, minimum: Severity) -> Self {
        self.minimum_severity = Some(minimum);
        self
    }

    /// Drops records correlated with a valid span that was not sampled.
    #[must_use]
    pub fn with_trace_based(mut self) -> Self {
        self.trace_based = true;
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn minimum_severity(&self) -> Option<Severity> {
        self.minimum_severity
    }

    #[must_use]
    pub fn is_trace_based(&self) -> bool {
        self.trace_based
    }

    /// Everything except the enabled bit, which callers read from a faster flag.
    fn admits(&self, severity: Option<Severity>, span_context: Option<&SpanContext>) -> bool {
        if let (Some(minimum), Some(severity)) = (self.minimum_severity, severity) {
            if severity < minimum {
                return false;
            }
        }
        if self.trace_based {
            if let Some(span) = span_context {
                if span.is_valid() && !span.is_sampled() {
                    return false;
                }
            }
        }
        true
    }
}

/// Selects scopes by instrumentation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeMatcher {
    NameEquals(String),
    /// `*` matches any run of characters, `?` exactly one.
    NameGlob(String),
}

impl ScopeMatcher {
    #[must_use]
    pub fn matches(&self, scope: &InstrumentationScope) -> bool {
        match self {
            ScopeMatcher::NameEquals(name) => scope.name == *name,
            ScopeMatcher::NameGlob(pattern) => glob_matches(pattern, &scope.name),
        }
    }
}

fn glob_matches(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    // Position of the last `*` and the name index it was tried against.
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, n));
                p += 1;
            }
            Some('?') => {
                p += 1;
                n += 1;
            }
            Some(c) if *c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match star {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    star = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

/// Maps a scope to its [`LoggerConfig`]. The first matching condition wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeConfigurator {
    default: LoggerConfig,
    conditions: Vec<(ScopeMatcher, LoggerConfig)>,
}

impl ScopeConfigurator {
    #[must_use]
    pub fn builder() -> ScopeConfiguratorBuilder {
        ScopeConfiguratorBuilder::default()
    }

    #[must_use]
    pub fn apply(&self, scope: &InstrumentationScope) -> LoggerConfig {
        self.conditions
            .iter()
            .find(|(matcher, _)| matcher.matches(scope))
            .map_or(self.default, |(_, config)| *config)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeConfiguratorBuilder {
    configurator: ScopeConfigurator,
}

impl ScopeConfiguratorBuilder {
    /// Config for scopes no condition matches.
    #[must_use]
    pub fn set_default(mut self, config: LoggerConfig) -> Self {
        self.configurator.default = config;
        self
    }

    #[must_use]
    pub fn add_condition(mut self, matcher: ScopeMatcher, config: LoggerConfig) -> Self {
        self.configurator.conditions.push((matcher, config));
        self
    }

    #[must_use]
    pub fn build(self) -> ScopeConfigurator {
        self.configurator
    }
}

/// Runtime-updatable state of one logger.
#[derive(Debug)]
struct LoggerState {
    scope: Arc<InstrumentationScope>,
    config: ArcSwap<LoggerConfig>,
    enabled: EventuallyVisibleBool,
}

impl LoggerState {
    fn new(scope: InstrumentationScope, config: LoggerConfig) -> Self {
        Self {
            scope: Arc::new(scope),
            enabled: EventuallyVisibleBool::new(config.is_enabled()),
            config: ArcSwap::from_pointee(config),
        }
    }

    fn update(&self, config: LoggerConfig) {
        self.config.store(Arc::new(config));
        self.enabled.set(config.is_enabled());
    }

    fn admits(&self, severity: Option<Severity>, span_context: Option<&SpanContext>) -> bool {
        self.enabled.get() && self.config.load().admits(severity, span_context)
    }
}

#[derive(Debug, Default)]
struct Registry {
    configurator: ScopeConfigurator,
    loggers: HashMap<InstrumentationScope, Arc<LoggerState>>,
}

#[derive(Debug)]
struct ProviderShared {
    processor: Arc<dyn LogRecordProcessor>,
    log_limits: LogLimits,
    clock: Arc<dyn Clock>,
    registry: Mutex<Registry>,
    is_shutdown: AtomicBool,
}

impl ProviderShared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::Acquire)
    }
}

/// Owns the processor tree and the loggers that feed it.
///
/// Cloning is cheap; clones share loggers, configuration and lifecycle.
#[derive(Debug, Clone)]
pub struct LoggerProvider {
    shared: Arc<ProviderShared>,
}

impl LoggerProvider {
    #[must_use]
    pub fn builder() -> LoggerProviderBuilder {
        LoggerProviderBuilder::default()
    }

    /// Logger for the scope called `name`, created on first use.
    #[must_use]
    pub fn logger(&self, name: impl Into<String>) -> Logger {
        self.logger_builder(name).build()
    }

    #[must_use]
    pub fn logger_builder(&self, name: impl Into<String>) -> LoggerBuilder {
        let mut name = name.into();
        if name.trim().is_empty() {
            warn!("Logger requested without instrumentation scope name, using '{UNKNOWN_LOGGER_NAME}'");
            name = UNKNOWN_LOGGER_NAME.to_string();
        }
        LoggerBuilder {
            provider: self.clone(),
            scope: InstrumentationScope::new(name),
        }
    }

    /// Replaces the configurator and updates every existing logger.
    pub fn set_logger_configurator(&self, configurator: ScopeConfigurator) {
        let mut registry = self.shared.registry();
        for state in registry.loggers.values() {
            state.update(configurator.apply(&state.scope));
        }
        registry.configurator = configurator;
    }

    pub fn force_flush(&self) -> CompletableResult {
        self.shared.processor.force_flush()
    }

    /// Shuts the processor tree down. Later emits are ignored.
    pub fn shutdown(&self) -> CompletableResult {
        if self.shared.is_shutdown.swap(true, Ordering::AcqRel) {
            debug!("Logger provider already shut down");
            return CompletableResult::of_success();
        }
        self.shared.processor.shutdown()
    }

    pub fn force_flush_with_timeout(&self, timeout: Duration) -> Result<(), PipelineError> {
        if self.shared.is_shutdown() {
            return Err(PipelineError::AlreadyShutdown);
        }
        match self.force_flush().join(timeout) {
            Outcome::Success => Ok(()),
            Outcome::Failure => Err(PipelineError::ExportFailed(
                "force flush did not complete successfully".to_string(),
            )),
            Outcome::TimedOut => Err(PipelineError::FlushTimeout),
        }
    }

    pub fn shutdown_with_timeout(&self, timeout: Duration) -> Result<(), PipelineError> {
        match self.shutdown().join(timeout) {
            Outcome::Success => Ok(()),
            Outcome::Failure => Err(PipelineError::ExportFailed(
                "shutdown did not complete successfully".to_string(),
            )),
            Outcome::TimedOut => Err(PipelineError::ShutdownTimeout),
        }
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.is_shutdown()
    }

    fn get_or_create(&self, scope: InstrumentationScope) -> Logger {
        let mut registry = self.shared.registry();
        let Registry {
            configurator,
            loggers,
        } = &mut *registry;
        let state = loggers
            .entry(scope)
            .or_insert_with_key(|scope| {
                Arc::new(LoggerState::new(scope.clone(), configurator.apply(scope)))
            })
            .clone();
        Logger {
            shared: Arc::clone(&self.shared),
            state,
        }
    }
}

#[derive(Debug)]
pub struct LoggerProviderBuilder {
    processors: Vec<Arc<dyn LogRecordProcessor>>,
    log_limits: LogLimits,
    configurator: ScopeConfiguratorBuilder,
    clock: Arc<dyn Clock>,
}

impl Default for LoggerProviderBuilder {
    fn default() -> Self {
        Self {
            processors: Vec::new(),
            log_limits: LogLimits::default(),
            configurator: ScopeConfigurator::builder(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl LoggerProviderBuilder {
    /// Processors receive every emitted record, in registration order.
    #[must_use]
    pub fn with_processor(mut self, processor: Arc<dyn LogRecordProcessor>) -> Self {
        self.processors.push(processor);
        self
    }

    #[must_use]
    pub fn with_log_limits(mut self, log_limits: LogLimits) -> Self {
        self.log_limits = log_limits;
        self
    }

    #[must_use]
    pub fn with_logger_configurator(mut self, configurator: ScopeConfigurator) -> Self {
        self.configurator = ScopeConfiguratorBuilder { configurator };
        self
    }

    /// Appends one condition to the configurator being built.
    #[must_use]
    pub fn add_logger_configurator_condition(
        mut self,
        matcher: ScopeMatcher,
        config: LoggerConfig,
    ) -> Self {
        self.configurator = self.configurator.add_condition(matcher, config);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn build(self) -> LoggerProvider {
        LoggerProvider {
            shared: Arc::new(ProviderShared {
                processor: MultiLogRecordProcessor::create(self.processors),
                log_limits: self.log_limits,
                clock: self.clock,
                registry: Mutex::new(Registry {
                    configurator: self.configurator.build(),
                    loggers: HashMap::new(),
                }),
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}

#[derive(Debug)]
pub struct LoggerBuilder {
    provider: LoggerProvider,
    scope: InstrumentationScope,
}

impl LoggerBuilder {
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.scope.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_schema_url(mut self, schema_url: impl Into<String>) -> Self {
        self.scope.schema_url = Some(schema_url.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Logger {
        self.provider.get_or_create(self.scope)
    }
}

/// Produces records for one instrumentation scope.
#[derive(Debug, Clone)]
pub struct Logger {
    shared: Arc<ProviderShared>,
    state: Arc<LoggerState>,
}

impl Logger {
    #[must_use]
    pub fn scope(&self) -> &InstrumentationScope {
        &self.state.scope
    }

    #[must_use]
    pub fn config(&self) -> LoggerConfig {
        **self.state.config.load()
    }

    /// Whether a record with `severity` in `context` would pass this logger's gate.
    #[must_use]
    pub fn is_enabled(&self, severity: Option<Severity>, context: &Context) -> bool {
        !self.shared.is_shutdown() && self.state.admits(severity, context.span_context())
    }

    #[must_use]
    pub fn log_record_builder(&self) -> LogRecordBuilder {
        LogRecordBuilder {
            logger: self.clone(),
            record: RecordBuilder::new(Arc::clone(&self.state.scope)),
            context: None,
        }
    }
}

/// Record under construction; nothing reaches the pipeline until [`emit`](Self::emit).
#[derive(Debug)]
pub struct LogRecordBuilder {
    logger: Logger,
    record: RecordBuilder,
    context: Option<Context>,
}

impl LogRecordBuilder {
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.record = self.record.with_timestamp(timestamp);
        self
    }

    #[must_use]
    pub fn with_observed_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.record = self.record.with_observed_timestamp(timestamp);
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.record = self.record.with_severity(severity);
        self
    }

    #[must_use]
    pub fn with_severity_text(mut self, text: impl Into<String>) -> Self {
        self.record = self.record.with_severity_text(text);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<AnyValue>) -> Self {
        self.record = self.record.with_body(body);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        self.record = self.record.with_attribute(key, value);
        self
    }

    #[must_use]
    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.record = self.record.with_event_name(name);
        self
    }

    /// Context to correlate with instead of the thread's current one.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Applies the logger gate, freezes the record and hands it to the processors.
    pub fn emit(self) {
        let shared = &self.logger.shared;
        if shared.is_shutdown() {
            return;
        }
        let context = self.context.unwrap_or_else(Context::current);
        let mut record = self.record;
        record.set_span_context_if_absent(context.span_context().copied());
        if !self
            .logger
            .state
            .admits(record.severity(), record.span_context())
        {
            return;
        }
        let record = Arc::new(record.build_with(&shared.log_limits, shared.clock.now()));
        shared.processor.on_emit(&context, &record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::InMemoryLogRecordExporter;
    use crate::processor::test_support::RecordingProcessor;
    use crate::processor::SimpleLogRecordProcessor;
    use crate::trace::{SpanId, TraceFlags, TraceId};
    use duplicate::duplicate_item;
    use std::sync::atomic::Ordering;
    use std::time::UNIX_EPOCH;

    fn provider_with(
        configurator: ScopeConfigurator,
    ) -> (LoggerProvider, Arc<InMemoryLogRecordExporter>) {
        let exporter = Arc::new(InMemoryLogRecordExporter::new());
        let provider = LoggerProvider::builder()
            .with_logger_configurator(configurator)
            .with_processor(Arc::new(SimpleLogRecordProcessor::new(exporter.clone())))
            .build();
        (provider, exporter)
    }

    fn bodies(exporter: &InMemoryLogRecordExporter) -> Vec<String> {
        exporter
            .finished_log_records()
            .iter()
            .filter_map(|r| r.body().and_then(AnyValue::as_str).map(str::to_string))
            .collect()
    }

    fn disable_b() -> ScopeConfigurator {
        ScopeConfigurator::builder()
            .add_condition(
                ScopeMatcher::NameEquals("loggerB".to_string()),
                LoggerConfig::disabled(),
            )
            .build()
    }

    #[test]
    fn test_disabled_scope_drops_records() {
        let (provider, exporter) = provider_with(disable_b());
        for name in ["loggerA", "loggerB", "loggerC"] {
            provider
                .logger(name)
                .log_record_builder()
                .with_body(format!("message{}", &name[6..]))
                .emit();
        }

        assert_eq!(bodies(&exporter), vec!["messageA", "messageC"]);
        assert!(provider.logger("loggerA").is_enabled(Some(Severity::Info), &Context::new()));
        assert!(!provider.logger("loggerB").is_enabled(Some(Severity::Info), &Context::new()));
    }

    fn cat_dog_configurators() -> [ScopeConfigurator; 5] {
        let name = |n: &str| ScopeMatcher::NameEquals(n.to_string());
        let glob = |g: &str| ScopeMatcher::NameGlob(g.to_string());
        [
            ScopeConfigurator::default(),
            ScopeConfigurator::builder()
                .add_condition(name("cat"), LoggerConfig::disabled())
                .add_condition(name("cat"), LoggerConfig::enabled())
                .build(),
            ScopeConfigurator::builder()
                .add_condition(glob("d*"), LoggerConfig::disabled())
                .build(),
            ScopeConfigurator::builder()
                .set_default(LoggerConfig::disabled())
                .add_condition(name("cat"), LoggerConfig::enabled())
                .add_condition(name("cat"), LoggerConfig::disabled())
                .build(),
            ScopeConfigurator::builder()
                .set_default(LoggerConfig::disabled())
                .add_condition(glob("d*"), LoggerConfig::enabled())
                .build(),
        ]
    }

    #[duplicate_item(
        test_name                        index  cat    dog    duck;
        [test_default_configurator]      [0]    [true]  [true]  [true];
        [test_disable_cat]               [1]    [false] [true]  [true];
        [test_disable_glob]              [2]    [true]  [false] [false];
        [test_enable_cat]                [3]    [true]  [false] [false];
        [test_enable_glob]               [4]    [false] [true]  [true];
    )]
    #[test]
    fn test_name() {
        let configurator = &cat_dog_configurators()[index];
        let enabled = |name: &str| {
            configurator
                .apply(&InstrumentationScope::new(name))
                .is_enabled()
        };
        assert_eq!(enabled("cat"), cat);
        assert_eq!(enabled("dog"), dog);
        assert_eq!(enabled("duck"), duck);
    }

    #[test]
    fn test_set_logger_configurator_updates_existing_loggers() {
        let (provider, exporter) = provider_with(disable_b());
        let loggers: Vec<Logger> = ["loggerA", "loggerB", "loggerC"]
            .into_iter()
            .map(|name| provider.logger(name))
            .collect();
        let emit_all = || {
            for logger in &loggers {
                logger
                    .log_record_builder()
                    .with_body(logger.scope().name.clone())
                    .emit();
            }
        };

        emit_all();
        assert_eq!(bodies(&exporter), vec!["loggerA", "loggerC"]);
        exporter.reset();

        provider.set_logger_configurator(
            ScopeConfigurator::builder()
                .set_default(LoggerConfig::disabled())
                .build(),
        );
        assert!(loggers
            .iter()
            .all(|logger| !logger.is_enabled(None, &Context::new())));
        emit_all();
        assert!(exporter.finished_log_records().is_empty());

        provider.set_logger_configurator(disable_b());
        emit_all();
        assert_eq!(bodies(&exporter), vec!["loggerA", "loggerC"]);
    }

    #[test]
    fn test_minimum_severity_lets_undefined_severity_through() {
        let (provider, exporter) = provider_with(
            ScopeConfigurator::builder()
                .add_condition(
                    ScopeMatcher::NameEquals("loggerA".to_string()),
                    LoggerConfig::default().with_minimum_severity(Severity::Warn),
                )
                .build(),
        );
        let a = provider.logger("loggerA");
        let b = provider.logger("loggerB");

        a.log_record_builder().with_severity(Severity::Debug).with_body("debug").emit();
        a.log_record_builder().with_severity(Severity::Info).with_body("info").emit();
        a.log_record_builder().with_severity(Severity::Warn).with_body("warn").emit();
        a.log_record_builder().with_severity(Severity::Error).with_body("error").emit();
        a.log_record_builder().with_body("unspecified").emit();
        b.log_record_builder().with_severity(Severity::Debug).with_body("debug-b").emit();

        assert_eq!(
            bodies(&exporter),
            vec!["warn", "error", "unspecified", "debug-b"]
        );
    }

    #[test]
    fn test_trace_based_logger_drops_only_unsampled_spans() {
        let (provider, exporter) = provider_with(
            ScopeConfigurator::builder()
                .set_default(LoggerConfig::default().with_trace_based())
                .build(),
        );
        let logger = provider.logger("traced");
        let sampled = SpanContext::new(TraceId(1), SpanId(1), TraceFlags::SAMPLED);
        let unsampled = SpanContext::new(TraceId(1), SpanId(2), TraceFlags::NOT_SAMPLED);
        let invalid = SpanContext::new(TraceId::INVALID, SpanId::INVALID, TraceFlags::NOT_SAMPLED);

        logger.log_record_builder().with_body("no-span").emit();
        logger
            .log_record_builder()
            .with_context(Context::with_span_context(sampled))
            .with_body("sampled")
            .emit();
        logger
            .log_record_builder()
            .with_context(Context::with_span_context(unsampled))
            .with_body("unsampled")
            .emit();
        logger
            .log_record_builder()
            .with_context(Context::with_span_context(invalid))
            .with_body("invalid")
            .emit();

        assert_eq!(bodies(&exporter), vec!["no-span", "sampled", "invalid"]);
    }

    #[test]
    fn test_current_context_is_correlated() {
        let (provider, exporter) = provider_with(ScopeConfigurator::default());
        let span = SpanContext::new(TraceId(42), SpanId(7), TraceFlags::SAMPLED);
        {
            let _guard = Context::with_span_context(span).attach();
            provider.logger("ctx").log_record_builder().with_body("inside").emit();
        }
        provider.logger("ctx").log_record_builder().with_body("outside").emit();

        let records = exporter.finished_log_records();
        assert_eq!(records[0].span_context(), Some(&span));
        assert_eq!(records[1].span_context(), None);
    }

    #[test]
    fn test_loggers_are_cached_per_scope() {
        let provider = LoggerProvider::builder().build();
        let first = provider.logger("cached");
        let second = provider.logger("cached");
        assert!(Arc::ptr_eq(&first.state, &second.state));

        let versioned = provider.logger_builder("cached").with_version("1.0").build();
        assert!(!Arc::ptr_eq(&first.state, &versioned.state));
        assert_eq!(versioned.scope().version.as_deref(), Some("1.0"));

        let with_schema = provider
            .logger_builder("cached")
            .with_version("1.0")
            .with_schema_url("https://example.com/schema")
            .build();
        assert_eq!(
            with_schema.scope().schema_url.as_deref(),
            Some("https://example.com/schema")
        );
    }

    #[test]
    fn test_empty_logger_name_falls_back() {
        let provider = LoggerProvider::builder().build();
        assert_eq!(provider.logger("").scope().name, UNKNOWN_LOGGER_NAME);
    }

    #[derive(Debug)]
    struct FixedClock(SystemTime);

    impl Clock for FixedClock {
        fn now(&self) -> SystemTime {
            self.0
        }
    }

    #[test]
    fn test_clock_and_limits_are_applied() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let exporter = Arc::new(InMemoryLogRecordExporter::new());
        let provider = LoggerProvider::builder()
            .with_processor(Arc::new(SimpleLogRecordProcessor::new(exporter.clone())))
            .with_clock(Arc::new(FixedClock(now)))
            .with_log_limits(LogLimits {
                max_number_of_attributes: 1,
                max_attribute_value_length: Some(3),
            })
            .build();

        provider
            .logger("limits")
            .log_record_builder()
            .with_attribute("first", "abcdef")
            .with_attribute("second", "kept?")
            .emit();

        let record = &exporter.finished_log_records()[0];
        assert_eq!(record.observed_timestamp(), now);
        assert_eq!(record.attributes().len(), 1);
        assert_eq!(
            record.attributes().get("first").and_then(AnyValue::as_str),
            Some("abc")
        );
        assert_eq!(record.dropped_attributes_count(), 1);
    }

    #[test]
    fn test_shutdown_is_idempotent_and_stops_emission() {
        let processor = Arc::new(RecordingProcessor::default());
        let provider = LoggerProvider::builder()
            .with_processor(processor.clone())
            .build();
        let logger = provider.logger("lifecycle");

        logger.log_record_builder().with_body("before").emit();
        assert!(provider.force_flush_with_timeout(Duration::from_secs(1)).is_ok());
        assert!(provider.shutdown_with_timeout(Duration::from_secs(1)).is_ok());
        assert!(provider.shutdown().is_success());
        logger.log_record_builder().with_body("after").emit();

        assert_eq!(processor.emitted_count(), 1);
        assert_eq!(processor.shutdowns.load(Ordering::SeqCst), 1);
        assert!(!logger.is_enabled(None, &Context::new()));
        assert!(matches!(
            provider.force_flush_with_timeout(Duration::from_secs(1)),
            Err(PipelineError::AlreadyShutdown)
        ));
    }

    #[test]
    fn test_failed_flush_maps_to_error() {
        let provider = LoggerProvider::builder()
            .with_processor(Arc::new(RecordingProcessor::failing()))
            .build();
        assert!(matches!(
            provider.force_flush_with_timeout(Duration::from_secs(1)),
            Err(PipelineError::ExportFailed(_))
        ));
    }

    #[test]
    fn test_glob_matching() {
        assert!(glob_matches("d*", "dog"));
        assert!(glob_matches("d*", "d"));
        assert!(glob_matches("*", ""));
        assert!(glob_matches("a?c", "abc"));
        assert!(!glob_matches("a?c", "ac"));
        assert!(glob_matches("io.*.http", "io.vendor.http"));
        assert!(glob_matches("*log*", "my-logger"));
        assert!(!glob_matches("d*", "cat"));
        assert!(!glob_matches("dog", "dogs"));
    }
}
