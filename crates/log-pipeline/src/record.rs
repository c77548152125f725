// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The immutable log record and the builder that freezes it.
//!
//! A [`RecordBuilder`] is owned by the emitting caller. Once built, a
//! [`LogRecord`] is shared read-only (`Arc<LogRecord>`) by every processor
//! and exporter it reaches.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::severity::Severity;
use crate::trace::SpanContext;

/// Structured value used for record bodies and attribute values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyValue {
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
    Bytes(Vec<u8>),
    Array(Vec<AnyValue>),
    #[serde(serialize_with = "serialize_pairs")]
    Map(Vec<(String, AnyValue)>),
}

fn serialize_pairs<S: Serializer>(
    pairs: &[(String, AnyValue)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
}

impl AnyValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnyValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn truncate(&mut self, max_len: usize) {
        match self {
            AnyValue::String(s) => truncate_on_char_boundary(s, max_len),
            AnyValue::Array(values) => values.iter_mut().for_each(|v| v.truncate(max_len)),
            _ => {}
        }
    }
}

fn truncate_on_char_boundary(s: &mut String, max_len: usize) {
    if s.len() <= max_len {
        return;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
}

impl From<&str> for AnyValue {
    fn from(value: &str) -> Self {
        AnyValue::String(value.to_string())
    }
}

impl From<String> for AnyValue {
    fn from(value: String) -> Self {
        AnyValue::String(value)
    }
}

impl From<bool> for AnyValue {
    fn from(value: bool) -> Self {
        AnyValue::Bool(value)
    }
}

impl From<i64> for AnyValue {
    fn from(value: i64) -> Self {
        AnyValue::Int(value)
    }
}

impl From<f64> for AnyValue {
    fn from(value: f64) -> Self {
        AnyValue::Double(value)
    }
}

/// Limits applied when a record is frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLimits {
    pub max_number_of_attributes: usize,
    /// `None` leaves values untouched.
    pub max_attribute_value_length: Option<usize>,
}

pub const DEFAULT_MAX_NUMBER_OF_ATTRIBUTES: usize = 128;

impl Default for LogLimits {
    fn default() -> Self {
        Self {
            max_number_of_attributes: DEFAULT_MAX_NUMBER_OF_ATTRIBUTES,
            max_attribute_value_length: None,
        }
    }
}

/// Attribute map with unique keys, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AnyValue)>,
    dropped: u32,
}

impl Attributes {
    /// Inserts or replaces `key`. New keys beyond `limits` are dropped and counted.
    pub fn insert(&mut self, key: String, mut value: AnyValue, limits: &LogLimits) {
        if let Some(max_len) = limits.max_attribute_value_length {
            value.truncate(max_len);
        }
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
            return;
        }
        if self.entries.len() >= limits.max_number_of_attributes {
            self.dropped = self.dropped.saturating_add(1);
            return;
        }
        self.entries.push((key, value));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AnyValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn dropped_count(&self) -> u32 {
        self.dropped
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Identity of the instrumentation library that produced a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub struct InstrumentationScope {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
}

impl InstrumentationScope {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

fn serialize_unix_nanos<S: Serializer>(
    time: &Option<SystemTime>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match time.and_then(|t| t.duration_since(UNIX_EPOCH).ok()) {
        Some(d) => serializer.serialize_u128(d.as_nanos()),
        None => serializer.serialize_none(),
    }
}

fn serialize_required_unix_nanos<S: Serializer>(
    time: &SystemTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serialize_unix_nanos(&Some(*time), serializer)
}

/// One log entry. Never mutated after it is emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    #[serde(serialize_with = "serialize_unix_nanos")]
    timestamp: Option<SystemTime>,
    #[serde(serialize_with = "serialize_required_unix_nanos")]
    observed_timestamp: SystemTime,
    severity: Option<Severity>,
    severity_text: Option<String>,
    body: Option<AnyValue>,
    attributes: Attributes,
    dropped_attributes_count: u32,
    span_context: Option<SpanContext>,
    scope: Arc<InstrumentationScope>,
    event_name: Option<String>,
}

impl LogRecord {
    #[must_use]
    pub fn builder(scope: Arc<InstrumentationScope>) -> RecordBuilder {
        RecordBuilder::new(scope)
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<SystemTime> {
        self.timestamp
    }

    #[must_use]
    pub fn observed_timestamp(&self) -> SystemTime {
        self.observed_timestamp
    }

    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    #[must_use]
    pub fn severity_text(&self) -> Option<&str> {
        self.severity_text.as_deref()
    }

    #[must_use]
    pub fn body(&self) -> Option<&AnyValue> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn dropped_attributes_count(&self) -> u32 {
        self.dropped_attributes_count
    }

    #[must_use]
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span_context.as_ref()
    }

    #[must_use]
    pub fn scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.event_name.as_deref()
    }
}

/// Mutable record under construction, owned by a single caller.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    scope: Arc<InstrumentationScope>,
    timestamp: Option<SystemTime>,
    observed_timestamp: Option<SystemTime>,
    severity: Option<Severity>,
    severity_text: Option<String>,
    body: Option<AnyValue>,
    attributes: Vec<(String, AnyValue)>,
    span_context: Option<SpanContext>,
    event_name: Option<String>,
}

impl RecordBuilder {
    #[must_use]
    pub fn new(scope: Arc<InstrumentationScope>) -> Self {
        Self {
            scope,
            timestamp: None,
            observed_timestamp: None,
            severity: None,
            severity_text: None,
            body: None,
            attributes: Vec::new(),
            span_context: None,
            event_name: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_observed_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.observed_timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    #[must_use]
    pub fn with_severity_text(mut self, text: impl Into<String>) -> Self {
        self.severity_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<AnyValue>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Empty keys are ignored.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AnyValue>) -> Self {
        let key = key.into();
        if !key.is_empty() {
            self.attributes.push((key, value.into()));
        }
        self
    }

    #[must_use]
    pub fn with_span_context(mut self, span_context: SpanContext) -> Self {
        self.span_context = Some(span_context);
        self
    }

    #[must_use]
    pub fn with_event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    #[must_use]
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span_context.as_ref()
    }

    pub(crate) fn set_span_context_if_absent(&mut self, span_context: Option<SpanContext>) {
        if self.span_context.is_none() {
            self.span_context = span_context;
        }
    }

    /// Freezes with default limits, observing "now" when no observed timestamp was set.
    #[must_use]
    pub fn build(self) -> LogRecord {
        self.build_with(&LogLimits::default(), SystemTime::now())
    }

    #[must_use]
    pub fn build_with(self, limits: &LogLimits, now: SystemTime) -> LogRecord {
        let mut attributes = Attributes::default();
        for (key, value) in self.attributes {
            attributes.insert(key, value, limits);
        }
        LogRecord {
            timestamp: self.timestamp,
            observed_timestamp: self.observed_timestamp.unwrap_or(now),
            severity: self.severity,
            severity_text: self.severity_text,
            body: self.body,
            dropped_attributes_count: attributes.dropped_count(),
            attributes,
            span_context: self.span_context,
            scope: self.scope,
            event_name: self.event_name,
        }
    }
}
