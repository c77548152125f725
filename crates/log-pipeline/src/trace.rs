// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Trace correlation carried by log records.
//!
//! A [`Context`] holds the active span context. Instrumentation either passes
//! one explicitly to a record builder or attaches it to the current thread
//! with [`Context::attach`]; records emitted without an explicit context pick
//! up the thread's current one.

use serde::{Serialize, Serializer};
use std::cell::RefCell;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceId(pub u128);

impl TraceId {
    pub const INVALID: TraceId = TraceId(0);
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl Serialize for TraceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanId(pub u64);

impl SpanId {
    pub const INVALID: SpanId = SpanId(0);
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Serialize for SpanId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TraceFlags(pub u8);

impl TraceFlags {
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0);
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    #[must_use]
    pub fn is_sampled(self) -> bool {
        self.0 & Self::SAMPLED.0 != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub trace_flags: TraceFlags,
    #[serde(skip)]
    pub is_remote: bool,
}

impl SpanContext {
    #[must_use]
    pub fn new(trace_id: TraceId, span_id: SpanId, trace_flags: TraceFlags) -> Self {
        Self {
            trace_id,
            span_id,
            trace_flags,
            is_remote: false,
        }
    }

    /// Non-zero trace id and non-zero span id.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.trace_id != TraceId::INVALID && self.span_id != SpanId::INVALID
    }

    #[must_use]
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }
}

/// Execution context passed alongside records to processors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    span_context: Option<SpanContext>,
}

thread_local! {
    static CURRENT_CONTEXT: RefCell<Context> = RefCell::new(Context::default());
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_span_context(span_context: SpanContext) -> Self {
        Self {
            span_context: Some(span_context),
        }
    }

    #[must_use]
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span_context.as_ref()
    }

    /// The context attached to the calling thread.
    #[must_use]
    pub fn current() -> Self {
        CURRENT_CONTEXT.with(|current| current.borrow().clone())
    }

    /// Makes this the thread's current context until the guard is dropped.
    #[must_use = "the context is detached as soon as the guard is dropped"]
    pub fn attach(self) -> ContextGuard {
        let previous = CURRENT_CONTEXT.with(|current| current.replace(self));
        ContextGuard {
            previous: Some(previous),
        }
    }
}

#[derive(Debug)]
pub struct ContextGuard {
    previous: Option<Context>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CURRENT_CONTEXT.with(|current| {
                current.replace(previous);
            });
        }
    }
}
