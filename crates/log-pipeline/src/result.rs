// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Joinable completion signal returned by flush, shutdown and export.
//!
//! A [`CompletableResult`] starts pending and is completed exactly once,
//! either successfully or as a failure. The first completion wins; later
//! attempts are ignored. Callers may register callbacks, block with a
//! timeout, or await it from async code.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// What a caller observed when waiting on a [`CompletableResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// The wait gave up; the underlying result may still complete later.
    TimedOut,
}

impl Outcome {
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Success)
    }
}

type Callback = Box<dyn FnOnce(bool) + Send>;

#[derive(Default)]
struct State {
    /// `None` while pending.
    done: Option<bool>,
    callbacks: Vec<Callback>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    completed: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // Callbacks run outside the lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Default)]
pub struct CompletableResult {
    inner: Arc<Inner>,
}

impl fmt::Debug for CompletableResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let done = self.inner.lock().done;
        f.debug_struct("CompletableResult")
            .field("done", &done)
            .finish()
    }
}

impl CompletableResult {
    /// A pending result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn of_success() -> Self {
        let result = Self::new();
        result.succeed();
        result
    }

    #[must_use]
    pub fn of_failure() -> Self {
        let result = Self::new();
        result.fail();
        result
    }

    /// Completes once every member has completed; succeeds iff all succeeded.
    pub fn of_all<I>(results: I) -> Self
    where
        I: IntoIterator<Item = CompletableResult>,
    {
        let results: Vec<CompletableResult> = results.into_iter().collect();
        if results.is_empty() {
            return Self::of_success();
        }

        let combined = Self::new();
        let remaining = Arc::new(Mutex::new((results.len(), true)));
        for result in results {
            let combined = combined.clone();
            let remaining = Arc::clone(&remaining);
            result.when_complete(move |success| {
                let finished = {
                    let mut guard = remaining.lock().unwrap_or_else(PoisonError::into_inner);
                    guard.0 -= 1;
                    guard.1 &= success;
                    (guard.0 == 0).then_some(guard.1)
                };
                match finished {
                    Some(true) => {
                        combined.succeed();
                    }
                    Some(false) => {
                        combined.fail();
                    }
                    None => {}
                }
            });
        }
        combined
    }

    /// Returns `false` if the result was already complete.
    pub fn succeed(&self) -> bool {
        self.complete(true)
    }

    /// Returns `false` if the result was already complete.
    pub fn fail(&self) -> bool {
        self.complete(false)
    }

    fn complete(&self, success: bool) -> bool {
        let callbacks = {
            let mut state = self.inner.lock();
            if state.done.is_some() {
                return false;
            }
            state.done = Some(success);
            std::mem::take(&mut state.callbacks)
        };
        self.inner.completed.notify_all();
        for callback in callbacks {
            callback(success);
        }
        true
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.lock().done.is_some()
    }

    /// `false` while pending.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.inner.lock().done == Some(true)
    }

    /// Runs `callback` once with the final status; immediately if already complete.
    pub fn when_complete<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let done = {
            let mut state = self.inner.lock();
            match state.done {
                Some(done) => Some(done),
                None => {
                    state.callbacks.push(Box::new(callback));
                    return self;
                }
            }
        };
        if let Some(success) = done {
            callback(success);
        }
        self
    }

    /// Blocks the calling thread for at most `timeout`.
    pub fn join(&self, timeout: Duration) -> Outcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock();
        loop {
            if let Some(success) = state.done {
                return if success {
                    Outcome::Success
                } else {
                    Outcome::Failure
                };
            }
            let now = Instant::now();
            if now >= deadline {
                return Outcome::TimedOut;
            }
            state = self
                .inner
                .completed
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Resolves when the result completes.
    pub async fn wait(&self) -> Outcome {
        let (tx, rx) = oneshot::channel();
        self.when_complete(move |success| {
            let _ = tx.send(success);
        });
        match rx.await {
            Ok(true) => Outcome::Success,
            Ok(false) => Outcome::Failure,
            // Callbacks are never dropped without being invoked once registered.
            Err(_) => Outcome::Failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_of_success_and_failure() {
        assert!(CompletableResult::of_success().is_success());
        let failed = CompletableResult::of_failure();
        assert!(failed.is_done());
        assert!(!failed.is_success());
    }

    #[test]
    fn test_first_completion_wins() {
        let result = CompletableResult::new();
        assert!(result.succeed());
        assert!(!result.fail());
        assert!(!result.succeed());
        assert!(result.is_success());
    }

    #[test]
    fn test_callback_runs_once_after_completion() {
        let calls = Arc::new(AtomicUsize::new(0));
        let result = CompletableResult::new();
        let counter = Arc::clone(&calls);
        result.when_complete(move |success| {
            assert!(!success);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        result.fail();
        result.fail();
        result.succeed();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_on_completed_result_runs_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        CompletableResult::of_success().when_complete(move |success| {
            assert!(success);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_join_times_out_without_resolving() {
        let result = CompletableResult::new();
        assert_eq!(result.join(Duration::from_millis(10)), Outcome::TimedOut);
        assert!(!result.is_done());
        result.succeed();
        assert_eq!(result.join(Duration::from_millis(10)), Outcome::Success);
    }

    #[test]
    fn test_join_wakes_on_completion_from_other_thread() {
        let result = CompletableResult::new();
        let remote = result.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.fail();
        });
        assert_eq!(result.join(Duration::from_secs(5)), Outcome::Failure);
        handle.join().expect("completer panicked");
    }

    #[test]
    fn test_of_all_empty_succeeds() {
        assert!(CompletableResult::of_all(Vec::new()).is_success());
    }

    #[test]
    fn test_of_all_waits_for_last_member() {
        let first = CompletableResult::new();
        let second = CompletableResult::new();
        let all = CompletableResult::of_all(vec![first.clone(), second.clone()]);

        first.succeed();
        assert!(!all.is_done());
        second.succeed();
        assert!(all.is_success());
    }

    #[test]
    fn test_of_all_fails_if_any_member_fails() {
        let first = CompletableResult::new();
        let second = CompletableResult::new();
        let all = CompletableResult::of_all(vec![first.clone(), second.clone()]);

        first.fail();
        assert!(!all.is_done(), "must not complete before the last member");
        second.succeed();
        assert!(all.is_done());
        assert!(!all.is_success());
    }

    #[tokio::test]
    async fn test_wait_resolves_on_completion() {
        let result = CompletableResult::new();
        let remote = result.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            remote.succeed();
        });
        assert_eq!(result.wait().await, Outcome::Success);
    }
}
