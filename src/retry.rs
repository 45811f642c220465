//! RetryCoordinator - bounded attempts, fixed delay, cancel and replace
//!
//! ```text
//! attempt 1 ──fail──► delay ──► attempt 2 ──fail──► delay ──► attempt 3 ──fail──► Failed
//!     │                  │          │
//!     ok                 cancel()   ok
//!     ▼                  ▼          ▼
//! Succeeded          Cancelled   Succeeded
//! ```
//!
//! One sequence per coordinator: starting a new `run` cancels the pending one.
//! A non-retryable failure (the user said no, or the wallet cannot do it)
//! ends the sequence at once. The attempt counter is back at 0 after every
//! terminal outcome.

use crate::classify::ErrorRecord;
use crate::runtime::Timer;
use futures::future::{AbortHandle, Abortable};
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, delay: Duration::from_millis(DEFAULT_DELAY_MS) }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Progress of the current sequence. `attempt == 0` means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RetryState {
    pub attempt: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    /// Every attempt failed; `error` is the last one.
    Failed { attempts: u32, error: ErrorRecord },
    /// A non-retryable failure ended the sequence early.
    Stopped { attempts: u32, error: ErrorRecord },
    /// Replaced by a newer sequence or cancelled explicitly.
    Cancelled,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool { matches!(self, RetryOutcome::Succeeded { .. }) }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            RetryOutcome::Failed { error, .. } | RetryOutcome::Stopped { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Status line for an exhausted sequence.
pub fn exhausted_message(attempts: u32) -> String {
    format!("failed after {} attempts", attempts)
}

/// Called before each delay with the attempt about to run.
pub type RetryObserver = Box<dyn Fn(RetryState)>;

pub struct RetryCoordinator {
    policy: RetryPolicy,
    timer: Rc<dyn Timer>,
    state: Cell<RetryState>,
    generation: Cell<u64>,
    pending_delay: RefCell<Option<AbortHandle>>,
    observer: Option<RetryObserver>,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy, timer: Rc<dyn Timer>) -> Self {
        Self {
            policy,
            timer,
            state: Cell::new(RetryState { attempt: 0, max: policy.max_attempts }),
            generation: Cell::new(0),
            pending_delay: RefCell::new(None),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> RetryPolicy { self.policy }
    pub fn state(&self) -> RetryState { self.state.get() }

    /// Cancel the running sequence, if any. It returns `Cancelled` at its next
    /// suspension point; a pending delay is cut short.
    pub fn cancel(&self) {
        self.generation.set(self.generation.get() + 1);
        if let Some(handle) = self.pending_delay.borrow_mut().take() {
            handle.abort();
        }
        self.reset();
    }

    /// Run `operation` (given the 1-based attempt number) until it succeeds,
    /// fails for good, or is cancelled.
    pub async fn run<T, F, Fut>(&self, context: &str, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ErrorRecord>>,
    {
        self.cancel();
        let generation = self.generation.get();
        let max = self.policy.max_attempts;
        let mut attempt = 1;

        loop {
            self.state.set(RetryState { attempt, max });
            let result = operation(attempt).await;
            if self.generation.get() != generation {
                tracing::debug!(op = context, attempt, "sequence replaced, dropping result");
                return RetryOutcome::Cancelled;
            }

            let error = match result {
                Ok(value) => {
                    self.reset();
                    if attempt > 1 {
                        tracing::info!(op = context, attempt, max, "succeeded after retry");
                    }
                    return RetryOutcome::Succeeded { value, attempts: attempt };
                }
                Err(error) => error,
            };

            if !error.kind.is_retryable() {
                tracing::info!(op = context, attempt, kind = %error.kind, "not retrying");
                self.reset();
                return RetryOutcome::Stopped { attempts: attempt, error };
            }
            if attempt >= max {
                tracing::warn!(op = context, attempts = attempt, kind = %error.kind, error = %error.raw_message, "{}", exhausted_message(attempt));
                self.reset();
                return RetryOutcome::Failed { attempts: attempt, error };
            }

            tracing::warn!(op = context, attempt, max, kind = %error.kind, delay_ms = self.policy.delay.as_millis() as u64, "attempt failed, retrying");
            attempt += 1;
            self.state.set(RetryState { attempt, max });
            if let Some(observer) = &self.observer {
                observer(RetryState { attempt, max });
            }
            if !self.delay(generation).await {
                tracing::debug!(op = context, attempt, "retry cancelled during delay");
                return RetryOutcome::Cancelled;
            }
        }
    }

    /// False when the sequence was cancelled while waiting.
    async fn delay(&self, generation: u64) -> bool {
        let (handle, registration) = AbortHandle::new_pair();
        *self.pending_delay.borrow_mut() = Some(handle);
        let finished = Abortable::new(self.timer.sleep(self.policy.delay), registration).await.is_ok();
        if self.generation.get() != generation {
            return false;
        }
        self.pending_delay.borrow_mut().take();
        finished
    }

    fn reset(&self) {
        self.state.set(RetryState { attempt: 0, max: self.policy.max_attempts });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use crate::runtime::ImmediateTimer;

    fn coordinator() -> RetryCoordinator {
        RetryCoordinator::new(RetryPolicy::default(), Rc::new(ImmediateTimer))
    }

    fn failure(kind: ErrorKind) -> ErrorRecord { ErrorRecord::new(kind, "boom", "test") }

    #[tokio::test]
    async fn three_failures_exhaust() {
        let retry = coordinator();
        let calls = Cell::new(0);
        let outcome: RetryOutcome<()> = retry
            .run("test", |_| {
                calls.set(calls.get() + 1);
                async { Err(failure(ErrorKind::Timeout)) }
            })
            .await;

        assert_eq!(calls.get(), 3);
        assert!(!outcome.is_success());
        assert_eq!(outcome.error().map(|e| e.kind), Some(ErrorKind::Timeout));
        match outcome {
            RetryOutcome::Failed { attempts, error } => {
                assert_eq!(exhausted_message(attempts), "failed after 3 attempts");
                assert_eq!(error.kind, ErrorKind::Timeout);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(retry.state().attempt, 0);
    }

    #[tokio::test]
    async fn success_on_second_attempt_resets() {
        let retry = coordinator();
        let outcome = retry
            .run("test", |attempt| async move {
                if attempt < 2 { Err(failure(ErrorKind::NetworkError)) } else { Ok(attempt) }
            })
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.error(), None);
        assert_eq!(outcome, RetryOutcome::Succeeded { value: 2, attempts: 2 });
        assert_eq!(retry.state(), RetryState { attempt: 0, max: 3 });
    }

    #[tokio::test]
    async fn user_rejection_is_not_retried() {
        let retry = coordinator();
        let calls = Cell::new(0);
        let outcome: RetryOutcome<()> = retry
            .run("test", |_| {
                calls.set(calls.get() + 1);
                async { Err(failure(ErrorKind::UserRejected)) }
            })
            .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(outcome, RetryOutcome::Stopped { attempts: 1, .. }));
        assert_eq!(outcome.error().map(|e| e.kind), Some(ErrorKind::UserRejected));
    }

    #[tokio::test]
    async fn observer_sees_each_retry() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let retry = coordinator().with_observer(Box::new(move |state| sink.borrow_mut().push(state.attempt)));
        let _: RetryOutcome<()> = retry.run("test", |_| async { Err(failure(ErrorKind::Unknown)) }).await;
        assert_eq!(*seen.borrow(), vec![2, 3]);
    }
}
