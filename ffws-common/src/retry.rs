//! Bounded retry with a fixed backoff between attempts.
//!
//! A [`RetryPolicy`] is a plain value (attempt bound + delay). Callers drive
//! their own loop and report each failure to an [`Attempts`] tracker, which
//! either sleeps and lets them go again or hands back [`Exhausted`]. Keeping
//! the loop at the call site lets the operation borrow whatever it needs
//! (e.g. `&mut` a browser session) across attempts.
//!
//! ```rust
//! # async fn demo() {
//! use ffws_common::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::ZERO);
//! let mut attempts = policy.start("demo.op");
//! let mut calls = 0;
//! let value = loop {
//!     calls += 1;
//!     let outcome: Result<u32, String> = if calls < 3 { Err("flaky".into()) } else { Ok(7) };
//!     match outcome {
//!         Ok(v) => break v,
//!         Err(err) => {
//!             if let Err(exhausted) = attempts.failed(err).await {
//!                 panic!("{exhausted}");
//!             }
//!         }
//!     }
//! };
//! assert_eq!(value, 7);
//! # }
//! ```

use std::fmt;
use std::time::Duration;

use tokio::time::sleep;

/// Number of attempts and the fixed delay separating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Build a policy. `max_attempts` is clamped to at least one.
    pub const fn new(max_attempts: u32, backoff: Duration) -> Self {
        let max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Begin tracking attempts for one logical operation.
    pub fn start(&self, operation: &'static str) -> Attempts {
        Attempts {
            policy: *self,
            operation,
            attempt: 1,
        }
    }
}

/// Per-operation attempt counter handed out by [`RetryPolicy::start`].
#[derive(Debug)]
pub struct Attempts {
    policy: RetryPolicy,
    operation: &'static str,
    attempt: u32,
}

impl Attempts {
    /// The 1-based attempt currently in flight.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Record a failed attempt.
    ///
    /// With budget left this sleeps for the backoff and returns `Ok(())` so
    /// the caller can try again. On the final attempt it returns the error
    /// wrapped in [`Exhausted`] without sleeping.
    pub async fn failed<E: fmt::Display>(&mut self, err: E) -> Result<(), Exhausted<E>> {
        let max_attempts = self.policy.max_attempts;
        if self.attempt >= max_attempts {
            tracing::warn!(
                operation = self.operation,
                attempt = self.attempt,
                max_attempts,
                error = %err,
                "retry.exhausted"
            );
            return Err(Exhausted {
                operation: self.operation,
                attempts: self.attempt,
                last: err,
            });
        }

        let backoff = self.policy.backoff;
        tracing::warn!(
            operation = self.operation,
            attempt = self.attempt,
            max_attempts,
            backoff_ms = backoff.as_millis() as u64,
            error = %err,
            "retry.retrying"
        );
        if !backoff.is_zero() {
            sleep(backoff).await;
        }
        self.attempt += 1;
        Ok(())
    }
}

/// Every attempt failed; carries the last error seen.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub operation: &'static str,
    pub attempts: u32,
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for Exhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} attempt(s): {}",
            self.operation, self.attempts, self.last
        )
    }
}

impl<E> std::error::Error for Exhausted<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last)
    }
}
