//! Shared plumbing for the FFWS workspace.
//!
//! This crate holds the pieces every other crate leans on and nothing
//! domain specific:
//!
//! - [`observability`]: one-shot `tracing` initialisation for binaries and tests
//! - [`retry`]: the bounded retry policy used by session acquisition and
//!   page navigation
//!
//! # Examples
//!
//! ```rust
//! use ffws_common::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(policy.backoff(), Duration::from_secs(5));
//! ```
pub mod observability;
pub mod retry;

pub use retry::{Attempts, Exhausted, RetryPolicy};
