//! In-memory launcher and session doubles with failure injection.
//!
//! A [`ScriptedLauncher`] replays a [`Script`] and records every call in a
//! [`Ledger`], so tests can assert on attempt counts and, above all, that
//! each opened session was released exactly once.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::error::DriverError;
use super::session::{BrowserSession, SessionLauncher};

/// What the fake browser should do. Counters fail the first N calls.
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub launch_failures: u32,
    /// Fail the `about:blank` responsiveness probe.
    pub probe_failures: u32,
    /// Fail page loads (network error) for non-probe URLs.
    pub goto_failures: u32,
    /// Time out readiness waits.
    pub ready_failures: u32,
    /// Markup returned by `source`; `None` makes `source` fail.
    pub page_source: Option<String>,
    /// Successive results of `count`; the last value repeats.
    pub row_counts: Vec<usize>,
    pub close_fails: bool,
}

impl Script {
    /// A browser that works and serves `html`.
    pub fn serving(html: impl Into<String>) -> Self {
        Self {
            page_source: Some(html.into()),
            ..Self::default()
        }
    }
}

/// Everything the fake browser was asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    pub launch_attempts: u32,
    pub opened: u32,
    pub released: u32,
    pub page_load_timeout: Option<Duration>,
    pub visited: Vec<String>,
    pub ready_waits: Vec<(String, Duration)>,
    pub counts: u32,
    pub source_reads: u32,
}

impl Ledger {
    /// Sessions opened but never released.
    pub fn leaked(&self) -> i64 {
        i64::from(self.opened) - i64::from(self.released)
    }

    /// Page loads other than the acquisition probe.
    pub fn page_loads(&self) -> usize {
        self.visited.iter().filter(|u| *u != "about:blank").count()
    }
}

#[derive(Debug, Default)]
struct State {
    script: Script,
    ledger: Ledger,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedLauncher {
    state: Arc<Mutex<State>>,
}

impl ScriptedLauncher {
    pub fn new(script: Script) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                script,
                ledger: Ledger::default(),
            })),
        }
    }

    pub fn ledger(&self) -> Ledger {
        lock(&self.state).ledger.clone()
    }
}

fn lock(state: &Arc<Mutex<State>>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn take_failure(counter: &mut u32) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, DriverError> {
        let mut state = lock(&self.state);
        state.ledger.launch_attempts += 1;
        if take_failure(&mut state.script.launch_failures) {
            return Err(DriverError::Connect {
                url: "scripted://webdriver".to_string(),
                message: "connection refused".to_string(),
            });
        }
        state.ledger.opened += 1;
        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
        }))
    }
}

pub struct ScriptedSession {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn set_page_load_timeout(&mut self, timeout: Duration) -> Result<(), DriverError> {
        lock(&self.state).ledger.page_load_timeout = Some(timeout);
        Ok(())
    }

    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.ledger.visited.push(url.to_string());
        let failed = if url == "about:blank" {
            take_failure(&mut state.script.probe_failures)
        } else {
            take_failure(&mut state.script.goto_failures)
        };
        if failed {
            return Err(DriverError::WebDriver(format!("net::ERR_CONNECTION_RESET at {url}")));
        }
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state
            .ledger
            .ready_waits
            .push((selector.to_string(), timeout));
        if take_failure(&mut state.script.ready_failures) {
            return Err(DriverError::ReadyTimeout {
                selector: selector.to_string(),
                after: timeout,
            });
        }
        Ok(())
    }

    async fn count(&mut self, _selector: &str) -> Result<usize, DriverError> {
        let mut state = lock(&self.state);
        let idx = state.ledger.counts as usize;
        state.ledger.counts += 1;
        let counts = &state.script.row_counts;
        Ok(counts
            .get(idx)
            .or_else(|| counts.last())
            .copied()
            .unwrap_or(0))
    }

    async fn source(&mut self) -> Result<String, DriverError> {
        let mut state = lock(&self.state);
        state.ledger.source_reads += 1;
        state
            .script
            .page_source
            .clone()
            .ok_or_else(|| DriverError::WebDriver("invalid session id".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.ledger.released += 1;
        if state.script.close_fails {
            return Err(DriverError::WebDriver("session already closed".to_string()));
        }
        Ok(())
    }
}
