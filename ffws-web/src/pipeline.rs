use ffws_drivers::{BrowserSession, Navigator, SessionManager};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::dataset::{Dataset, ExtractionRequest, RAINFALL, WATER_LEVEL};
use crate::error::ExtractError;
use crate::record::{CaptureTime, ExtractionResult};
use crate::table;

/// Where one extraction call currently is.
///
/// `Idle → AcquiringSession → Navigating → Parsing → Succeeded`, with a
/// jump to `Failed` from any non-terminal step after `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionState {
    Idle,
    AcquiringSession,
    Navigating,
    Parsing,
    Succeeded,
    Failed,
}

impl ExtractionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use ExtractionState::*;
        matches!(
            (self, next),
            (Idle, AcquiringSession)
                | (AcquiringSession, Navigating)
                | (Navigating, Parsing)
                | (Parsing, Succeeded)
                | (AcquiringSession | Navigating | Parsing, Failed)
        )
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AcquiringSession => "acquiring_session",
            Self::Navigating => "navigating",
            Self::Parsing => "parsing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExtractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State trail of a single extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRun {
    dataset: &'static str,
    state: ExtractionState,
    history: Vec<ExtractionState>,
}

impl ExtractionRun {
    pub fn new(dataset: &'static str) -> Self {
        Self {
            dataset,
            state: ExtractionState::Idle,
            history: vec![ExtractionState::Idle],
        }
    }

    pub fn dataset(&self) -> &'static str {
        self.dataset
    }

    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Every state visited, starting with `Idle`.
    pub fn history(&self) -> &[ExtractionState] {
        &self.history
    }

    fn advance(&mut self, next: ExtractionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(
            target: "extract.pipeline",
            dataset = self.dataset,
            from = %self.state,
            to = %next,
            "state.transition"
        );
        self.state = next;
        self.history.push(next);
    }
}

/// Runs extraction calls: one fresh session per call, released on every
/// exit path. Holds no per-call state, so one instance can serve
/// concurrent calls behind an `Arc`.
#[derive(Clone)]
pub struct Scraper {
    sessions: SessionManager,
    navigator: Navigator,
    wait_timeout: Duration,
    water_level: ExtractionRequest,
    rainfall: ExtractionRequest,
}

impl Scraper {
    pub fn new(sessions: SessionManager, navigator: Navigator) -> Self {
        Self {
            sessions,
            navigator,
            wait_timeout: Duration::from_secs(30),
            water_level: WATER_LEVEL,
            rainfall: RAINFALL,
        }
    }

    /// How long to wait for the table to appear on each navigation attempt.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Replace the built-in request used for `dataset`.
    pub fn with_request(mut self, dataset: Dataset, request: ExtractionRequest) -> Self {
        match dataset {
            Dataset::WaterLevel => self.water_level = request,
            Dataset::Rainfall => self.rainfall = request,
        }
        self
    }

    /// Point `dataset` at another URL, keeping its table shape.
    pub fn with_url(self, dataset: Dataset, url: &str) -> Result<Self, url::ParseError> {
        let request = self.request(dataset).clone().with_url(url)?;
        Ok(self.with_request(dataset, request))
    }

    pub fn request(&self, dataset: Dataset) -> &ExtractionRequest {
        match dataset {
            Dataset::WaterLevel => &self.water_level,
            Dataset::Rainfall => &self.rainfall,
        }
    }

    pub async fn fetch(&self, dataset: Dataset) -> ExtractionResult {
        self.run(self.request(dataset)).await
    }

    pub async fn fetch_water_level(&self) -> ExtractionResult {
        self.fetch(Dataset::WaterLevel).await
    }

    pub async fn fetch_rainfall(&self) -> ExtractionResult {
        self.fetch(Dataset::Rainfall).await
    }

    pub async fn run(&self, request: &ExtractionRequest) -> ExtractionResult {
        self.run_traced(request).await.0
    }

    /// Like [`run`](Self::run), also returning the state trail.
    pub async fn run_traced(
        &self,
        request: &ExtractionRequest,
    ) -> (ExtractionResult, ExtractionRun) {
        let started = Instant::now();
        let mut run = ExtractionRun::new(request.dataset);
        info!(
            target: "extract.pipeline",
            dataset = request.dataset,
            url = %request.url,
            "extract.start"
        );

        run.advance(ExtractionState::AcquiringSession);
        let result = match self.sessions.acquire().await {
            Ok(mut session) => {
                run.advance(ExtractionState::Navigating);
                let result = self.drive(session.as_mut(), request, &mut run).await;
                self.sessions.release(session).await;
                result
            }
            Err(err) => Err(ExtractError::SessionAcquisition(err)),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(extraction) => {
                run.advance(ExtractionState::Succeeded);
                info!(
                    target: "extract.pipeline",
                    dataset = request.dataset,
                    records = extraction.records.len(),
                    elapsed_ms,
                    "extract.ok"
                );
            }
            Err(err) => {
                let failed_in = run.state();
                run.advance(ExtractionState::Failed);
                error!(
                    target: "extract.pipeline",
                    dataset = request.dataset,
                    step = %failed_in,
                    error = %err,
                    elapsed_ms,
                    "extract.failed"
                );
            }
        }

        (result, run)
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        request: &ExtractionRequest,
        run: &mut ExtractionRun,
    ) -> ExtractionResult {
        self.navigator
            .navigate(session, &request.url, request.selector, self.wait_timeout)
            .await
            .map_err(ExtractError::Navigation)?;

        run.advance(ExtractionState::Parsing);
        let markup = session.source().await.map_err(ExtractError::PageSource)?;
        table::extract(&markup, request, CaptureTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ExtractionState::*;

    #[test]
    fn legal_transitions() {
        assert!(Idle.can_transition_to(AcquiringSession));
        assert!(AcquiringSession.can_transition_to(Failed));
        assert!(Navigating.can_transition_to(Parsing));
        assert!(Parsing.can_transition_to(Succeeded));
        assert!(Parsing.can_transition_to(Failed));
    }

    #[test]
    fn illegal_transitions() {
        assert!(!Idle.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Parsing));
        assert!(!AcquiringSession.can_transition_to(Parsing));
        assert!(!Navigating.can_transition_to(Succeeded));
        for terminal in [Succeeded, Failed] {
            assert!(terminal.is_terminal());
            for next in [Idle, AcquiringSession, Navigating, Parsing, Succeeded, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn run_records_its_history() {
        let mut run = ExtractionRun::new("water_level");
        run.advance(AcquiringSession);
        run.advance(Navigating);
        run.advance(Failed);
        assert_eq!(run.state(), Failed);
        assert_eq!(run.history(), &[Idle, AcquiringSession, Navigating, Failed]);
    }
}
