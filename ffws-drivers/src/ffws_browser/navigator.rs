use ffws_common::retry::RetryPolicy;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::error::DriverError;
use super::session::BrowserSession;

/// What to do once the readiness selector has appeared.
///
/// The dashboard keeps appending rows after the table element exists and
/// offers no completion signal, so some wait is needed either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Return immediately.
    None,
    /// Sleep once for the given duration.
    Fixed(Duration),
    /// Poll the number of body rows every `interval` until two consecutive
    /// reads agree, giving up (and proceeding) after `max_wait`.
    StableRows { interval: Duration, max_wait: Duration },
}

impl Default for SettlePolicy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(5))
    }
}

/// Loads a page and waits until the data table is there.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    retry: RetryPolicy,
    settle: SettlePolicy,
}

impl Navigator {
    pub fn new(retry: RetryPolicy, settle: SettlePolicy) -> Self {
        Self { retry, settle }
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn settle(&self) -> SettlePolicy {
        self.settle
    }

    /// Load `url` and wait up to `timeout` for `ready_selector`, retrying
    /// the whole sequence on the same session, then settle.
    pub async fn navigate(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let mut attempts = self.retry.start("page.navigate");
        loop {
            match load_and_wait(session, url, ready_selector, timeout).await {
                Ok(()) => {
                    info!(
                        target: "browser.navigate",
                        %url,
                        attempt = attempts.attempt(),
                        "page.ready"
                    );
                    break;
                }
                Err(err) => {
                    attempts
                        .failed(err)
                        .await
                        .map_err(|exhausted| DriverError::NavigationFailed {
                            url: url.to_string(),
                            attempts: exhausted.attempts,
                            last: Box::new(exhausted.last),
                        })?;
                }
            }
        }

        self.settle_page(session, ready_selector).await;
        Ok(())
    }

    async fn settle_page(&self, session: &mut dyn BrowserSession, ready_selector: &str) {
        match self.settle {
            SettlePolicy::None => {}
            SettlePolicy::Fixed(delay) => {
                debug!(target: "browser.navigate", delay_ms = delay.as_millis() as u64, "page.settle.fixed");
                sleep(delay).await;
            }
            SettlePolicy::StableRows { interval, max_wait } => {
                let rows = format!("{ready_selector} tbody tr");
                wait_for_stable_count(session, &rows, interval, max_wait).await;
            }
        }
    }
}

async fn load_and_wait(
    session: &mut dyn BrowserSession,
    url: &str,
    ready_selector: &str,
    timeout: Duration,
) -> Result<(), DriverError> {
    session.goto(url).await?;
    session.wait_for(ready_selector, timeout).await
}

/// Returns the last observed count. Read errors end the wait early; the
/// caller parses whatever has rendered by then.
async fn wait_for_stable_count(
    session: &mut dyn BrowserSession,
    selector: &str,
    interval: Duration,
    max_wait: Duration,
) -> Option<usize> {
    let deadline = Instant::now() + max_wait;
    let mut last = match session.count(selector).await {
        Ok(n) => n,
        Err(err) => {
            warn!(target: "browser.navigate", %selector, error = %err, "page.settle.count_failed");
            return None;
        }
    };

    loop {
        if Instant::now() + interval > deadline {
            warn!(target: "browser.navigate", %selector, rows = last, "page.settle.gave_up");
            return Some(last);
        }
        sleep(interval).await;
        let current = match session.count(selector).await {
            Ok(n) => n,
            Err(err) => {
                warn!(target: "browser.navigate", %selector, error = %err, "page.settle.count_failed");
                return Some(last);
            }
        };
        if current == last {
            debug!(target: "browser.navigate", %selector, rows = current, "page.settle.stable");
            return Some(current);
        }
        last = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffws_browser::session::SessionLauncher;
    use crate::ffws_browser::testing::{Script, ScriptedLauncher};

    const URL: &str = "https://ffws.example/water/table.do";
    const READY: &str = "table.table-type1";

    fn quick(settle: SettlePolicy) -> Navigator {
        Navigator::new(RetryPolicy::new(3, Duration::ZERO), settle)
    }

    #[tokio::test]
    async fn ready_on_first_attempt() {
        let launcher = ScriptedLauncher::new(Script::default());
        let mut session = launcher.launch().await.unwrap();

        quick(SettlePolicy::None)
            .navigate(session.as_mut(), URL, READY, Duration::from_secs(30))
            .await
            .unwrap();

        let ledger = launcher.ledger();
        assert_eq!(ledger.page_loads(), 1);
        assert_eq!(
            ledger.ready_waits,
            vec![(READY.to_string(), Duration::from_secs(30))]
        );
    }

    #[tokio::test]
    async fn recovers_from_a_network_error_on_the_same_session() {
        let launcher = ScriptedLauncher::new(Script {
            goto_failures: 1,
            ready_failures: 1,
            ..Script::default()
        });
        let mut session = launcher.launch().await.unwrap();

        quick(SettlePolicy::None)
            .navigate(session.as_mut(), URL, READY, Duration::from_secs(1))
            .await
            .unwrap();

        let ledger = launcher.ledger();
        assert_eq!(ledger.page_loads(), 3);
        assert_eq!(ledger.launch_attempts, 1);
    }

    #[tokio::test]
    async fn three_timeouts_exhaust_the_budget() {
        let launcher = ScriptedLauncher::new(Script {
            ready_failures: u32::MAX,
            ..Script::default()
        });
        let mut session = launcher.launch().await.unwrap();

        let err = quick(SettlePolicy::None)
            .navigate(session.as_mut(), URL, READY, Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            DriverError::NavigationFailed { attempts, last, url } => {
                assert_eq!(attempts, 3);
                assert_eq!(url, URL);
                assert!(matches!(*last, DriverError::ReadyTimeout { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(launcher.ledger().ready_waits.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_settle_sleeps_once_after_readiness() {
        let launcher = ScriptedLauncher::new(Script::default());
        let mut session = launcher.launch().await.unwrap();

        let start = Instant::now();
        quick(SettlePolicy::Fixed(Duration::from_secs(5)))
            .navigate(session.as_mut(), URL, READY, Duration::from_secs(30))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(launcher.ledger().counts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stable_rows_stops_once_the_count_repeats() {
        let launcher = ScriptedLauncher::new(Script {
            row_counts: vec![3, 10, 14, 14],
            ..Script::default()
        });
        let mut session = launcher.launch().await.unwrap();

        let settled = wait_for_stable_count(
            session.as_mut(),
            "table.table-type1 tbody tr",
            Duration::from_millis(500),
            Duration::from_secs(10),
        )
        .await;

        assert_eq!(settled, Some(14));
        assert_eq!(launcher.ledger().counts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stable_rows_gives_up_at_max_wait() {
        let launcher = ScriptedLauncher::new(Script {
            row_counts: (0..100).collect(),
            ..Script::default()
        });
        let mut session = launcher.launch().await.unwrap();

        let start = Instant::now();
        let settled = wait_for_stable_count(
            session.as_mut(),
            "table.table-type1 tbody tr",
            Duration::from_secs(1),
            Duration::from_secs(3),
        )
        .await;

        assert!(start.elapsed() <= Duration::from_secs(3));
        assert_eq!(settled, Some(3));
    }
}
