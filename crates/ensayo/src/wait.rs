//! Wait mechanisms.
//!
//! The browser and the game run concurrently with the driving test, so an
//! action's effects are never synchronously visible. Every wait here is a
//! bounded, fixed-interval poll: no backoff, no jitter, and a distinct
//! timeout error instead of hanging.

use crate::result::{EnsayoError, EnsayoResult};
use std::time::{Duration, Instant};

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Environment variable overriding the default wait timeout.
pub const TIMEOUT_ENV_VAR: &str = "ENSAYO_TIMEOUT_MS";

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the timeout taken from `ENSAYO_TIMEOUT_MS` when set.
    ///
    /// An unparseable value is ignored rather than failing the run.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_override(std::env::var(TIMEOUT_ENV_VAR).ok().as_deref())
    }

    fn from_override(raw: Option<&str>) -> Self {
        let mut options = Self::default();
        if let Some(ms) = raw.and_then(|raw| raw.trim().parse::<u64>().ok()) {
            options.timeout_ms = ms;
        }
        options
    }

    /// Set timeout in milliseconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Poll a predicate at a fixed interval until it holds or the timeout elapses.
///
/// The predicate is checked once immediately, so an already-true condition
/// never sleeps. Returns the elapsed time on success.
///
/// # Errors
///
/// Returns [`EnsayoError::PollTimeout`] carrying `waited_for` on expiry.
pub fn poll_until<F>(mut predicate: F, options: WaitOptions, waited_for: &str) -> EnsayoResult<Duration>
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    loop {
        if predicate() {
            return Ok(start.elapsed());
        }
        if start.elapsed() >= options.timeout() {
            return Err(EnsayoError::PollTimeout {
                ms: options.timeout_ms,
                waited_for: waited_for.to_string(),
            });
        }
        std::thread::sleep(options.poll_interval());
    }
}

/// Async variant of [`poll_until`] for fallible, page-evaluated predicates.
///
/// # Errors
///
/// Propagates predicate errors; returns [`EnsayoError::PollTimeout`] on expiry.
#[cfg(feature = "browser")]
pub async fn poll_until_async<F, Fut>(
    mut predicate: F,
    options: WaitOptions,
    waited_for: &str,
) -> EnsayoResult<Duration>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = EnsayoResult<bool>>,
{
    let start = Instant::now();
    loop {
        if predicate().await? {
            return Ok(start.elapsed());
        }
        if start.elapsed() >= options.timeout() {
            return Err(EnsayoError::PollTimeout {
                ms: options.timeout_ms,
                waited_for: waited_for.to_string(),
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Cooperative pause between an action and its assertion.
///
/// With a real browser this yields to the runtime for the given duration;
/// against the scripted page there is nothing to wait on, so it returns
/// immediately and flow code stays identical across both configurations.
#[cfg_attr(not(feature = "browser"), allow(clippy::unused_async))]
pub async fn settle(duration: Duration) {
    #[cfg(feature = "browser")]
    tokio::time::sleep(duration).await;
    #[cfg(not(feature = "browser"))]
    let _ = duration;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn immediate_truth_returns_without_sleeping() {
        let options = WaitOptions::new().with_timeout(50).with_poll_interval(10);
        let elapsed = poll_until(|| true, options, "already true").expect("should pass");
        assert!(elapsed < Duration::from_millis(50));
    }

    #[test]
    fn predicate_becomes_true_after_some_polls() {
        let calls = AtomicUsize::new(0);
        let options = WaitOptions::new().with_timeout(2_000).with_poll_interval(5);
        let result = poll_until(
            || calls.fetch_add(1, Ordering::SeqCst) >= 3,
            options,
            "third poll",
        );
        assert!(result.is_ok());
        assert!(calls.load(Ordering::SeqCst) >= 4);
    }

    #[test]
    fn expiry_raises_poll_timeout_within_bound() {
        let options = WaitOptions::new().with_timeout(60).with_poll_interval(10);
        let start = Instant::now();
        let err = poll_until(|| false, options, "never true").unwrap_err();
        // T plus bounded scheduling slack, never an indefinite hang.
        assert!(start.elapsed() < Duration::from_millis(600));
        match err {
            EnsayoError::PollTimeout { ms, waited_for } => {
                assert_eq!(ms, 60);
                assert_eq!(waited_for, "never true");
            }
            other => panic!("expected PollTimeout, got {other}"),
        }
    }

    #[test]
    fn env_override_applies_to_timeout_only() {
        // Parsed from an injected value; nothing touches the process
        // environment, which parallel tests read through `from_env`.
        let options = WaitOptions::from_override(Some("12345"));
        assert_eq!(options.timeout_ms, 12345);
        assert_eq!(options.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);

        let options = WaitOptions::from_override(Some(" 250 "));
        assert_eq!(options.timeout_ms, 250);

        // Garbage and absence both keep the default.
        let garbage = WaitOptions::from_override(Some("not-a-number"));
        assert_eq!(garbage.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
        let unset = WaitOptions::from_override(None);
        assert_eq!(unset.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
    }

    #[tokio::test]
    async fn settle_completes() {
        settle(Duration::from_millis(1)).await;
    }
}
