//! Test harness: page lifecycle, state machine, guaranteed teardown.
//!
//! A harness owns exactly one browser page for the whole scenario. The
//! run moves through a strict state machine; calling an operation in
//! the wrong state is an [`EnsayoError::InvalidState`], never UB or a
//! hang. On failure the harness captures artifacts best-effort and
//! re-raises the original error.

use crate::action::Action;
use crate::artifacts::{capture_failure_artifacts, ArtifactPaths};
use crate::assertion::{assert_log_contains, assert_no_log_matches, LogPredicate};
use crate::browser::{Browser, BrowserConfig, Page};
use crate::console::{ConsoleEntry, LogBuffer, LogCheckpoint};
use crate::controls::READINESS_SIGNAL;
use crate::coords::CoordinateTable;
use crate::har::{Har, HarRecorder};
use crate::result::{EnsayoError, EnsayoResult};
use crate::wait::WaitOptions;
use std::path::PathBuf;

/// Default URL the exported game is served on.
pub const DEFAULT_GAME_URL: &str = "http://localhost:8080/index.html";

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing launched yet
    Unstarted,
    /// Browser and page exist, log observer attached, not navigated
    Launched,
    /// Navigated and readiness signal observed; actions may be driven
    Ready,
    /// Browser closed; the harness is spent
    TornDown,
}

/// Configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// URL of the served export
    pub url: String,
    /// Browser launch options
    pub browser: BrowserConfig,
    /// Wait bounds (timeout honors `ENSAYO_TIMEOUT_MS`)
    pub wait: WaitOptions,
    /// Page-context readiness expression
    pub readiness_signal: String,
    /// Directory for failure artifacts (None = capture disabled)
    pub artifact_dir: Option<PathBuf>,
    /// In-canvas control offsets
    pub coords: CoordinateTable,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GAME_URL.to_string(),
            browser: BrowserConfig::default(),
            wait: WaitOptions::from_env(),
            readiness_signal: READINESS_SIGNAL.to_string(),
            artifact_dir: None,
            coords: CoordinateTable::default(),
        }
    }
}

impl HarnessConfig {
    /// Defaults for the served export.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a different URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the browser configuration.
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserConfig) -> Self {
        self.browser = browser;
        self
    }

    /// Replace the wait bounds.
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Poll a different readiness expression.
    #[must_use]
    pub fn with_readiness_signal(mut self, signal: impl Into<String>) -> Self {
        self.readiness_signal = signal.into();
        self
    }

    /// Enable failure artifact capture into `dir`.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Replace the coordinate table.
    #[must_use]
    pub fn with_coords(mut self, coords: CoordinateTable) -> Self {
        self.coords = coords;
        self
    }
}

/// One scenario's browser session.
#[derive(Debug)]
pub struct Harness {
    config: HarnessConfig,
    state: RunState,
    browser: Option<Browser>,
    page: Option<Page>,
    logs: Option<LogBuffer>,
    recorder: Option<HarRecorder>,
}

impl Harness {
    /// Create an unstarted harness.
    #[must_use]
    pub const fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            state: RunState::Unstarted,
            browser: None,
            page: None,
            logs: None,
            recorder: None,
        }
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// The configuration this harness runs with.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn require(&self, expected: RunState, operation: &str) -> EnsayoResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(EnsayoError::InvalidState {
                message: format!(
                    "{operation} requires {expected:?}, but run is {:?}",
                    self.state
                ),
            })
        }
    }

    /// Launch the browser, open the page, and attach the log observer.
    ///
    /// The observer attaches before navigation so startup logs land in
    /// the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::InvalidState`] unless unstarted, or the
    /// launch/page error.
    pub async fn launch(&mut self) -> EnsayoResult<()> {
        self.require(RunState::Unstarted, "launch")?;
        let browser = Browser::launch(self.config.browser.clone()).await?;
        let page = browser.new_page().await?;
        let logs = page.attach_log_observer().await?;
        if self.config.browser.record_har {
            self.recorder = Some(page.record_network().await?);
        }
        self.browser = Some(browser);
        self.page = Some(page);
        self.logs = Some(logs);
        self.state = RunState::Launched;
        Ok(())
    }

    /// Navigate to the game and block until the readiness signal holds.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::ReadinessTimeout`] if the signal never
    /// appears within the bound.
    pub async fn navigate_and_wait_ready(&mut self) -> EnsayoResult<()> {
        self.require(RunState::Launched, "navigate_and_wait_ready")?;
        let url = self.config.url.clone();
        let signal = self.config.readiness_signal.clone();
        let wait = self.config.wait;
        let page = self.page_mut()?;
        page.navigate(&url).await?;
        page.wait_ready(&signal, wait).await?;
        self.state = RunState::Ready;
        tracing::info!(url, "game ready");
        Ok(())
    }

    /// The page, for direct evaluation or DOM reads.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::InvalidState`] before launch or after teardown.
    pub fn page(&self) -> EnsayoResult<&Page> {
        self.page.as_ref().ok_or_else(|| EnsayoError::InvalidState {
            message: format!("no page in state {:?}", self.state),
        })
    }

    fn page_mut(&mut self) -> EnsayoResult<&mut Page> {
        let state = self.state;
        self.page.as_mut().ok_or_else(|| EnsayoError::InvalidState {
            message: format!("no page in state {state:?}"),
        })
    }

    /// Handle onto the console buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::InvalidState`] before launch.
    pub fn logs(&self) -> EnsayoResult<LogBuffer> {
        self.logs
            .clone()
            .ok_or_else(|| EnsayoError::InvalidState {
                message: format!("no log observer in state {:?}", self.state),
            })
    }

    /// Capture a log checkpoint; call immediately before driving.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::InvalidState`] before launch.
    pub fn checkpoint(&self) -> EnsayoResult<LogCheckpoint> {
        Ok(self.logs()?.checkpoint())
    }

    /// Drive one action against the ready page.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::InvalidState`] unless the run is ready,
    /// or the underlying drive error.
    pub async fn drive(&self, action: &Action) -> EnsayoResult<()> {
        self.require(RunState::Ready, "drive")?;
        self.page()?.drive(action, &self.config.coords).await
    }

    /// Assert a matching log arrived after the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::AssertionMismatch`] with the scoped slice.
    pub fn assert_log(
        &self,
        predicate: &LogPredicate,
        checkpoint: LogCheckpoint,
    ) -> EnsayoResult<ConsoleEntry> {
        assert_log_contains(&self.logs()?, predicate, checkpoint)
    }

    /// Assert no matching log arrived after the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::AssertionMismatch`] naming the offender.
    pub fn assert_no_log(
        &self,
        predicate: &LogPredicate,
        checkpoint: LogCheckpoint,
    ) -> EnsayoResult<()> {
        assert_no_log_matches(&self.logs()?, predicate, checkpoint)
    }

    /// The network trace recorded so far, when HAR recording is enabled.
    #[must_use]
    pub fn network_trace(&self) -> Option<Har> {
        self.recorder.as_ref().map(HarRecorder::snapshot)
    }

    /// Capture failure artifacts if an artifact directory is configured.
    ///
    /// Best-effort; never errors.
    pub async fn capture_artifacts(&self, label: &str) -> ArtifactPaths {
        let Some(dir) = self.config.artifact_dir.as_deref() else {
            return ArtifactPaths::default();
        };
        let (Ok(page), Ok(logs)) = (self.page(), self.logs()) else {
            return ArtifactPaths::default();
        };
        capture_failure_artifacts(page, &logs, dir, label).await
    }

    /// Close the browser. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the browser close error, if any.
    pub async fn teardown(&mut self) -> EnsayoResult<()> {
        if self.state == RunState::TornDown {
            return Ok(());
        }
        self.page = None;
        self.state = RunState::TornDown;
        if let Some(browser) = self.browser.take() {
            browser.close().await?;
        }
        Ok(())
    }

    /// Finish a scenario: on failure capture artifacts under `label`,
    /// then tear down, then return the scenario's own result.
    ///
    /// Teardown problems are logged, never allowed to mask the
    /// scenario error.
    ///
    /// # Errors
    ///
    /// Re-raises exactly the error in `result`.
    pub async fn conclude(mut self, label: &str, result: EnsayoResult<()>) -> EnsayoResult<()> {
        if let Err(ref error) = result {
            tracing::error!(label, %error, "scenario failed");
            self.capture_artifacts(label).await;
        }
        if let Err(teardown_error) = self.teardown().await {
            tracing::warn!(%teardown_error, "teardown failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_targets_the_served_export() {
        let config = HarnessConfig::default();
        assert_eq!(config.url, "http://localhost:8080/index.html");
        assert_eq!(config.readiness_signal, "window.godotInitialized");
        assert!(config.artifact_dir.is_none());
    }

    #[test]
    fn operations_out_of_order_are_invalid_state() {
        let harness = Harness::new(HarnessConfig::default());
        assert_eq!(harness.state(), RunState::Unstarted);
        assert!(matches!(
            harness.page(),
            Err(EnsayoError::InvalidState { .. })
        ));
        assert!(matches!(
            harness.logs(),
            Err(EnsayoError::InvalidState { .. })
        ));
    }

    #[cfg(not(feature = "browser"))]
    mod scripted {
        use super::*;
        use crate::console::{ConsoleEntry, ConsoleLevel};
        use serde_json::json;

        async fn launched() -> Harness {
            let mut harness = Harness::new(HarnessConfig::default());
            harness.launch().await.expect("launch");
            harness
        }

        #[tokio::test]
        async fn state_machine_walks_forward_only() {
            let mut harness = launched().await;
            assert_eq!(harness.state(), RunState::Launched);

            // Launch twice is a state error.
            assert!(matches!(
                harness.launch().await,
                Err(EnsayoError::InvalidState { .. })
            ));

            // Not ready yet: driving is rejected.
            let action = Action::call_hook("audioPressed", vec![json!(0)]);
            assert!(matches!(
                harness.drive(&action).await,
                Err(EnsayoError::InvalidState { .. })
            ));
        }

        #[tokio::test]
        async fn readiness_timeout_propagates_from_navigation() {
            let mut harness = launched().await;
            // The scripted page never flips the readiness flag.
            let err = harness.navigate_and_wait_ready().await.unwrap_err();
            assert!(matches!(err, EnsayoError::ReadinessTimeout { .. }));
            assert_eq!(harness.state(), RunState::Launched);
        }

        #[tokio::test]
        async fn ready_run_drives_and_asserts_scoped() {
            let mut harness = launched().await;
            harness.page().expect("page").script_ready();
            harness.navigate_and_wait_ready().await.expect("ready");
            assert_eq!(harness.state(), RunState::Ready);

            harness.page().expect("page").script_hook_output(
                "changeSfxVolume",
                vec![ConsoleEntry::new(
                    ConsoleLevel::Log,
                    "Sfx volume changed to: 0.8",
                )],
            );

            let cp = harness.checkpoint().expect("checkpoint");
            harness
                .drive(&Action::call_hook("changeSfxVolume", vec![json!(0.8)]))
                .await
                .expect("drive");

            let predicate = LogPredicate::substring("sfx volume changed to: 0.8");
            let entry = harness.assert_log(&predicate, cp).expect("scoped match");
            assert_eq!(entry.text, "Sfx volume changed to: 0.8");
        }

        #[tokio::test]
        async fn har_recording_is_opt_in() {
            let harness = launched().await;
            assert!(harness.network_trace().is_none());

            let config = HarnessConfig::default()
                .with_browser(crate::browser::BrowserConfig::default().with_har_recording(true));
            let mut recording = Harness::new(config);
            recording.launch().await.expect("launch");

            let recorder = recording
                .page()
                .expect("page")
                .record_network()
                .await
                .expect("recorder");
            recorder.record_response(
                "http://localhost:8080/index.wasm",
                200,
                "OK",
                "application/wasm",
                1024,
            );
            let trace = recording.network_trace().expect("trace");
            assert_eq!(trace.entry_count(), 1);
        }

        #[tokio::test]
        async fn teardown_is_idempotent_and_final() {
            let mut harness = launched().await;
            harness.teardown().await.expect("teardown");
            assert_eq!(harness.state(), RunState::TornDown);
            harness.teardown().await.expect("second teardown is a no-op");
            assert!(harness.page().is_err());
        }

        #[tokio::test]
        async fn conclude_reraises_the_scenario_error() {
            let harness = launched().await;
            let failure = Err(EnsayoError::AssertionMismatch {
                message: "expected log".to_string(),
                scoped_logs: vec![],
            });
            let err = harness.conclude("demo", failure).await.unwrap_err();
            assert!(matches!(err, EnsayoError::AssertionMismatch { .. }));
        }

        #[tokio::test]
        async fn conclude_writes_artifacts_on_failure() {
            let dir = tempfile::tempdir().expect("tempdir");
            let config = HarnessConfig::default().with_artifact_dir(dir.path());
            let mut harness = Harness::new(config);
            harness.launch().await.expect("launch");
            harness.page().expect("page").script_html("<html></html>");

            let failure = Err(EnsayoError::PollTimeout {
                ms: 100,
                waited_for: "fuel".to_string(),
            });
            let _ = harness.conclude("fuel-timeout", failure).await;

            let captured: Vec<_> = std::fs::read_dir(dir.path())
                .expect("read dir")
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();
            assert!(captured.iter().any(|name| name.contains("fuel-timeout")));
        }
    }
}
