//! Ensayo: browser end-to-end harness for the `SkyLockAssault` HTML5 export.
//!
//! Ensayo (Spanish: "rehearsal") drives the Godot-exported game in a real
//! headless Chromium over the Chrome `DevTools` Protocol and observes it
//! through its console log stream, since the game renders into a canvas
//! and exposes no DOM for its internal state.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌───────────┐    ┌─────────────┐
//! │ Scenario  │    │  Harness  │    │  Headless   │
//! │ (flows)   │───►│ + page    │───►│  Chromium   │
//! │           │    │ + logs    │    │  (game)     │
//! └───────────┘    └───────────┘    └─────────────┘
//!       ▲                │
//!       └── scoped log ──┘
//!            assertions
//! ```
//!
//! The cycle every flow follows: checkpoint the log buffer, drive one
//! action (page-global hook or synthetic input), let the game settle,
//! then assert only against log entries produced after the checkpoint.
//!
//! Without the `browser` feature the same API runs against a scriptable
//! in-process page, which is how the flows themselves are unit tested.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod action;
mod artifacts;
mod assertion;
mod browser;
mod console;
mod coords;
mod harness;
mod result;

/// Typed bindings for the game's hooks, buses, and log messages.
pub mod controls;
/// Coverage collection over the CDP Profiler domain.
pub mod coverage;
/// Reusable scenario flows over a ready harness.
pub mod flows;
/// HAR 1.2 network traces.
pub mod har;
/// Bounded waits and fixed-interval polling.
pub mod wait;

pub use action::{
    canvas_box_script, click_id_script, element_checked_script, element_value_script,
    element_visible_script, hook_call_script, hook_defined_script, set_checked_script,
    set_range_script, Action,
};
pub use artifacts::{capture_failure_artifacts, ArtifactPaths};
pub use assertion::{
    assert_approx_eq, assert_log_contains, assert_no_log_matches, assert_value_eq, find_match,
    LogPredicate,
};
pub use browser::{Browser, BrowserConfig, Page};
pub use console::{ConsoleEntry, ConsoleLevel, LogBuffer, LogCheckpoint};
pub use coords::{BoundingBox, CoordinateTable, UiPoint};
pub use coverage::{CoverageConfig, CoverageRange, CoverageReport, FunctionCoverage, ScriptCoverage};
pub use har::{Har, HarEntry, HarRecorder, HarRequest, HarResponse};
pub use harness::{Harness, HarnessConfig, RunState, DEFAULT_GAME_URL};
pub use result::{EnsayoError, EnsayoResult};
pub use wait::{
    poll_until, settle, WaitOptions, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
    TIMEOUT_ENV_VAR,
};

#[cfg(feature = "browser")]
pub use wait::poll_until_async;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::action::*;
    pub use super::artifacts::*;
    pub use super::assertion::*;
    pub use super::browser::*;
    pub use super::console::*;
    pub use super::controls::*;
    pub use super::coords::*;
    pub use super::coverage::*;
    pub use super::flows::*;
    pub use super::har::*;
    pub use super::harness::*;
    pub use super::result::*;
    pub use super::wait::*;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_failure() {
        let err = EnsayoError::ReadinessTimeout {
            signal: controls::READINESS_SIGNAL.to_string(),
            ms: 5000,
        };
        let msg = err.to_string();
        assert!(msg.contains("window.godotInitialized"));
        assert!(msg.contains("5000"));
    }

    #[test]
    fn prelude_exposes_the_scenario_surface() {
        use prelude::*;
        let _config = HarnessConfig::default();
        let _predicate = LogPredicate::substring("fuel left:");
        let _bus = AudioBus::Master;
    }
}
