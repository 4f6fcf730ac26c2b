//! Result and error types for Ensayo.

use thiserror::Error;

/// Result type for Ensayo operations
pub type EnsayoResult<T> = Result<T, EnsayoError>;

/// Errors that can occur while driving the game under test.
///
/// Every variant is fatal to the current test run: the harness tears
/// the page down and propagates the error to the test runner unchanged.
#[derive(Debug, Error)]
pub enum EnsayoError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// The readiness signal never became true within the bound
    #[error("Readiness signal '{signal}' not set after {ms}ms")]
    ReadinessTimeout {
        /// The page-context expression that was polled
        signal: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A polled predicate never became true within the bound
    #[error("Timed out after {ms}ms waiting for: {waited_for}")]
    PollTimeout {
        /// Timeout in milliseconds
        ms: u64,
        /// Description of what was waited for
        waited_for: String,
    },

    /// A DOM element was absent or never became visible
    #[error("Selector '{selector}' not visible after {ms}ms")]
    SelectorTimeout {
        /// CSS selector that was polled
        selector: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A named control has no entry in the coordinate table
    #[error("No coordinate entry for UI element '{name}'")]
    ElementNotFound {
        /// Logical element name
        name: String,
    },

    /// Observed log/DOM state differs from expected
    #[error("Assertion failed: {message}")]
    AssertionMismatch {
        /// What was expected and what was seen
        message: String,
        /// The log slice the assertion was scoped to
        scoped_logs: Vec<String>,
    },

    /// JavaScript evaluation error
    #[error("Script evaluation failed: {message}")]
    Evaluation {
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Coverage collection error
    #[error("Coverage collection failed: {message}")]
    Coverage {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong run state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Coordinate table could not be parsed
    #[error("Coordinate table error: {message}")]
    CoordinateTable {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnsayoError {
    /// True for the timeout-class failures of the error taxonomy.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ReadinessTimeout { .. } | Self::PollTimeout { .. } | Self::SelectorTimeout { .. }
        )
    }
}
