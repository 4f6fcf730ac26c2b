//! V8 precise coverage collection over the CDP Profiler domain.
//!
//! Scenarios can record which of the export's JS functions actually ran
//! (`Profiler.startPreciseCoverage` before navigation, `takePreciseCoverage`
//! after the flow) and persist the report as JSON next to the other run
//! outputs. The types here mirror the protocol's wire shape so a take
//! response deserializes directly.

use crate::result::{EnsayoError, EnsayoResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for `Profiler.startPreciseCoverage`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageConfig {
    /// Collect per-function call counts
    pub call_count: bool,
    /// Collect block-level ranges, not just function entry
    pub detailed: bool,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            call_count: true,
            detailed: true,
        }
    }
}

impl CoverageConfig {
    /// Defaults: call counts and detailed ranges on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle call counts.
    #[must_use]
    pub const fn with_call_count(mut self, enabled: bool) -> Self {
        self.call_count = enabled;
        self
    }

    /// Toggle detailed ranges.
    #[must_use]
    pub const fn with_detailed(mut self, enabled: bool) -> Self {
        self.detailed = enabled;
        self
    }
}

/// One executed (or skipped) byte range within a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRange {
    /// Start byte offset in the script source
    pub start_offset: u32,
    /// End byte offset
    pub end_offset: u32,
    /// Execution count for the range
    pub count: u32,
}

/// Coverage for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCoverage {
    /// Function name; empty for anonymous functions
    pub function_name: String,
    /// Covered ranges
    pub ranges: Vec<CoverageRange>,
    /// Whether block-level coverage was collected
    pub is_block_coverage: bool,
}

impl FunctionCoverage {
    /// True if the function ran at least once.
    #[must_use]
    pub fn was_executed(&self) -> bool {
        self.ranges.iter().any(|r| r.count > 0)
    }

    /// Total execution count across ranges.
    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.ranges.iter().map(|r| r.count).sum()
    }
}

/// Coverage for one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptCoverage {
    /// CDP script id
    pub script_id: String,
    /// Script URL
    pub url: String,
    /// Per-function coverage
    pub functions: Vec<FunctionCoverage>,
}

impl ScriptCoverage {
    /// Number of functions that ran.
    #[must_use]
    pub fn functions_executed(&self) -> usize {
        self.functions.iter().filter(|f| f.was_executed()).count()
    }

    /// Total functions seen.
    #[must_use]
    pub fn functions_total(&self) -> usize {
        self.functions.len()
    }

    /// Executed-function percentage; empty scripts count as fully covered.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage_percent(&self) -> f64 {
        if self.functions.is_empty() {
            return 100.0;
        }
        (self.functions_executed() as f64 / self.functions_total() as f64) * 100.0
    }
}

/// The full result of one `Profiler.takePreciseCoverage`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    /// Per-script coverage
    #[serde(rename = "result")]
    pub scripts: Vec<ScriptCoverage>,
    /// Protocol timestamp of the take, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl CoverageReport {
    /// Empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw `takePreciseCoverage` response body.
    ///
    /// # Errors
    ///
    /// Returns [`EnsayoError::Coverage`] on a malformed payload.
    pub fn from_take_response(raw: &str) -> EnsayoResult<Self> {
        serde_json::from_str(raw).map_err(|e| EnsayoError::Coverage {
            message: format!("unparseable takePreciseCoverage payload: {e}"),
        })
    }

    /// Functions executed across all scripts.
    #[must_use]
    pub fn functions_executed(&self) -> usize {
        self.scripts.iter().map(ScriptCoverage::functions_executed).sum()
    }

    /// Total functions across all scripts.
    #[must_use]
    pub fn functions_total(&self) -> usize {
        self.scripts.iter().map(ScriptCoverage::functions_total).sum()
    }

    /// Overall executed-function percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn coverage_percent(&self) -> f64 {
        let total = self.functions_total();
        if total == 0 {
            return 100.0;
        }
        (self.functions_executed() as f64 / total as f64) * 100.0
    }

    /// Keep only scripts whose URL contains the pattern. Chromium
    /// internals and extension scripts show up in raw takes; filtering
    /// to the export's origin keeps reports readable.
    #[must_use]
    pub fn filter_by_url(&self, pattern: &str) -> Self {
        Self {
            scripts: self
                .scripts
                .iter()
                .filter(|s| s.url.contains(pattern))
                .cloned()
                .collect(),
            timestamp: self.timestamp,
        }
    }

    /// One-line-per-script human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!(
            "coverage: {:.1}% ({}/{} functions)\n",
            self.coverage_percent(),
            self.functions_executed(),
            self.functions_total()
        );
        for script in &self.scripts {
            out.push_str(&format!(
                "  {} - {:.1}% ({}/{})\n",
                script.url,
                script.coverage_percent(),
                script.functions_executed(),
                script.functions_total()
            ));
        }
        out
    }

    /// Persist the report as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns I/O or JSON serialization errors.
    pub fn save_json(&self, path: &Path) -> EnsayoResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), "coverage report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAKE_FIXTURE: &str = r#"{
        "result": [
            {
                "scriptId": "12",
                "url": "http://localhost:8080/index.js",
                "functions": [
                    {
                        "functionName": "changeMasterVolume",
                        "ranges": [
                            {"startOffset": 100, "endOffset": 220, "count": 3}
                        ],
                        "isBlockCoverage": true
                    },
                    {
                        "functionName": "audioResetPressed",
                        "ranges": [
                            {"startOffset": 230, "endOffset": 300, "count": 0}
                        ],
                        "isBlockCoverage": true
                    }
                ]
            },
            {
                "scriptId": "40",
                "url": "chrome-extension://internal/loader.js",
                "functions": [
                    {
                        "functionName": "",
                        "ranges": [
                            {"startOffset": 0, "endOffset": 50, "count": 1}
                        ],
                        "isBlockCoverage": false
                    }
                ]
            }
        ],
        "timestamp": 1724400000
    }"#;

    #[test]
    fn parses_a_take_response() {
        let report = CoverageReport::from_take_response(TAKE_FIXTURE).expect("parse");
        assert_eq!(report.scripts.len(), 2);
        assert_eq!(report.functions_total(), 3);
        assert_eq!(report.functions_executed(), 2);
        assert_eq!(report.timestamp, Some(1_724_400_000.0));

        let game = &report.scripts[0];
        assert!(game.functions[0].was_executed());
        assert_eq!(game.functions[0].total_count(), 3);
        assert!(!game.functions[1].was_executed());
    }

    #[test]
    fn malformed_payload_is_a_coverage_error() {
        let err = CoverageReport::from_take_response("{\"result\": 7}").unwrap_err();
        assert!(matches!(err, EnsayoError::Coverage { .. }));
    }

    #[test]
    fn url_filter_drops_browser_internals() {
        let report = CoverageReport::from_take_response(TAKE_FIXTURE).expect("parse");
        let game_only = report.filter_by_url("localhost:8080");
        assert_eq!(game_only.scripts.len(), 1);
        assert_eq!(game_only.functions_total(), 2);
        assert_eq!(game_only.functions_executed(), 1);
    }

    #[test]
    fn percentages() {
        let report = CoverageReport::from_take_response(TAKE_FIXTURE).expect("parse");
        let game_only = report.filter_by_url("localhost:8080");
        assert!((game_only.coverage_percent() - 50.0).abs() < f64::EPSILON);
        assert!((CoverageReport::new().coverage_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_names_each_script() {
        let report = CoverageReport::from_take_response(TAKE_FIXTURE).expect("parse");
        let summary = report.summary();
        assert!(summary.contains("index.js"));
        assert!(summary.contains("66.7%"));
    }

    #[test]
    fn save_and_reload_round_trip() {
        let report = CoverageReport::from_take_response(TAKE_FIXTURE).expect("parse");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coverage.json");
        report.save_json(&path).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        let reloaded = CoverageReport::from_take_response(&raw).expect("reparse");
        assert_eq!(reloaded, report);
    }
}
