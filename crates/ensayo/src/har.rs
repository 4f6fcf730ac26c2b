//! HAR-format network traces (HAR 1.2).
//!
//! A scenario can record the requests the export makes while loading
//! (engine script, WASM module, pack file) and save them as a `.har`
//! next to the other run outputs. Browsers and proxies open the format
//! directly, which makes "the pack never loaded" failures diagnosable
//! offline.

use crate::result::EnsayoResult;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// HAR file root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Har {
    /// Log container
    pub log: HarLog,
}

impl Har {
    /// New empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: HarLog::new(),
        }
    }

    /// Parse from JSON.
    ///
    /// # Errors
    ///
    /// Returns a JSON error for malformed input.
    pub fn from_json(json: &str) -> EnsayoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns a JSON error on serialization failure.
    pub fn to_json(&self) -> EnsayoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Persist as a `.har` file.
    ///
    /// # Errors
    ///
    /// Returns JSON or I/O errors.
    pub fn save(&self, path: &Path) -> EnsayoResult<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), entries = self.entry_count(), "har written");
        Ok(())
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.log.entries.len()
    }

    /// Append an entry.
    pub fn add_entry(&mut self, entry: HarEntry) {
        self.log.entries.push(entry);
    }

    /// First entry whose URL matches exactly.
    #[must_use]
    pub fn find_by_url(&self, url: &str) -> Option<&HarEntry> {
        self.log.entries.iter().find(|e| e.request.url == url)
    }

    /// Entries whose URL contains the fragment.
    #[must_use]
    pub fn find_containing(&self, fragment: &str) -> Vec<&HarEntry> {
        self.log
            .entries
            .iter()
            .filter(|e| e.request.url.contains(fragment))
            .collect()
    }

    /// Entries that completed with a non-success status.
    #[must_use]
    pub fn failed_entries(&self) -> Vec<&HarEntry> {
        self.log
            .entries
            .iter()
            .filter(|e| e.response.status == 0 || e.response.status >= 400)
            .collect()
    }
}

impl Default for Har {
    fn default() -> Self {
        Self::new()
    }
}

/// HAR log container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarLog {
    /// Format version (always "1.2")
    pub version: String,
    /// Creator application
    pub creator: HarCreator,
    /// Recorded request/response pairs
    pub entries: Vec<HarEntry>,
}

impl HarLog {
    /// New empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: "1.2".to_string(),
            creator: HarCreator::ensayo(),
            entries: Vec::new(),
        }
    }
}

impl Default for HarLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Creator stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarCreator {
    /// Application name
    pub name: String,
    /// Application version
    pub version: String,
}

impl HarCreator {
    /// This crate's stamp.
    #[must_use]
    pub fn ensayo() -> Self {
        Self {
            name: "Ensayo".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarEntry {
    /// Start time, ISO 8601
    #[serde(rename = "startedDateTime")]
    pub started_date_time: String,
    /// Total time in milliseconds
    pub time: f64,
    /// Request half
    pub request: HarRequest,
    /// Response half
    pub response: HarResponse,
}

impl HarEntry {
    /// New entry stamped with the current local time.
    #[must_use]
    pub fn new(request: HarRequest, response: HarResponse) -> Self {
        Self {
            started_date_time: Local::now().to_rfc3339(),
            time: 0.0,
            request,
            response,
        }
    }

    /// Set the total time.
    #[must_use]
    pub const fn with_time(mut self, time_ms: f64) -> Self {
        self.time = time_ms;
        self
    }
}

/// Request half of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarRequest {
    /// HTTP method
    pub method: String,
    /// Full URL
    pub url: String,
    /// HTTP version
    #[serde(rename = "httpVersion")]
    pub http_version: String,
}

impl HarRequest {
    /// A GET request, the only kind the export issues while loading.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            http_version: "HTTP/1.1".to_string(),
        }
    }
}

/// Response half of an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarResponse {
    /// HTTP status; 0 for aborted/failed fetches
    pub status: u16,
    /// Status text
    #[serde(rename = "statusText")]
    pub status_text: String,
    /// Response MIME type
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Body size in bytes, -1 when unknown
    #[serde(rename = "bodySize")]
    pub body_size: i64,
}

impl HarResponse {
    /// New response record.
    #[must_use]
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            mime_type: String::new(),
            body_size: -1,
        }
    }

    /// Set the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = mime.into();
        self
    }

    /// Set the body size.
    #[must_use]
    pub const fn with_body_size(mut self, size: i64) -> Self {
        self.body_size = size;
        self
    }
}

/// Shared-handle recorder assembling entries from CDP network events.
///
/// Request and response arrive as separate events; they are correlated
/// by URL, which is sufficient for the export's load traffic (each
/// asset is fetched once). Clones share the same archive.
#[derive(Debug, Clone, Default)]
pub struct HarRecorder {
    har: Arc<Mutex<Har>>,
    pending_methods: Arc<Mutex<HashMap<String, String>>>,
}

impl HarRecorder {
    /// New empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Note an outgoing request.
    pub fn record_request(&self, method: &str, url: &str) {
        self.pending_methods
            .lock()
            .expect("har pending lock")
            .insert(url.to_string(), method.to_string());
    }

    /// Note a completed response, closing out its request if seen.
    pub fn record_response(
        &self,
        url: &str,
        status: u16,
        status_text: &str,
        mime_type: &str,
        body_size: i64,
    ) {
        let method = self
            .pending_methods
            .lock()
            .expect("har pending lock")
            .remove(url)
            .unwrap_or_else(|| "GET".to_string());
        let mut request = HarRequest::get(url);
        request.method = method;
        let response = HarResponse::new(status, status_text)
            .with_mime_type(mime_type)
            .with_body_size(body_size);
        self.har
            .lock()
            .expect("har lock")
            .add_entry(HarEntry::new(request, response));
    }

    /// Entries recorded so far.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.har.lock().expect("har lock").entry_count()
    }

    /// A copy of the archive as it stands.
    #[must_use]
    pub fn snapshot(&self) -> Har {
        self.har.lock().expect("har lock").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_export() -> Har {
        let mut har = Har::new();
        har.add_entry(
            HarEntry::new(
                HarRequest::get("http://localhost:8080/index.html"),
                HarResponse::new(200, "OK").with_mime_type("text/html"),
            )
            .with_time(12.5),
        );
        har.add_entry(HarEntry::new(
            HarRequest::get("http://localhost:8080/index.wasm"),
            HarResponse::new(200, "OK")
                .with_mime_type("application/wasm")
                .with_body_size(34_000_000),
        ));
        har.add_entry(HarEntry::new(
            HarRequest::get("http://localhost:8080/index.pck"),
            HarResponse::new(404, "Not Found"),
        ));
        har
    }

    #[test]
    fn records_and_finds_entries() {
        let har = loaded_export();
        assert_eq!(har.entry_count(), 3);
        assert!(har.find_by_url("http://localhost:8080/index.wasm").is_some());
        assert!(har.find_by_url("http://localhost:8080/other").is_none());
        assert_eq!(har.find_containing("index.").len(), 3);
        assert_eq!(har.find_containing(".wasm").len(), 1);
    }

    #[test]
    fn failed_entries_surface_the_missing_pack() {
        let har = loaded_export();
        let failed = har.failed_entries();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].request.url.ends_with("index.pck"));
    }

    #[test]
    fn json_round_trip_keeps_the_har_field_names() {
        let har = loaded_export();
        let json = har.to_json().expect("serialize");
        assert!(json.contains("\"startedDateTime\""));
        assert!(json.contains("\"httpVersion\""));
        assert!(json.contains("\"version\": \"1.2\""));

        let parsed = Har::from_json(&json).expect("parse");
        assert_eq!(parsed, har);
    }

    #[test]
    fn save_writes_a_readable_archive() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("load.har");
        loaded_export().save(&path).expect("save");

        let raw = std::fs::read_to_string(&path).expect("read");
        let parsed = Har::from_json(&raw).expect("parse");
        assert_eq!(parsed.entry_count(), 3);
        assert_eq!(parsed.log.creator.name, "Ensayo");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(Har::from_json("{\"log\": []}").is_err());
    }

    #[test]
    fn recorder_correlates_request_and_response_by_url() {
        let recorder = HarRecorder::new();
        recorder.record_request("GET", "http://localhost:8080/index.wasm");
        recorder.record_response(
            "http://localhost:8080/index.wasm",
            200,
            "OK",
            "application/wasm",
            34_000_000,
        );
        // Response with no request seen: method falls back to GET.
        recorder.record_response("http://localhost:8080/favicon.ico", 404, "Not Found", "", -1);

        let har = recorder.snapshot();
        assert_eq!(har.entry_count(), 2);
        let wasm = har
            .find_by_url("http://localhost:8080/index.wasm")
            .expect("wasm entry");
        assert_eq!(wasm.request.method, "GET");
        assert_eq!(wasm.response.status, 200);
        assert_eq!(har.failed_entries().len(), 1);
    }

    #[test]
    fn recorder_clones_share_the_archive() {
        let writer = HarRecorder::new();
        let reader = writer.clone();
        writer.record_response("http://localhost:8080/index.html", 200, "OK", "text/html", 512);
        assert_eq!(reader.entry_count(), 1);
    }
}
