//! Browser control for headless game testing.
//!
//! With the `browser` feature enabled this drives a real Chromium over
//! the Chrome `DevTools` Protocol via chromiumoxide. Without it, a
//! scriptable in-process page with the same async surface stands in, so
//! flow code and its unit tests compile and run in either configuration.

use crate::action::Action;
use crate::console::LogBuffer;
use crate::coords::{BoundingBox, CoordinateTable};
use crate::result::{EnsayoError, EnsayoResult};
use crate::wait::WaitOptions;

/// Browser launch configuration.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Force software WebGL so the game renders on GPU-less CI runners
    pub software_rendering: bool,
    /// Path to the chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Record network traffic into a HAR archive
    pub record_har: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            software_rendering: true,
            chromium_path: None,
            sandbox: true,
            record_har: false,
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions.
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode.
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Toggle software rendering flags.
    #[must_use]
    pub const fn with_software_rendering(mut self, enabled: bool) -> Self {
        self.software_rendering = enabled;
        self
    }

    /// Set chromium path explicitly.
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable the sandbox (for containers/CI).
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Toggle HAR network recording.
    #[must_use]
    pub const fn with_har_recording(mut self, enabled: bool) -> Self {
        self.record_har = enabled;
        self
    }

    /// Extra chromium arguments implied by this configuration.
    #[must_use]
    pub fn chromium_args(&self) -> Vec<&'static str> {
        if self.software_rendering {
            // WebGL must keep working without a GPU, otherwise the
            // canvas stays black and coordinate clicks hit nothing.
            vec![
                "--enable-unsafe-swiftshader",
                "--disable-gpu",
                "--use-gl=swiftshader",
            ]
        } else {
            Vec::new()
        }
    }
}

// ============================================================================
// Real CDP implementation (when the `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(
    clippy::wildcard_imports,
    clippy::significant_drop_tightening,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]
mod cdp {
    use super::*;
    use crate::action::{
        canvas_box_script, click_id_script, element_checked_script, element_value_script,
        element_visible_script, hook_call_script, set_checked_script, set_range_script,
    };
    use crate::console::{ConsoleEntry, ConsoleLevel};
    use crate::coverage::{CoverageConfig, CoverageReport};
    use crate::har::HarRecorder;
    use crate::wait::poll_until_async;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::input::{
        DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
        DispatchMouseEventType, MouseButton,
    };
    use chromiumoxide::cdp::browser_protocol::network::{
        EventRequestWillBeSent, EventResponseReceived,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams,
    };
    use chromiumoxide::cdp::js_protocol::profiler::{
        EnableParams as ProfilerEnableParams, StartPreciseCoverageParams,
        TakePreciseCoverageParams,
    };
    use chromiumoxide::cdp::js_protocol::runtime::{ConsoleApiCalledType, EventConsoleApiCalled};
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Browser instance with a real CDP connection.
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
        inner: Arc<Mutex<CdpBrowser>>,
        #[allow(dead_code)]
        handle: tokio::task::JoinHandle<()>,
    }

    impl Browser {
        /// Launch a chromium instance.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::BrowserLaunch`] if the browser cannot start.
        pub async fn launch(config: BrowserConfig) -> EnsayoResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.viewport_width, config.viewport_height)
                .args(config.chromium_args());

            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder.build().map_err(|e| EnsayoError::BrowserLaunch {
                message: e.to_string(),
            })?;

            tracing::debug!(headless = config.headless, "launching chromium");
            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| EnsayoError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(h) = handler.next().await {
                    if h.is_err() {
                        break;
                    }
                }
            });

            Ok(Self {
                config,
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }

        /// Open a fresh page.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Page`] if the page cannot be created.
        pub async fn new_page(&self) -> EnsayoResult<Page> {
            let browser = self.inner.lock().await;
            let cdp_page =
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| EnsayoError::Page {
                        message: e.to_string(),
                    })?;
            Ok(Page {
                url: String::from("about:blank"),
                ready: false,
                logs: LogBuffer::new(),
                inner: Arc::new(Mutex::new(cdp_page)),
            })
        }

        /// The launch configuration.
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close the browser.
        pub async fn close(self) -> EnsayoResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| EnsayoError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            Ok(())
        }
    }

    /// A page on a real CDP connection.
    #[derive(Debug)]
    pub struct Page {
        url: String,
        ready: bool,
        logs: LogBuffer,
        inner: Arc<Mutex<CdpPage>>,
    }

    fn remote_arg_text(arg: &chromiumoxide::cdp::js_protocol::runtime::RemoteObject) -> String {
        match &arg.value {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => arg.description.clone().unwrap_or_default(),
        }
    }

    const fn console_level(kind: &ConsoleApiCalledType) -> ConsoleLevel {
        match kind {
            ConsoleApiCalledType::Log => ConsoleLevel::Log,
            ConsoleApiCalledType::Info => ConsoleLevel::Info,
            ConsoleApiCalledType::Warning => ConsoleLevel::Warn,
            ConsoleApiCalledType::Error => ConsoleLevel::Error,
            ConsoleApiCalledType::Debug => ConsoleLevel::Debug,
            _ => ConsoleLevel::Other,
        }
    }

    impl Page {
        /// Start capturing console messages into a shared buffer.
        ///
        /// Must be attached before navigation so startup logs are not
        /// lost. Returns a handle onto the buffer; the page keeps its
        /// own for artifact capture.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Page`] if the event stream cannot open.
        pub async fn attach_log_observer(&self) -> EnsayoResult<LogBuffer> {
            let page = self.inner.lock().await;
            let mut events = page
                .event_listener::<EventConsoleApiCalled>()
                .await
                .map_err(|e| EnsayoError::Page {
                    message: e.to_string(),
                })?;
            let sink = self.logs.clone();
            tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    let text = event
                        .args
                        .iter()
                        .map(remote_arg_text)
                        .collect::<Vec<_>>()
                        .join(" ");
                    sink.push(ConsoleEntry::new(console_level(&event.r#type), text));
                }
            });
            Ok(self.logs.clone())
        }

        /// Navigate to a URL.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Navigation`] on failure.
        pub async fn navigate(&mut self, url: &str) -> EnsayoResult<()> {
            tracing::debug!(url, "navigating");
            let page = self.inner.lock().await;
            page.goto(url).await.map_err(|e| EnsayoError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            drop(page);
            self.url = url.to_string();
            Ok(())
        }

        /// Poll the readiness signal until it is true.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::ReadinessTimeout`] naming the signal.
        pub async fn wait_ready(&mut self, signal: &str, options: WaitOptions) -> EnsayoResult<()> {
            let expr = format!("{signal} === true");
            let result = {
                let page = &*self;
                let expr = expr.as_str();
                poll_until_async(
                    move || async move { page.evaluate::<bool>(expr).await.or(Ok(false)) },
                    options,
                    signal,
                )
                .await
            };
            match result {
                Ok(elapsed) => {
                    tracing::debug!(signal, ?elapsed, "ready");
                    self.ready = true;
                    Ok(())
                }
                Err(EnsayoError::PollTimeout { ms, .. }) => Err(EnsayoError::ReadinessTimeout {
                    signal: signal.to_string(),
                    ms,
                }),
                Err(other) => Err(other),
            }
        }

        /// Evaluate a script and deserialize its result.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Evaluation`] on script or decode failure.
        pub async fn evaluate<T: serde::de::DeserializeOwned>(
            &self,
            script: &str,
        ) -> EnsayoResult<T> {
            let page = self.inner.lock().await;
            let result = page
                .evaluate(script)
                .await
                .map_err(|e| EnsayoError::Evaluation {
                    message: e.to_string(),
                })?;
            result.into_value().map_err(|e| EnsayoError::Evaluation {
                message: e.to_string(),
            })
        }

        /// Run a script for its side effects only.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Evaluation`] on script failure.
        pub async fn exec(&self, script: &str) -> EnsayoResult<()> {
            let page = self.inner.lock().await;
            page.evaluate(script)
                .await
                .map_err(|e| EnsayoError::Evaluation {
                    message: e.to_string(),
                })?;
            Ok(())
        }

        /// Invoke a page-global hook: `window.NAME([...args])`.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Evaluation`] if the hook is missing or throws.
        pub async fn call_hook(&self, name: &str, args: &[Value]) -> EnsayoResult<()> {
            self.exec(&hook_call_script(name, args)).await
        }

        /// Click at absolute page coordinates with a synthetic mouse event.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Input`] on dispatch failure.
        pub async fn click_at(&self, x: f64, y: f64) -> EnsayoResult<()> {
            let page = self.inner.lock().await;
            for kind in [
                DispatchMouseEventType::MousePressed,
                DispatchMouseEventType::MouseReleased,
            ] {
                let params = DispatchMouseEventParams::builder()
                    .r#type(kind)
                    .x(x)
                    .y(y)
                    .button(MouseButton::Left)
                    .click_count(1)
                    .build()
                    .map_err(|e| EnsayoError::Input { message: e })?;
                page.execute(params).await.map_err(|e| EnsayoError::Input {
                    message: e.to_string(),
                })?;
            }
            Ok(())
        }

        /// Press and release a keyboard key.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Input`] on dispatch failure.
        pub async fn press_key(&self, key: &str) -> EnsayoResult<()> {
            let page = self.inner.lock().await;
            for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
                let params = DispatchKeyEventParams::builder()
                    .r#type(kind)
                    .key(key)
                    .build()
                    .map_err(|e| EnsayoError::Input { message: e })?;
                page.execute(params).await.map_err(|e| EnsayoError::Input {
                    message: e.to_string(),
                })?;
            }
            Ok(())
        }

        /// Click a DOM-overlay element by id.
        pub async fn click_id(&self, id: &str) -> EnsayoResult<()> {
            self.exec(&click_id_script(id)).await
        }

        /// Set a range input's value, dispatching `input` and `change`.
        pub async fn set_range_value(&self, id: &str, value: f64) -> EnsayoResult<()> {
            self.exec(&set_range_script(id, value)).await
        }

        /// Set a checkbox's checked state, dispatching `change`.
        pub async fn set_checked(&self, id: &str, checked: bool) -> EnsayoResult<()> {
            self.exec(&set_checked_script(id, checked)).await
        }

        /// Read an input's value as a string.
        pub async fn element_value(&self, id: &str) -> EnsayoResult<String> {
            self.evaluate(&element_value_script(id)).await
        }

        /// Read a checkbox's checked state.
        pub async fn element_checked(&self, id: &str) -> EnsayoResult<bool> {
            self.evaluate(&element_checked_script(id)).await
        }

        /// Poll until an element exists and is visible and interactive.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::SelectorTimeout`] on expiry.
        pub async fn wait_for_visible(&self, id: &str, options: WaitOptions) -> EnsayoResult<()> {
            let script = element_visible_script(id);
            let result = {
                let script = script.as_str();
                poll_until_async(
                    move || async move { self.evaluate::<bool>(script).await.or(Ok(false)) },
                    options,
                    id,
                )
                .await
            };
            match result {
                Ok(_) => Ok(()),
                Err(EnsayoError::PollTimeout { ms, .. }) => Err(EnsayoError::SelectorTimeout {
                    selector: format!("#{id}"),
                    ms,
                }),
                Err(other) => Err(other),
            }
        }

        /// The document title.
        pub async fn title(&self) -> EnsayoResult<String> {
            self.evaluate("document.title").await
        }

        /// The full DOM serialized as HTML.
        pub async fn content(&self) -> EnsayoResult<String> {
            self.evaluate("document.documentElement.outerHTML").await
        }

        /// Capture a PNG screenshot.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Screenshot`] on failure.
        pub async fn screenshot(&self) -> EnsayoResult<Vec<u8>> {
            let page = self.inner.lock().await;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let shot = page
                .execute(params)
                .await
                .map_err(|e| EnsayoError::Screenshot {
                    message: e.to_string(),
                })?;
            use base64::Engine;
            base64::engine::general_purpose::STANDARD
                .decode(&shot.data)
                .map_err(|e| EnsayoError::Screenshot {
                    message: e.to_string(),
                })
        }

        /// Start recording network traffic into a HAR archive.
        ///
        /// Attach before navigation so the export's load traffic (engine
        /// script, WASM module, pack file) is captured.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Page`] if the event streams cannot open.
        pub async fn record_network(&self) -> EnsayoResult<HarRecorder> {
            let page = self.inner.lock().await;
            let mut requests = page
                .event_listener::<EventRequestWillBeSent>()
                .await
                .map_err(|e| EnsayoError::Page {
                    message: e.to_string(),
                })?;
            let mut responses = page
                .event_listener::<EventResponseReceived>()
                .await
                .map_err(|e| EnsayoError::Page {
                    message: e.to_string(),
                })?;
            let recorder = HarRecorder::new();

            let request_sink = recorder.clone();
            tokio::spawn(async move {
                while let Some(event) = requests.next().await {
                    request_sink.record_request(&event.request.method, &event.request.url);
                }
            });
            let response_sink = recorder.clone();
            tokio::spawn(async move {
                while let Some(event) = responses.next().await {
                    let response = &event.response;
                    response_sink.record_response(
                        &response.url,
                        u16::try_from(response.status).unwrap_or(0),
                        &response.status_text,
                        &response.mime_type,
                        response.encoded_data_length as i64,
                    );
                }
            });
            Ok(recorder)
        }

        /// Begin V8 precise coverage collection.
        ///
        /// Call before navigation so the export's startup code is counted.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Coverage`] on protocol failure.
        pub async fn start_coverage(&self, config: &CoverageConfig) -> EnsayoResult<()> {
            let page = self.inner.lock().await;
            page.execute(ProfilerEnableParams::default())
                .await
                .map_err(|e| EnsayoError::Coverage {
                    message: e.to_string(),
                })?;
            let params = StartPreciseCoverageParams::builder()
                .call_count(config.call_count)
                .detailed(config.detailed)
                .build();
            page.execute(params)
                .await
                .map_err(|e| EnsayoError::Coverage {
                    message: e.to_string(),
                })?;
            Ok(())
        }

        /// Take the coverage accumulated since [`Page::start_coverage`].
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::Coverage`] on protocol or decode failure.
        pub async fn take_coverage(&self) -> EnsayoResult<CoverageReport> {
            let page = self.inner.lock().await;
            let resp = page
                .execute(TakePreciseCoverageParams::default())
                .await
                .map_err(|e| EnsayoError::Coverage {
                    message: e.to_string(),
                })?;
            let raw = serde_json::to_string(&*resp).map_err(|e| EnsayoError::Coverage {
                message: e.to_string(),
            })?;
            CoverageReport::from_take_response(&raw)
        }

        /// Bounding box of the game canvas.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::ElementNotFound`] when no canvas exists.
        pub async fn canvas_box(&self) -> EnsayoResult<BoundingBox> {
            let boxed: Option<BoundingBox> = self.evaluate(&canvas_box_script()).await?;
            boxed.ok_or_else(|| EnsayoError::ElementNotFound {
                name: "canvas".to_string(),
            })
        }

        /// Click an in-canvas control through the coordinate table.
        ///
        /// # Errors
        ///
        /// Returns [`EnsayoError::ElementNotFound`] for unknown names.
        pub async fn click_element(
            &self,
            table: &CoordinateTable,
            name: &str,
        ) -> EnsayoResult<()> {
            let canvas = self.canvas_box().await?;
            let (x, y) = table.absolute(&canvas, name)?;
            self.click_at(x, y).await
        }

        /// Dispatch one action.
        ///
        /// # Errors
        ///
        /// Propagates the underlying drive error.
        pub async fn drive(&self, action: &Action, table: &CoordinateTable) -> EnsayoResult<()> {
            tracing::debug!(action = %action.describe(), "drive");
            match action {
                Action::CallHook { name, args } => self.call_hook(name, args).await,
                Action::ClickId { id } => self.click_id(id).await,
                Action::ClickAt { x, y } => self.click_at(*x, *y).await,
                Action::ClickElement { name } => self.click_element(table, name).await,
                Action::PressKey { key } => self.press_key(key).await,
                Action::SetRangeValue { id, value } => self.set_range_value(id, *value).await,
                Action::SetChecked { id, checked } => self.set_checked(id, *checked).await,
            }
        }

        /// Handle onto the console log buffer.
        #[must_use]
        pub fn logs(&self) -> LogBuffer {
            self.logs.clone()
        }

        /// Current URL as last navigated.
        #[must_use]
        pub fn current_url(&self) -> &str {
            &self.url
        }

        /// Whether the readiness wait has completed.
        #[must_use]
        pub const fn is_ready(&self) -> bool {
            self.ready
        }
    }
}

// ============================================================================
// Scripted implementation (when the `browser` feature is NOT enabled)
// ============================================================================

#[cfg(not(feature = "browser"))]
#[allow(clippy::missing_errors_doc, clippy::unused_async)]
mod scripted {
    use super::*;
    use crate::console::ConsoleEntry;
    use crate::coverage::{CoverageConfig, CoverageReport};
    use crate::har::HarRecorder;
    use serde_json::Value;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::{Arc, Mutex};

    /// Browser stand-in holding only configuration.
    #[derive(Debug)]
    pub struct Browser {
        config: BrowserConfig,
    }

    impl Browser {
        /// "Launch" immediately.
        pub async fn launch(config: BrowserConfig) -> EnsayoResult<Self> {
            Ok(Self { config })
        }

        /// Open a scripted page.
        pub async fn new_page(&self) -> EnsayoResult<Page> {
            Ok(Page::new())
        }

        /// The launch configuration.
        #[must_use]
        pub const fn config(&self) -> &BrowserConfig {
            &self.config
        }

        /// Close is a no-op.
        pub async fn close(self) -> EnsayoResult<()> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct PageState {
        title: String,
        html: String,
        ready: bool,
        canvas: Option<BoundingBox>,
        values: HashMap<String, String>,
        checks: HashMap<String, bool>,
        visible: HashSet<String>,
        hook_output: HashMap<String, VecDeque<Vec<ConsoleEntry>>>,
        hook_value_effects: HashMap<String, VecDeque<(String, String)>>,
        key_output: HashMap<String, VecDeque<Vec<ConsoleEntry>>>,
        hook_calls: Vec<(String, Vec<Value>)>,
        eval_stubs: HashMap<String, Value>,
        driven: Vec<String>,
        screenshot: Vec<u8>,
        coverage_started: bool,
        coverage: Option<CoverageReport>,
        recorder: HarRecorder,
    }

    /// A scripted page mirroring the CDP page's async surface.
    ///
    /// Tests pre-load it: mark the game ready, seed slider and checkbox
    /// state, and queue the console output each hook call should emit.
    /// Flow code then runs against it unchanged.
    #[derive(Debug, Clone, Default)]
    pub struct Page {
        url: Arc<Mutex<String>>,
        logs: LogBuffer,
        state: Arc<Mutex<PageState>>,
    }

    impl Page {
        /// Fresh scripted page with nothing loaded.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        fn state(&self) -> std::sync::MutexGuard<'_, PageState> {
            self.state.lock().expect("page state lock")
        }

        // ---- scripting surface (test setup) ----

        /// Mark the readiness signal as satisfied.
        pub fn script_ready(&self) {
            self.state().ready = true;
        }

        /// Set the document title.
        pub fn script_title(&self, title: impl Into<String>) {
            self.state().title = title.into();
        }

        /// Set the DOM snapshot returned by [`Page::content`].
        pub fn script_html(&self, html: impl Into<String>) {
            self.state().html = html.into();
        }

        /// Set the canvas bounding box.
        pub fn script_canvas(&self, canvas: BoundingBox) {
            self.state().canvas = Some(canvas);
        }

        /// Seed an input's value.
        pub fn script_value(&self, id: impl Into<String>, value: impl Into<String>) {
            self.state().values.insert(id.into(), value.into());
        }

        /// Seed a checkbox's state.
        pub fn script_checked(&self, id: impl Into<String>, checked: bool) {
            self.state().checks.insert(id.into(), checked);
        }

        /// Mark an element visible.
        pub fn script_visible(&self, id: impl Into<String>) {
            self.state().visible.insert(id.into());
        }

        /// Queue the console entries the next call of `hook` emits.
        /// Calls queue in FIFO order; an exhausted queue emits nothing.
        pub fn script_hook_output(&self, hook: impl Into<String>, entries: Vec<ConsoleEntry>) {
            self.state()
                .hook_output
                .entry(hook.into())
                .or_default()
                .push_back(entries);
        }

        /// Queue an input-value mutation applied on the next call of
        /// `hook`, emulating game logic that moves an overlay control.
        pub fn script_hook_value(
            &self,
            hook: impl Into<String>,
            id: impl Into<String>,
            value: impl Into<String>,
        ) {
            self.state()
                .hook_value_effects
                .entry(hook.into())
                .or_default()
                .push_back((id.into(), value.into()));
        }

        /// Queue the console entries the next press of `key` emits.
        /// Calls queue in FIFO order; an exhausted queue emits nothing.
        pub fn script_key_output(&self, key: impl Into<String>, entries: Vec<ConsoleEntry>) {
            self.state()
                .key_output
                .entry(key.into())
                .or_default()
                .push_back(entries);
        }

        /// Stub the result of an exact [`Page::evaluate`] script.
        pub fn script_eval(&self, script: impl Into<String>, result: Value) {
            self.state().eval_stubs.insert(script.into(), result);
        }

        /// Set the bytes returned by [`Page::screenshot`].
        pub fn script_screenshot(&self, bytes: Vec<u8>) {
            self.state().screenshot = bytes;
        }

        /// Set the report returned by [`Page::take_coverage`].
        pub fn script_coverage(&self, report: CoverageReport) {
            self.state().coverage = Some(report);
        }

        /// Hook invocations recorded so far, in order.
        #[must_use]
        pub fn hook_calls(&self) -> Vec<(String, Vec<Value>)> {
            self.state().hook_calls.clone()
        }

        /// Describe-strings of every action driven so far.
        #[must_use]
        pub fn driven_actions(&self) -> Vec<String> {
            self.state().driven.clone()
        }

        // ---- the CDP-mirroring surface ----

        /// Returns a handle onto the console buffer.
        pub async fn attach_log_observer(&self) -> EnsayoResult<LogBuffer> {
            Ok(self.logs.clone())
        }

        /// Record the navigation.
        pub async fn navigate(&mut self, url: &str) -> EnsayoResult<()> {
            *self.url.lock().expect("url lock") = url.to_string();
            Ok(())
        }

        /// Succeed if scripted ready, otherwise time out immediately.
        pub async fn wait_ready(&mut self, signal: &str, options: WaitOptions) -> EnsayoResult<()> {
            if self.state().ready {
                Ok(())
            } else {
                Err(EnsayoError::ReadinessTimeout {
                    signal: signal.to_string(),
                    ms: options.timeout_ms,
                })
            }
        }

        /// Return a stubbed evaluation result.
        pub async fn evaluate<T: serde::de::DeserializeOwned>(
            &self,
            script: &str,
        ) -> EnsayoResult<T> {
            let stub = self.state().eval_stubs.get(script).cloned().ok_or_else(|| {
                EnsayoError::Evaluation {
                    message: format!("no scripted result for: {script}"),
                }
            })?;
            serde_json::from_value(stub).map_err(|e| EnsayoError::Evaluation {
                message: e.to_string(),
            })
        }

        /// Record the script as driven.
        pub async fn exec(&self, script: &str) -> EnsayoResult<()> {
            self.state().driven.push(script.to_string());
            Ok(())
        }

        /// Record the call, apply its queued input effect, and emit its
        /// queued console output.
        pub async fn call_hook(&self, name: &str, args: &[Value]) -> EnsayoResult<()> {
            let emitted = {
                let mut state = self.state();
                state.hook_calls.push((name.to_string(), args.to_vec()));
                if let Some((id, value)) = state
                    .hook_value_effects
                    .get_mut(name)
                    .and_then(VecDeque::pop_front)
                {
                    state.values.insert(id, value);
                }
                state
                    .hook_output
                    .get_mut(name)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_default()
            };
            for entry in emitted {
                self.logs.push(entry);
            }
            Ok(())
        }

        /// Record the click.
        pub async fn click_at(&self, x: f64, y: f64) -> EnsayoResult<()> {
            self.state().driven.push(format!("click at ({x}, {y})"));
            Ok(())
        }

        /// Record the key press and emit its queued console output.
        pub async fn press_key(&self, key: &str) -> EnsayoResult<()> {
            let emitted = {
                let mut state = self.state();
                state.driven.push(format!("press {key}"));
                state
                    .key_output
                    .get_mut(key)
                    .and_then(VecDeque::pop_front)
                    .unwrap_or_default()
            };
            for entry in emitted {
                self.logs.push(entry);
            }
            Ok(())
        }

        /// Record the click by id.
        pub async fn click_id(&self, id: &str) -> EnsayoResult<()> {
            self.state().driven.push(format!("click #{id}"));
            Ok(())
        }

        /// Update the seeded value, recording the action.
        pub async fn set_range_value(&self, id: &str, value: f64) -> EnsayoResult<()> {
            let mut state = self.state();
            state.driven.push(format!("set #{id} = {value}"));
            state.values.insert(id.to_string(), format!("{value}"));
            Ok(())
        }

        /// Update the seeded checkbox state, recording the action.
        pub async fn set_checked(&self, id: &str, checked: bool) -> EnsayoResult<()> {
            let mut state = self.state();
            state.driven.push(format!("set #{id} checked = {checked}"));
            state.checks.insert(id.to_string(), checked);
            Ok(())
        }

        /// Read a seeded value.
        pub async fn element_value(&self, id: &str) -> EnsayoResult<String> {
            self.state()
                .values
                .get(id)
                .cloned()
                .ok_or_else(|| EnsayoError::Evaluation {
                    message: format!("no element #{id}"),
                })
        }

        /// Read a seeded checkbox state.
        pub async fn element_checked(&self, id: &str) -> EnsayoResult<bool> {
            self.state()
                .checks
                .get(id)
                .copied()
                .ok_or_else(|| EnsayoError::Evaluation {
                    message: format!("no element #{id}"),
                })
        }

        /// Succeed if scripted visible, otherwise time out immediately.
        pub async fn wait_for_visible(&self, id: &str, options: WaitOptions) -> EnsayoResult<()> {
            if self.state().visible.contains(id) {
                Ok(())
            } else {
                Err(EnsayoError::SelectorTimeout {
                    selector: format!("#{id}"),
                    ms: options.timeout_ms,
                })
            }
        }

        /// The scripted title.
        pub async fn title(&self) -> EnsayoResult<String> {
            Ok(self.state().title.clone())
        }

        /// The scripted DOM snapshot.
        pub async fn content(&self) -> EnsayoResult<String> {
            Ok(self.state().html.clone())
        }

        /// The scripted screenshot bytes.
        pub async fn screenshot(&self) -> EnsayoResult<Vec<u8>> {
            Ok(self.state().screenshot.clone())
        }

        /// A recorder the test feeds by hand.
        pub async fn record_network(&self) -> EnsayoResult<HarRecorder> {
            Ok(self.state().recorder.clone())
        }

        /// Record that collection started.
        pub async fn start_coverage(&self, _config: &CoverageConfig) -> EnsayoResult<()> {
            self.state().coverage_started = true;
            Ok(())
        }

        /// The scripted report, or an empty one if collection started.
        pub async fn take_coverage(&self) -> EnsayoResult<CoverageReport> {
            let state = self.state();
            if !state.coverage_started {
                return Err(EnsayoError::Coverage {
                    message: "coverage was never started".to_string(),
                });
            }
            Ok(state.coverage.clone().unwrap_or_default())
        }

        /// The scripted canvas box.
        pub async fn canvas_box(&self) -> EnsayoResult<BoundingBox> {
            self.state()
                .canvas
                .ok_or_else(|| EnsayoError::ElementNotFound {
                    name: "canvas".to_string(),
                })
        }

        /// Click an in-canvas control through the coordinate table.
        pub async fn click_element(
            &self,
            table: &CoordinateTable,
            name: &str,
        ) -> EnsayoResult<()> {
            let canvas = self.canvas_box().await?;
            let (x, y) = table.absolute(&canvas, name)?;
            self.click_at(x, y).await
        }

        /// Dispatch one action.
        pub async fn drive(&self, action: &Action, table: &CoordinateTable) -> EnsayoResult<()> {
            tracing::debug!(action = %action.describe(), "drive");
            match action {
                Action::CallHook { name, args } => self.call_hook(name, args).await,
                Action::ClickId { id } => self.click_id(id).await,
                Action::ClickAt { x, y } => self.click_at(*x, *y).await,
                Action::ClickElement { name } => self.click_element(table, name).await,
                Action::PressKey { key } => self.press_key(key).await,
                Action::SetRangeValue { id, value } => self.set_range_value(id, *value).await,
                Action::SetChecked { id, checked } => self.set_checked(id, *checked).await,
            }
        }

        /// Handle onto the console log buffer.
        #[must_use]
        pub fn logs(&self) -> LogBuffer {
            self.logs.clone()
        }

        /// Current URL as last navigated.
        #[must_use]
        pub fn current_url(&self) -> String {
            self.url.lock().expect("url lock").clone()
        }

        /// Whether the readiness flag is scripted true.
        #[must_use]
        pub fn is_ready(&self) -> bool {
            self.state().ready
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{Browser, Page};

#[cfg(not(feature = "browser"))]
pub use scripted::{Browser, Page};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_game_viewport() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!(
            (config.viewport_width, config.viewport_height),
            (1280, 720)
        );
        assert!(config.software_rendering);
    }

    #[test]
    fn software_rendering_flags() {
        let config = BrowserConfig::default();
        let args = config.chromium_args();
        assert!(args.contains(&"--enable-unsafe-swiftshader"));
        assert!(args.contains(&"--use-gl=swiftshader"));
        assert!(args.contains(&"--disable-gpu"));

        let hw = config.with_software_rendering(false);
        assert!(hw.chromium_args().is_empty());
    }

    #[test]
    fn builders_compose() {
        let config = BrowserConfig::default()
            .with_viewport(800, 600)
            .with_headless(false)
            .with_no_sandbox()
            .with_chromium_path("/usr/bin/chromium");
        assert_eq!(config.viewport_width, 800);
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
    }

    #[cfg(not(feature = "browser"))]
    mod scripted_page {
        use super::*;
        use crate::console::{ConsoleEntry, ConsoleLevel};
        use serde_json::json;

        #[tokio::test]
        async fn readiness_times_out_until_scripted() {
            let mut page = Page::new();
            let options = WaitOptions::new().with_timeout(250);
            let err = page
                .wait_ready("window.godotInitialized", options)
                .await
                .unwrap_err();
            match err {
                EnsayoError::ReadinessTimeout { signal, ms } => {
                    assert_eq!(signal, "window.godotInitialized");
                    assert_eq!(ms, 250);
                }
                other => panic!("expected ReadinessTimeout, got {other}"),
            }

            page.script_ready();
            assert!(page
                .wait_ready("window.godotInitialized", options)
                .await
                .is_ok());
        }

        #[tokio::test]
        async fn hook_calls_emit_queued_console_output() {
            let page = Page::new();
            let logs = page.attach_log_observer().await.expect("observer");
            page.script_hook_output(
                "changeMasterVolume",
                vec![ConsoleEntry::new(
                    ConsoleLevel::Log,
                    "Master volume changed to: 0.5",
                )],
            );

            let cp = logs.checkpoint();
            page.call_hook("changeMasterVolume", &[json!(0.5)])
                .await
                .expect("hook");

            let scoped = logs.since(cp);
            assert_eq!(scoped.len(), 1);
            assert_eq!(scoped[0].text, "Master volume changed to: 0.5");
            assert_eq!(page.hook_calls().len(), 1);

            // Queue is exhausted: a second call emits nothing.
            page.call_hook("changeMasterVolume", &[json!(0.2)])
                .await
                .expect("hook");
            assert_eq!(logs.since(cp).len(), 1);
        }

        #[tokio::test]
        async fn key_presses_emit_queued_console_output() {
            let page = Page::new();
            let logs = page.attach_log_observer().await.expect("observer");
            page.script_key_output(
                " ",
                vec![ConsoleEntry::new(
                    ConsoleLevel::Log,
                    "Firing with scaled cooldown: 0.3",
                )],
            );

            let cp = logs.checkpoint();
            page.press_key(" ").await.expect("press");

            let scoped = logs.since(cp);
            assert_eq!(scoped.len(), 1);
            assert_eq!(scoped[0].text, "Firing with scaled cooldown: 0.3");
            assert_eq!(page.driven_actions(), vec!["press  "]);

            // Queue is exhausted: a second press emits nothing.
            page.press_key(" ").await.expect("press");
            assert_eq!(logs.since(cp).len(), 1);
        }

        #[tokio::test]
        async fn hook_side_effects_move_overlay_inputs() {
            let page = Page::new();
            page.script_value("music-slider", "1");
            page.script_hook_value("changeMusicVolume", "music-slider", "0.4");

            page.call_hook("changeMusicVolume", &[json!(0.4)])
                .await
                .expect("hook");
            assert_eq!(page.element_value("music-slider").await.unwrap(), "0.4");

            // Effect queue is exhausted: the value stays put.
            page.call_hook("changeMusicVolume", &[json!(0.9)])
                .await
                .expect("hook");
            assert_eq!(page.element_value("music-slider").await.unwrap(), "0.4");
        }

        #[tokio::test]
        async fn drive_updates_overlay_state() {
            let page = Page::new();
            let table = CoordinateTable::skylock_menu();

            page.drive(
                &Action::SetRangeValue {
                    id: "sfx-slider".to_string(),
                    value: 0.8,
                },
                &table,
            )
            .await
            .expect("drive");
            assert_eq!(page.element_value("sfx-slider").await.unwrap(), "0.8");

            page.drive(
                &Action::SetChecked {
                    id: "mute-sfx".to_string(),
                    checked: false,
                },
                &table,
            )
            .await
            .expect("drive");
            assert!(!page.element_checked("mute-sfx").await.unwrap());
        }

        #[tokio::test]
        async fn canvas_click_goes_through_the_coordinate_table() {
            let page = Page::new();
            let table = CoordinateTable::skylock_menu();

            // No canvas scripted yet.
            let err = page.click_element(&table, "options_button").await.unwrap_err();
            assert!(matches!(err, EnsayoError::ElementNotFound { .. }));

            page.script_canvas(BoundingBox::new(0.0, 0.0, 1280.0, 720.0));
            page.click_element(&table, "options_button")
                .await
                .expect("click");
            assert_eq!(page.driven_actions(), vec!["click at (629, 357)"]);
        }

        #[tokio::test]
        async fn visibility_wait_reports_the_selector() {
            let page = Page::new();
            let options = WaitOptions::new().with_timeout(100);
            let err = page
                .wait_for_visible("master-slider", options)
                .await
                .unwrap_err();
            match err {
                EnsayoError::SelectorTimeout { selector, ms } => {
                    assert_eq!(selector, "#master-slider");
                    assert_eq!(ms, 100);
                }
                other => panic!("expected SelectorTimeout, got {other}"),
            }

            page.script_visible("master-slider");
            assert!(page.wait_for_visible("master-slider", options).await.is_ok());
        }

        #[tokio::test]
        async fn eval_stub_round_trip() {
            let page = Page::new();
            page.script_eval("document.title", json!("SkyLockAssault"));
            let title: String = page.evaluate("document.title").await.expect("stub");
            assert_eq!(title, "SkyLockAssault");
            assert!(page.evaluate::<bool>("window.missing").await.is_err());
        }
    }
}
