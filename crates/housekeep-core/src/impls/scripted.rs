//! ScriptedHost / ScriptedPicker - 実 WebView なしで capture を動かすための port 実装
//!
//! CLI のデモとテストで使う。host の結果は別タスクから
//! `CaptureBridge::on_capture_*` を呼んで届ける想定。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::domain::{CapturedFile, HostError, PickerError};
use crate::ports::{CaptureHost, FilePicker, PickRequest};

/// One trigger call observed by `ScriptedHost`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    TakePhoto(String),
    OpenCamera,
}

/// A `CaptureHost` whose capabilities and trigger outcomes are set up front.
pub struct ScriptedHost {
    native_capture: AtomicBool,
    native_open_camera: AtomicBool,
    capture_outcome: Mutex<Result<bool, HostError>>,
    open_camera_outcome: Mutex<Result<bool, HostError>>,
    user_agent: Option<String>,
    calls: Mutex<Vec<HostCall>>,
}

impl ScriptedHost {
    /// Both entry points present and accepting.
    pub fn new() -> Self {
        Self {
            native_capture: AtomicBool::new(true),
            native_open_camera: AtomicBool::new(true),
            capture_outcome: Mutex::new(Ok(true)),
            open_camera_outcome: Mutex::new(Ok(true)),
            user_agent: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Neither entry point present.
    pub fn without_native() -> Self {
        let host = Self::new();
        host.set_capabilities(false, false);
        host
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Capabilities may change while the app runs.
    pub fn set_capabilities(&self, capture: bool, open_camera: bool) {
        self.native_capture.store(capture, Ordering::SeqCst);
        self.native_open_camera.store(open_camera, Ordering::SeqCst);
    }

    pub fn set_capture_outcome(&self, outcome: Result<bool, HostError>) {
        *self.capture_outcome.lock().unwrap_or_else(|p| p.into_inner()) = outcome;
    }

    pub fn set_open_camera_outcome(&self, outcome: Result<bool, HostError>) {
        *self.open_camera_outcome.lock().unwrap_or_else(|p| p.into_inner()) = outcome;
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push(call);
    }
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureHost for ScriptedHost {
    fn has_native_capture(&self) -> bool {
        self.native_capture.load(Ordering::SeqCst)
    }

    fn has_native_open_camera(&self) -> bool {
        self.native_open_camera.load(Ordering::SeqCst)
    }

    fn trigger_native_capture(&self, request_id: &str) -> Result<bool, HostError> {
        self.record(HostCall::TakePhoto(request_id.to_string()));
        self.capture_outcome
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn trigger_native_open_camera(&self) -> Result<bool, HostError> {
        self.record(HostCall::OpenCamera);
        self.open_camera_outcome
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }
}

/// A `FilePicker` that returns queued outcomes in order; dismissed when empty.
#[derive(Default)]
pub struct ScriptedPicker {
    outcomes: Mutex<VecDeque<Result<Option<CapturedFile>, PickerError>>>,
    requests: Mutex<Vec<PickRequest>>,
}

impl ScriptedPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_outcome(&self, outcome: Result<Option<CapturedFile>, PickerError>) {
        self.outcomes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(outcome);
    }

    pub fn push_file(&self, file: CapturedFile) {
        self.push_outcome(Ok(Some(file)));
    }

    pub fn requests(&self) -> Vec<PickRequest> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl FilePicker for ScriptedPicker {
    async fn pick(&self, request: PickRequest) -> Result<Option<CapturedFile>, PickerError> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request);
        self.outcomes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or(Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaKind;

    #[test]
    fn host_records_calls_and_returns_outcome() {
        let host = ScriptedHost::new();
        host.set_capture_outcome(Err(HostError::Call("boom".into())));

        assert!(host.trigger_native_capture("7").is_err());
        assert_eq!(host.trigger_native_open_camera(), Ok(true));
        assert_eq!(
            host.calls(),
            vec![HostCall::TakePhoto("7".into()), HostCall::OpenCamera]
        );
    }

    #[tokio::test]
    async fn picker_defaults_to_dismissed() {
        let picker = ScriptedPicker::new();
        let request = PickRequest {
            kind: MediaKind::Photo,
            prefer_camera: false,
        };
        assert_eq!(picker.pick(request).await, Ok(None));
        assert_eq!(picker.requests(), vec![request]);
    }
}
