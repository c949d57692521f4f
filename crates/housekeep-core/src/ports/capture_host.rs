//! CaptureHost port - WebView shell が提供するネイティブカメラ
//!
//! 結果は戻り値ではなく、host が後から
//! `CaptureBridge::on_capture_success` / `on_capture_error` を呼んで届ける。

use crate::domain::HostError;

/// Native capture capability exposed by the embedding shell.
///
/// Capability checks are pure and cheap; they are asked on every capture
/// because the shell may enable or disable them at runtime.
pub trait CaptureHost: Send + Sync {
    /// The keyed entry point (`takePhoto(requestId)`) is present.
    fn has_native_capture(&self) -> bool;

    /// The unkeyed entry point (`openCamera()`) is present.
    fn has_native_open_camera(&self) -> bool;

    /// Ask the shell to take a photo for `request_id`.
    ///
    /// `Ok(false)`: the shell declined. `Err`: the call threw.
    fn trigger_native_capture(&self, request_id: &str) -> Result<bool, HostError>;

    /// Ask the shell to open its camera. The result carries no request id.
    fn trigger_native_open_camera(&self) -> Result<bool, HostError>;

    /// User agent of the embedding browser, if known.
    fn user_agent(&self) -> Option<String> {
        None
    }
}

/// Host without any native capability (plain browser).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNativeHost;

impl CaptureHost for NoNativeHost {
    fn has_native_capture(&self) -> bool {
        false
    }

    fn has_native_open_camera(&self) -> bool {
        false
    }

    fn trigger_native_capture(&self, _request_id: &str) -> Result<bool, HostError> {
        Err(HostError::Unavailable("takePhoto"))
    }

    fn trigger_native_open_camera(&self) -> Result<bool, HostError> {
        Err(HostError::Unavailable("openCamera"))
    }
}
