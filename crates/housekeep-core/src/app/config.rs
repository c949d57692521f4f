//! Config - capture / upload の設定
//!
//! すべての項目に default があるので、空の JSON `{}` でも有効。

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::ConfigError;

pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Upper bound on waiting for the native camera.
    pub timeout_ms: u64,

    /// Files above this size are rejected before upload.
    pub max_upload_bytes: usize,

    /// Surface host cancellations from the native camera as a notice.
    pub report_native_cancellation: bool,

    /// User agents containing this (case-insensitive) get the camera hint
    /// on the fallback picker.
    pub camera_hint_platform: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_CAPTURE_TIMEOUT_MS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            report_native_cancellation: false,
            camera_hint_platform: "android".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn prefers_camera(&self, user_agent: Option<&str>) -> bool {
        let needle = self.camera_hint_platform.to_ascii_lowercase();
        !needle.is_empty()
            && user_agent.is_some_and(|ua| ua.to_ascii_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub capture: CaptureConfig,
}

impl CoreConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.timeout_ms == 0 {
            return Err(ConfigError::Invalid("capture.timeout_ms must be > 0".into()));
        }
        if self.capture.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "capture.max_upload_bytes must be > 0".into(),
            ));
        }
        Ok(())
    }
}
