//! Errors - エラー型と分類
//!
//! 関心ごとに 1 つの enum:
//! - StoreError: バックエンド（DB / storage）呼び出しの失敗
//! - ProgressError: step 操作・完了操作の失敗
//! - CaptureError: カメラ取得の失敗（timeout / host error / empty / decode）
//! - UploadError: upload 前チェックと upload の失敗
//! - HostError / PickerError: host bridge と file picker の失敗
//! - ConfigError: 設定の読み込み・検証

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::ids::{StepId, TaskId, TemplateId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("step {step_id} not found in {task_id}")]
    StepNotFound { task_id: TaskId, step_id: StepId },

    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("backend rejected the request: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("step {step_id} not found in {task_id}")]
    StepNotFound { task_id: TaskId, step_id: StepId },

    #[error("{change} does not apply to {step_id}")]
    KindMismatch {
        step_id: StepId,
        change: &'static str,
    },

    #[error("{task_id} has {} unsatisfied required step(s)", unsatisfied.len())]
    Incomplete {
        task_id: TaskId,
        unsatisfied: Vec<StepId>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("host entry point is not available: {0}")]
    Unavailable(&'static str),

    #[error("host call failed: {0}")]
    Call(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickerError {
    #[error("file picker failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera did not respond within {after:?} (request {request_id})")]
    Timeout { request_id: u64, after: Duration },

    #[error("camera error {code}: {message}")]
    Host { code: String, message: String },

    /// The host reported a cancellation-shaped error.
    #[error("camera cancelled ({code}): {message}")]
    Cancelled { code: String, message: String },

    #[error("captured file is empty")]
    EmptyCapture,

    #[error("could not decode captured image: {0}")]
    Decode(String),

    #[error(transparent)]
    Picker(#[from] PickerError),
}

impl CaptureError {
    /// Error codes / messages hosts use for "the user closed the camera".
    pub fn from_host(code: &str, message: &str) -> Self {
        let code_lc = code.to_ascii_lowercase();
        let cancelled = matches!(
            code_lc.as_str(),
            "cancelled" | "canceled" | "user_cancelled" | "user_canceled"
        ) || message.to_ascii_lowercase().contains("cancel");
        if cancelled {
            CaptureError::Cancelled {
                code: code.to_string(),
                message: message.to_string(),
            }
        } else {
            CaptureError::Host {
                code: code.to_string(),
                message: message.to_string(),
            }
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, CaptureError::Cancelled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("file is too large ({size} bytes, limit {limit} bytes)")]
    Oversized { size: usize, limit: usize },

    #[error("file is empty")]
    Empty,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
