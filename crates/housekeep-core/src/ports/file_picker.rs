//! FilePicker port - プラットフォーム標準のファイル選択ダイアログ

use async_trait::async_trait;

use crate::domain::{CapturedFile, MediaKind, PickerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickRequest {
    pub kind: MediaKind,
    /// Hint the dialog to open the device camera (`capture` attribute).
    pub prefer_camera: bool,
}

impl PickRequest {
    pub fn accept(&self) -> &'static str {
        self.kind.accept()
    }
}

/// Resolves with the chosen file, or `None` when the user dismissed the dialog.
#[async_trait]
pub trait FilePicker: Send + Sync {
    async fn pick(&self, request: PickRequest) -> Result<Option<CapturedFile>, PickerError>;
}
