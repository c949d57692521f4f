//! MediaStore port - 写真・動画のオブジェクトストレージ

use async_trait::async_trait;

use crate::domain::{CapturedFile, MediaRef, StoreError};

/// Hosted object storage for photos and videos.
///
/// Size checks happen before this is called (`UploadPipeline`).
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, file: &CapturedFile) -> Result<MediaRef, StoreError>;
}
