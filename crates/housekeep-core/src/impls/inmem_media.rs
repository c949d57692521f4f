//! InMemoryMediaStore - 開発用のオブジェクトストレージ

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{CapturedFile, MediaRef, StoreError};
use crate::ports::MediaStore;

/// Keeps uploaded files in memory and hands out `mem://` URLs.
#[derive(Default)]
pub struct InMemoryMediaStore {
    uploads: Mutex<Vec<CapturedFile>>,
    seq: AtomicU64,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn uploads(&self) -> Vec<CapturedFile> {
        self.uploads.lock().await.clone()
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(&self, file: &CapturedFile) -> Result<MediaRef, StoreError> {
        let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        self.uploads.lock().await.push(file.clone());
        Ok(MediaRef {
            url: format!("mem://media/{n}/{}", file.name),
            size: file.len(),
        })
    }
}
