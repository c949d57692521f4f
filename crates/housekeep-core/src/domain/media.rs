//! Captured media (photos / videos) handed from the capture paths to upload.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// `accept` filter for the file picker.
    pub fn accept(self) -> &'static str {
        match self {
            MediaKind::Photo => "image/*",
            MediaKind::Video => "video/*",
        }
    }
}

/// Where a file came from. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Native,
    Picker,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Native => f.write_str("native"),
            CaptureSource::Picker => f.write_str("picker"),
        }
    }
}

/// A binary file-like object produced by a capture path.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl CapturedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// bytes を Debug に出すとログが埋まるので長さだけ
impl fmt::Debug for CapturedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Reference to an uploaded object in media storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub size: usize,
}
