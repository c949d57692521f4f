//! MediaCapture / UploadPipeline - 写真・動画の取得から upload まで
//!
//! エラーはここで Notice に変換して Notifier に流す（呼び出し元には
//! `None` が返るだけ）。キャンセルは原則サイレント。

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::capture_bridge::CaptureBridge;
use super::config::CaptureConfig;
use crate::domain::{CaptureError, CaptureSource, CapturedFile, MediaKind, MediaRef, UploadError};
use crate::ports::{CaptureHost, DiagnosticSink, FilePicker, MediaStore, Notice, Notifier, PickRequest};

const LOG_CATEGORY: &str = "media";

/// Checks a file against the upload limits, then hands it to storage.
pub struct UploadPipeline {
    store: Arc<dyn MediaStore>,
    max_bytes: usize,
}

impl UploadPipeline {
    pub fn new(store: Arc<dyn MediaStore>, max_bytes: usize) -> Self {
        Self { store, max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Oversized and empty files are rejected before any upload call.
    pub async fn upload(&self, file: &CapturedFile) -> Result<MediaRef, UploadError> {
        if file.is_empty() {
            return Err(UploadError::Empty);
        }
        if file.len() > self.max_bytes {
            return Err(UploadError::Oversized {
                size: file.len(),
                limit: self.max_bytes,
            });
        }
        let media = self.store.upload(file).await?;
        info!(name = %file.name, bytes = file.len(), url = %media.url, "media uploaded");
        Ok(media)
    }
}

/// User-facing notice for a capture failure; `None` means stay silent.
pub fn capture_notice(err: &CaptureError, report_cancellation: bool) -> Option<Notice> {
    let notice = match err {
        CaptureError::Timeout { .. } => {
            Notice::error("The camera did not respond. Please try again.")
        }
        CaptureError::Host { code, message } => {
            let detail = if message.is_empty() { code } else { message };
            Notice::error(format!("Camera error: {detail}"))
        }
        CaptureError::Cancelled { .. } if report_cancellation => {
            Notice::warning("Photo capture was cancelled.")
        }
        CaptureError::Cancelled { .. } => return None,
        CaptureError::EmptyCapture => {
            Notice::error("The captured file is empty. Please try again.")
        }
        CaptureError::Decode(_) => Notice::error("The captured photo could not be read."),
        CaptureError::Picker(_) => Notice::error("The file picker could not be opened."),
    };
    Some(notice)
}

pub fn upload_notice(err: &UploadError) -> Notice {
    match err {
        UploadError::Oversized { size, limit } => Notice::error(format!(
            "The file is too large ({:.1} MB). The maximum is {:.0} MB.",
            *size as f64 / (1024.0 * 1024.0),
            *limit as f64 / (1024.0 * 1024.0),
        )),
        UploadError::Empty => Notice::error("The captured file is empty. Please try again."),
        UploadError::Store(e) => Notice::error(format!("Upload failed: {e}")),
    }
}

/// One entry point for "give me a photo / video": native camera first
/// (photos only), then the platform file picker.
pub struct MediaCapture {
    bridge: Arc<CaptureBridge>,
    host: Arc<dyn CaptureHost>,
    picker: Arc<dyn FilePicker>,
    uploads: UploadPipeline,
    notifier: Arc<dyn Notifier>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: CaptureConfig,
}

impl MediaCapture {
    pub fn new(
        bridge: Arc<CaptureBridge>,
        host: Arc<dyn CaptureHost>,
        picker: Arc<dyn FilePicker>,
        uploads: UploadPipeline,
        notifier: Arc<dyn Notifier>,
        diagnostics: Arc<dyn DiagnosticSink>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            bridge,
            host,
            picker,
            uploads,
            notifier,
            diagnostics,
            config,
        }
    }

    pub fn bridge(&self) -> &Arc<CaptureBridge> {
        &self.bridge
    }

    fn report_capture(&self, err: &CaptureError, source: CaptureSource) {
        self.diagnostics
            .log(LOG_CATEGORY, &format!("{source} capture failed: {err}"));
        match capture_notice(err, self.config.report_native_cancellation) {
            Some(notice) => self.notifier.notify(notice),
            None => debug!(%source, error = %err, "capture cancelled silently"),
        }
    }

    /// Get a file from the user. Failures are notified; `None` means
    /// nothing to upload.
    pub async fn acquire(&self, kind: MediaKind) -> Option<CapturedFile> {
        self.diagnostics
            .log(LOG_CATEGORY, &format!("acquire {kind:?}"));

        if kind == MediaKind::Photo && self.bridge.is_available() {
            match self.bridge.capture().await {
                Ok(Some(file)) => return Some(file),
                Ok(None) => {
                    debug!("native capture gave no result; using file picker");
                }
                Err(err) => {
                    self.report_capture(&err, CaptureSource::Native);
                    return None;
                }
            }
        }

        let request = PickRequest {
            kind,
            prefer_camera: self
                .config
                .prefers_camera(self.host.user_agent().as_deref()),
        };
        match self.picker.pick(request).await {
            Ok(Some(file)) if file.is_empty() => {
                self.report_capture(&CaptureError::EmptyCapture, CaptureSource::Picker);
                None
            }
            Ok(Some(file)) => {
                self.diagnostics.log(
                    LOG_CATEGORY,
                    &format!("picker returned {} ({} bytes)", file.name, file.len()),
                );
                Some(file)
            }
            Ok(None) => {
                self.diagnostics.log(LOG_CATEGORY, "picker dismissed");
                None
            }
            Err(err) => {
                self.report_capture(&CaptureError::from(err), CaptureSource::Picker);
                None
            }
        }
    }

    /// Check + upload an already acquired file, notifying on failure.
    pub async fn upload(&self, file: &CapturedFile) -> Option<MediaRef> {
        match self.uploads.upload(file).await {
            Ok(media) => Some(media),
            Err(err) => {
                warn!(name = %file.name, error = %err, "upload rejected");
                self.diagnostics
                    .log(LOG_CATEGORY, &format!("upload of {} failed: {err}", file.name));
                self.notifier.notify(upload_notice(&err));
                None
            }
        }
    }

    pub async fn acquire_and_upload(&self, kind: MediaKind) -> Option<MediaRef> {
        let file = self.acquire(kind).await?;
        self.upload(&file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PickerError;
    use crate::impls::{CollectingNotifier, HostCall, InMemoryMediaStore, ScriptedHost, ScriptedPicker};
    use crate::ports::{NoopDiagnostics, Severity};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use std::time::Duration;

    const MB: usize = 1024 * 1024;

    struct Fixture {
        host: Arc<ScriptedHost>,
        picker: Arc<ScriptedPicker>,
        media: Arc<InMemoryMediaStore>,
        notifier: Arc<CollectingNotifier>,
        capture: MediaCapture,
    }

    fn fixture(host: ScriptedHost, config: CaptureConfig) -> Fixture {
        let host = Arc::new(host);
        let picker = Arc::new(ScriptedPicker::new());
        let media = Arc::new(InMemoryMediaStore::new());
        let notifier = Arc::new(CollectingNotifier::new());
        let bridge = Arc::new(CaptureBridge::new(
            host.clone(),
            Arc::new(NoopDiagnostics),
            config.timeout(),
        ));
        let capture = MediaCapture::new(
            bridge,
            host.clone(),
            picker.clone(),
            UploadPipeline::new(media.clone(), config.max_upload_bytes),
            notifier.clone(),
            Arc::new(NoopDiagnostics),
            config,
        );
        Fixture {
            host,
            picker,
            media,
            notifier,
            capture,
        }
    }

    fn jpeg(len: usize) -> CapturedFile {
        CapturedFile::new("photo.jpg", "image/jpeg", vec![0xd8; len])
    }

    #[tokio::test]
    async fn eleven_mb_is_rejected_before_upload() {
        let f = fixture(ScriptedHost::without_native(), CaptureConfig::default());

        assert_eq!(f.capture.upload(&jpeg(11 * MB)).await, None);
        assert_eq!(f.media.upload_count().await, 0);
        let notices = f.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
        assert!(notices[0].message.contains("too large"));

        let media = f.capture.upload(&jpeg(9 * MB)).await.unwrap();
        assert_eq!(media.size, 9 * MB);
        assert_eq!(f.media.upload_count().await, 1);
    }

    #[tokio::test]
    async fn exactly_at_limit_is_allowed() {
        let f = fixture(ScriptedHost::without_native(), CaptureConfig::default());
        assert!(f.capture.upload(&jpeg(10 * MB)).await.is_some());
    }

    #[tokio::test]
    async fn picker_cancel_is_silent() {
        let f = fixture(ScriptedHost::without_native(), CaptureConfig::default());

        assert_eq!(f.capture.acquire(MediaKind::Photo).await, None);
        assert!(f.notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn picker_empty_file_is_reported() {
        let f = fixture(ScriptedHost::without_native(), CaptureConfig::default());
        f.picker.push_file(jpeg(0));

        assert_eq!(f.capture.acquire(MediaKind::Photo).await, None);
        let notices = f.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("empty"));
    }

    #[tokio::test]
    async fn picker_error_is_reported() {
        let f = fixture(ScriptedHost::without_native(), CaptureConfig::default());
        f.picker
            .push_outcome(Err(PickerError::Failed("activity not found".into())));

        assert_eq!(f.capture.acquire(MediaKind::Photo).await, None);
        assert_eq!(f.notifier.notices().len(), 1);
    }

    #[tokio::test]
    async fn android_user_agent_hints_camera() {
        let host = ScriptedHost::without_native()
            .with_user_agent("Mozilla/5.0 (Linux; Android 13; SM-A536B; wv)");
        let f = fixture(host, CaptureConfig::default());
        f.picker.push_file(jpeg(10));

        assert!(f.capture.acquire(MediaKind::Video).await.is_some());
        let requests = f.picker.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].accept(), "video/*");
        assert!(requests[0].prefer_camera);
    }

    #[tokio::test]
    async fn video_never_uses_native_camera() {
        let f = fixture(ScriptedHost::new(), CaptureConfig::default());
        f.picker.push_file(jpeg(10));

        assert!(f.capture.acquire(MediaKind::Video).await.is_some());
        assert!(f.host.calls().is_empty());
    }

    #[tokio::test]
    async fn declined_native_falls_back_to_picker() {
        let host = ScriptedHost::new();
        host.set_capture_outcome(Ok(false));
        host.set_open_camera_outcome(Ok(false));
        let f = fixture(host, CaptureConfig::default());
        f.picker.push_file(jpeg(5));

        let file = f.capture.acquire(MediaKind::Photo).await.unwrap();
        assert_eq!(file.len(), 5);
        assert_eq!(f.host.calls().len(), 2);
        assert_eq!(f.picker.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn native_timeout_is_reported_without_fallback() {
        let config = CaptureConfig {
            timeout_ms: 1_000,
            ..Default::default()
        };
        let f = fixture(ScriptedHost::new(), config);

        assert_eq!(f.capture.acquire(MediaKind::Photo).await, None);
        let notices = f.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("did not respond"));
        assert!(f.picker.requests().is_empty());
        assert_eq!(f.capture.bridge().timeout(), Duration::from_secs(1));
    }

    async fn native_cancel(report: bool) -> Vec<Notice> {
        let config = CaptureConfig {
            report_native_cancellation: report,
            ..Default::default()
        };
        let f = fixture(ScriptedHost::new(), config);
        let capture = Arc::new(f.capture);
        let task = {
            let capture = capture.clone();
            tokio::spawn(async move { capture.acquire(MediaKind::Photo).await })
        };
        while capture.bridge().pending_ids().is_empty() {
            tokio::task::yield_now().await;
        }
        capture.bridge().on_capture_error("1", "USER_CANCELLED", "closed");
        assert_eq!(task.await.unwrap(), None);
        f.notifier.notices()
    }

    #[tokio::test(start_paused = true)]
    async fn native_cancel_is_silent_by_default() {
        assert!(native_cancel(false).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn native_cancel_can_be_reported() {
        let notices = native_cancel(true).await;
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn native_photo_is_uploaded() {
        let f = fixture(ScriptedHost::new(), CaptureConfig::default());
        let capture = Arc::new(f.capture);
        let task = {
            let capture = capture.clone();
            tokio::spawn(async move { capture.acquire_and_upload(MediaKind::Photo).await })
        };
        while capture.bridge().pending_ids().is_empty() {
            tokio::task::yield_now().await;
        }
        capture.bridge().on_capture_success(
            "1",
            &STANDARD.encode([1u8, 2, 3, 4]),
            "native.jpg",
            "image/jpeg",
        );

        let media = task.await.unwrap().unwrap();
        assert_eq!(media.size, 4);
        assert!(media.url.ends_with("native.jpg"));
        assert_eq!(f.host.calls(), vec![HostCall::TakePhoto("1".into())]);
    }
}
