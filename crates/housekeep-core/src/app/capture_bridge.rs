//! CaptureBridge - WebView host のネイティブカメラを async な 1 回の呼び出しにする
//!
//! # プロトコル
//! 1. request id（単調増加の u64）を採番し、pending table に oneshot を登録
//! 2. host の `takePhoto(id)` → 失敗したら `openCamera()` を試す
//! 3. host は後から `on_capture_success` / `on_capture_error` を呼ぶ
//! 4. timeout（既定 30 秒）までに結果が来なければ entry を消して Timeout
//!
//! 結果の id が pending に無いときは「最新の pending」に届ける
//! （id を正しく返せない host 向け）。ただし一度発行して既に終わった id は
//! 無視する（timeout 後に遅れて届いた結果など）。
//!
//! # ロック
//! pending table は std::sync::Mutex。await や host 呼び出しを跨いで持たない
//! （host が trigger の中から同期的に callback しても deadlock しない）。

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::domain::{CaptureError, CapturedFile};
use crate::ports::{CaptureHost, DiagnosticSink};

const LOG_CATEGORY: &str = "capture";
const DEFAULT_FILE_NAME: &str = "photo.jpg";
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

type Delivery = Result<CapturedFile, CaptureError>;

/// How an incoming host result is matched to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// The id is pending.
    Keyed(u64),
    /// The id was issued and has already been resolved or timed out.
    Finished(u64),
    /// No usable id: fall back to the most recent pending request.
    Unkeyed,
}

/// Request id -> waiting capture call.
///
/// Removing an entry is the only way to resolve a request, so each request
/// resolves at most once.
#[derive(Default)]
struct PendingRequests {
    inner: Mutex<BTreeMap<u64, oneshot::Sender<Delivery>>>,
}

impl PendingRequests {
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, oneshot::Sender<Delivery>>> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn insert(&self, id: u64, tx: oneshot::Sender<Delivery>) {
        self.lock().insert(id, tx);
    }

    fn remove(&self, id: u64) -> Option<oneshot::Sender<Delivery>> {
        self.lock().remove(&id)
    }

    /// Senders whose caller stopped waiting are dropped, never returned.
    fn take(&self, route: Route) -> Option<(u64, oneshot::Sender<Delivery>)> {
        let mut map = self.lock();
        match route {
            Route::Keyed(id) => map.remove(&id).filter(|tx| !tx.is_closed()).map(|tx| (id, tx)),
            Route::Finished(_) => None,
            Route::Unkeyed => {
                while let Some((id, tx)) = map.pop_last() {
                    if !tx.is_closed() {
                        return Some((id, tx));
                    }
                }
                None
            }
        }
    }

    fn ids(&self) -> Vec<u64> {
        self.lock().keys().copied().collect()
    }
}

/// Removes the request's entry when `capture()` returns or its future is dropped.
struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    request_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(self.request_id);
    }
}

pub struct CaptureBridge {
    host: Arc<dyn CaptureHost>,
    diagnostics: Arc<dyn DiagnosticSink>,
    timeout: Duration,
    next_id: AtomicU64,
    pending: PendingRequests,
}

impl CaptureBridge {
    pub fn new(
        host: Arc<dyn CaptureHost>,
        diagnostics: Arc<dyn DiagnosticSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            host,
            diagnostics,
            timeout,
            next_id: AtomicU64::new(1),
            pending: PendingRequests::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ids of requests still waiting for the host, oldest first.
    pub fn pending_ids(&self) -> Vec<u64> {
        self.pending.ids()
    }

    /// Either native entry point is present right now.
    pub fn is_available(&self) -> bool {
        self.host.has_native_capture() || self.host.has_native_open_camera()
    }

    fn log(&self, message: &str) {
        self.diagnostics.log(LOG_CATEGORY, message);
    }

    /// Take a photo with the host camera.
    ///
    /// - `Ok(None)`: no native capability, or the host refused both entry
    ///   points. The caller should fall back to the file picker.
    /// - `Err(Timeout)`: the host did not answer in time.
    /// - `Err(..)`: the host reported an error, or the payload was empty / undecodable.
    pub async fn capture(&self) -> Result<Option<CapturedFile>, CaptureError> {
        let keyed = self.host.has_native_capture();
        let unkeyed = self.host.has_native_open_camera();
        if !keyed && !unkeyed {
            self.log("native capture unavailable");
            return Ok(None);
        }

        let request_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, mut rx) = oneshot::channel();
        self.pending.insert(request_id, tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            request_id,
        };
        self.log(&format!("request {request_id}: started"));

        if !self.trigger(request_id, keyed, unkeyed) {
            self.log(&format!("request {request_id}: no host entry point accepted"));
            return Ok(None);
        }

        let delivery = match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(Ok(delivery)) => delivery,
            // sender dropped without a result; only happens if the table was torn down
            Ok(Err(_)) => return Ok(None),
            Err(_) => {
                if self.pending.remove(request_id).is_some() {
                    warn!(request_id, timeout = ?self.timeout, "native capture timed out");
                    self.log(&format!("request {request_id}: timed out"));
                    return Err(CaptureError::Timeout {
                        request_id,
                        after: self.timeout,
                    });
                }
                // resolved right at the deadline
                match rx.try_recv() {
                    Ok(delivery) => delivery,
                    Err(_) => return Ok(None),
                }
            }
        };

        match &delivery {
            Ok(file) => {
                info!(request_id, name = %file.name, bytes = file.len(), "native capture succeeded");
                self.log(&format!("request {request_id}: received {} bytes", file.len()));
            }
            Err(err) => {
                warn!(request_id, error = %err, "native capture failed");
                self.log(&format!("request {request_id}: failed: {err}"));
            }
        }
        delivery.map(Some)
    }

    /// Try `takePhoto(id)`, then `openCamera()`. True when one was accepted.
    fn trigger(&self, request_id: u64, keyed: bool, unkeyed: bool) -> bool {
        if keyed {
            match self.host.trigger_native_capture(&request_id.to_string()) {
                Ok(true) => return true,
                Ok(false) => self.log(&format!("request {request_id}: takePhoto declined")),
                Err(err) => self.log(&format!("request {request_id}: takePhoto failed: {err}")),
            }
        }
        if unkeyed {
            match self.host.trigger_native_open_camera() {
                Ok(true) => return true,
                Ok(false) => self.log(&format!("request {request_id}: openCamera declined")),
                Err(err) => self.log(&format!("request {request_id}: openCamera failed: {err}")),
            }
        }
        false
    }

    fn route(&self, request_id: &str) -> Route {
        let Ok(id) = request_id.trim().parse::<u64>() else {
            return Route::Unkeyed;
        };
        if self.pending.lock().contains_key(&id) {
            Route::Keyed(id)
        } else if id > 0 && id < self.next_id.load(Ordering::SeqCst) {
            Route::Finished(id)
        } else {
            Route::Unkeyed
        }
    }

    fn resolve(&self, request_id: &str, delivery: Delivery) -> bool {
        let route = self.route(request_id);
        let Some((id, tx)) = self.pending.take(route) else {
            debug!(request_id, ?route, "host result with no pending request");
            self.log(&format!("stray result for {request_id:?} ignored"));
            return false;
        };
        if route == Route::Unkeyed {
            self.log(&format!("result for {request_id:?} matched to latest request {id}"));
        }
        if tx.send(delivery).is_err() {
            // the caller went away between take() and send()
            warn!(request_id = id, "capture caller stopped waiting; result dropped");
            self.log(&format!("request {id}: caller gone, result dropped"));
            return false;
        }
        true
    }

    /// Host callback: a photo was taken.
    ///
    /// `payload` is base64, optionally as a `data:` URL. Returns whether a
    /// pending request was resolved.
    pub fn on_capture_success(
        &self,
        request_id: &str,
        payload: &str,
        file_name: &str,
        mime_type: &str,
    ) -> bool {
        self.resolve(request_id, decode_payload(payload, file_name, mime_type))
    }

    /// Host callback: capture failed or was cancelled.
    pub fn on_capture_error(&self, request_id: &str, code: &str, message: &str) -> bool {
        self.resolve(request_id, Err(CaptureError::from_host(code, message)))
    }
}

/// Decode a host payload into a file. Empty results are an error.
pub fn decode_payload(
    payload: &str,
    file_name: &str,
    mime_type: &str,
) -> Result<CapturedFile, CaptureError> {
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| CaptureError::Decode("data URL without ','".into()))?,
        None => payload,
    };
    // Android の Base64.DEFAULT は 76 文字ごとに改行を入れる
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| CaptureError::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(CaptureError::EmptyCapture);
    }
    let name = if file_name.is_empty() {
        DEFAULT_FILE_NAME
    } else {
        file_name
    };
    let mime = if mime_type.is_empty() {
        DEFAULT_MIME_TYPE
    } else {
        mime_type
    };
    Ok(CapturedFile::new(name, mime, bytes))
}
