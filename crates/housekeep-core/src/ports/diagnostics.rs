//! DiagnosticSink port - フィールドデバッグ用のベストエフォートログ
//!
//! WebView host ごとに挙動が違うので、capture の試行・成功・失敗は
//! すべてここに流す。sink 側の失敗は呼び出し元に伝えない。

use crate::domain::HostError;

/// Best-effort log sink. Implementations must never panic or block.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, category: &str, message: &str);
}

/// Debug log channel offered by some shells (e.g. `Android.debugLog`).
pub trait HostDebugChannel: Send + Sync {
    fn debug_log(&self, line: &str) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl DiagnosticSink for NoopDiagnostics {
    fn log(&self, _category: &str, _message: &str) {}
}
