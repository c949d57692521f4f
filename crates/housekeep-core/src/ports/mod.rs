//! Ports - 抽象化レイヤー
//!
//! 外部の協調者（ホスト型 DB / storage、WebView shell、ファイル選択、
//! 通知、診断ログ）へのインターフェースを trait として定義します。
//! app 層はこれらにだけ依存し、実体は impls かアプリ側が差し込む。

pub mod capture_host;
pub mod clock;
pub mod diagnostics;
pub mod file_picker;
pub mod id_generator;
pub mod media_store;
pub mod notifier;
pub mod task_store;

pub use self::capture_host::{CaptureHost, NoNativeHost};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::diagnostics::{DiagnosticSink, HostDebugChannel, NoopDiagnostics};
pub use self::file_picker::{FilePicker, PickRequest};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::media_store::MediaStore;
pub use self::notifier::{Notice, Notifier, Severity};
pub use self::task_store::{TaskStore, TemplateStore};
