//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: タスク・テンプレートの開発用正本
//! - **InMemoryMediaStore**: 写真・動画の開発用ストレージ
//! - **TracingDiagnostics**: tracing + host debug channel への診断ログ
//! - **TracingNotifier / CollectingNotifier**: ユーザー通知
//! - **ScriptedHost / ScriptedPicker**: 実 WebView なしで capture を動かす
//!
//! # 本番用実装
//! ホスト型バックエンドと WebView bridge の実装はアプリ側が差し込む。

pub mod inmem_media;
pub mod inmem_store;
pub mod notifiers;
pub mod scripted;
pub mod tracing_sink;

pub use self::inmem_media::InMemoryMediaStore;
pub use self::inmem_store::InMemoryTaskStore;
pub use self::notifiers::{CollectingNotifier, TracingNotifier};
pub use self::scripted::{HostCall, ScriptedHost, ScriptedPicker};
pub use self::tracing_sink::TracingDiagnostics;
