//! housekeep-core
//!
//! Core of the housekeeping checklist app: task progress and native camera capture.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, step, task, template, progress, media, errors, events）
//! - **ports**: 抽象化レイヤー（TaskStore, MediaStore, CaptureHost, FilePicker, Notifier, など）
//! - **app**: アプリケーションロジック（TaskProgress, CaptureBridge, MediaCapture, AppBuilder）
//! - **impls**: 実装（InMemoryTaskStore, TracingDiagnostics, ScriptedHost など開発用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
