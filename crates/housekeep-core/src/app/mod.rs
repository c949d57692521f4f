//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder / App**: 構築とワイヤリング
//! - **TaskProgress**: step 操作とタスク状態の遷移
//! - **CaptureBridge**: ネイティブカメラの request/response 対応付け
//! - **MediaCapture / UploadPipeline**: 取得 → サイズ検査 → upload

pub mod builder;
pub mod capture_bridge;
pub mod config;
pub mod media;
pub mod progress;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::capture_bridge::CaptureBridge;
pub use self::config::{CaptureConfig, CoreConfig};
pub use self::media::{MediaCapture, UploadPipeline};
pub use self::progress::TaskProgress;
