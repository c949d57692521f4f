//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 必須の port（TaskStore, TemplateStore, MediaStore, FilePicker）が
//!   欠けていたら build() が BuildError を返す
//! - 設定値も build() 時に検証する
//! - 任意の port には開発向けの default がある

use std::sync::Arc;

use tracing::warn;

use super::capture_bridge::CaptureBridge;
use super::config::CoreConfig;
use super::media::{MediaCapture, UploadPipeline};
use super::progress::TaskProgress;
use crate::domain::{ConfigError, MediaKind, ProgressError, StepId, TaskId, TaskStatus};
use crate::impls::{TracingDiagnostics, TracingNotifier};
use crate::ports::{
    CaptureHost, Clock, DiagnosticSink, FilePicker, IdGenerator, MediaStore, NoNativeHost,
    Notice, Notifier, SystemClock, TaskStore, TemplateStore, UlidGenerator,
};

/// ```ignore
/// let store = Arc::new(InMemoryTaskStore::new());
/// let app = AppBuilder::new()
///     .store(store)
///     .media_store(Arc::new(InMemoryMediaStore::new()))
///     .picker(picker)
///     .capture_host(host)
///     .build()?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    tasks: Option<Arc<dyn TaskStore>>,
    templates: Option<Arc<dyn TemplateStore>>,
    media_store: Option<Arc<dyn MediaStore>>,
    picker: Option<Arc<dyn FilePicker>>,
    host: Option<Arc<dyn CaptureHost>>,
    notifier: Option<Arc<dyn Notifier>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    config: CoreConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing ports: {0:?}. These must be provided before build().")]
    MissingPorts(Vec<&'static str>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// One backend serving both tasks and templates.
    pub fn store<S>(mut self, store: Arc<S>) -> Self
    where
        S: TaskStore + TemplateStore + 'static,
    {
        let tasks: Arc<dyn TaskStore> = store.clone();
        let templates: Arc<dyn TemplateStore> = store;
        self.tasks = Some(tasks);
        self.templates = Some(templates);
        self
    }

    pub fn task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.tasks = Some(store);
        self
    }

    pub fn template_store(mut self, store: Arc<dyn TemplateStore>) -> Self {
        self.templates = Some(store);
        self
    }

    pub fn media_store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.media_store = Some(store);
        self
    }

    pub fn picker(mut self, picker: Arc<dyn FilePicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    /// Defaults to a host without native capture.
    pub fn capture_host(mut self, host: Arc<dyn CaptureHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let mut missing = Vec::new();
        if self.tasks.is_none() {
            missing.push("TaskStore");
        }
        if self.templates.is_none() {
            missing.push("TemplateStore");
        }
        if self.media_store.is_none() {
            missing.push("MediaStore");
        }
        if self.picker.is_none() {
            missing.push("FilePicker");
        }
        let (Some(tasks), Some(templates), Some(media_store), Some(picker)) =
            (self.tasks, self.templates, self.media_store, self.picker)
        else {
            return Err(BuildError::MissingPorts(missing));
        };
        self.config.validate()?;

        let host: Arc<dyn CaptureHost> = match self.host {
            Some(host) => host,
            None => Arc::new(NoNativeHost),
        };
        let notifier: Arc<dyn Notifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(TracingNotifier),
        };
        let diagnostics: Arc<dyn DiagnosticSink> = match self.diagnostics {
            Some(diagnostics) => diagnostics,
            None => Arc::new(TracingDiagnostics::new()),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(SystemClock)),
        };

        let capture = &self.config.capture;
        let bridge = Arc::new(CaptureBridge::new(
            host.clone(),
            diagnostics.clone(),
            capture.timeout(),
        ));
        let media = MediaCapture::new(
            bridge,
            host,
            picker,
            UploadPipeline::new(media_store, capture.max_upload_bytes),
            notifier.clone(),
            diagnostics.clone(),
            capture.clone(),
        );
        let progress = TaskProgress::new(tasks, templates, ids, clock, diagnostics);

        Ok(App {
            progress,
            media,
            notifier,
            config: self.config,
        })
    }
}

/// Wired application core.
pub struct App {
    progress: TaskProgress,
    media: MediaCapture,
    notifier: Arc<dyn Notifier>,
    config: CoreConfig,
}

impl App {
    pub fn progress(&self) -> &TaskProgress {
        &self.progress
    }

    pub fn media(&self) -> &MediaCapture {
        &self.media
    }

    /// The bridge whose `on_capture_*` callbacks the host calls.
    pub fn bridge(&self) -> &Arc<CaptureBridge> {
        self.media.bridge()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Take a photo for a step, upload it and attach it.
    ///
    /// `Ok(None)` when no photo was obtained (already notified or cancelled).
    /// A failure to save the step is notified and returned.
    pub async fn capture_step_photo(
        &self,
        task_id: TaskId,
        step_id: StepId,
    ) -> Result<Option<TaskStatus>, ProgressError> {
        let Some(media) = self.media.acquire_and_upload(MediaKind::Photo).await else {
            return Ok(None);
        };
        match self.progress.attach_photo(task_id, step_id, media.url).await {
            Ok(status) => Ok(Some(status)),
            Err(err) => {
                warn!(task_id = %task_id, step_id = %step_id, error = %err, "attaching photo failed");
                self.notifier
                    .notify(Notice::error(format!("The photo could not be saved: {err}")));
                Err(err)
            }
        }
    }
}
