//! Domain model (ids, status, steps, tasks, templates, media, errors, events).
//!
//! ここは純粋なデータと純粋関数だけ。I/O は ports 経由で app 層が行う。

pub mod errors;
pub mod events;
pub mod ids;
pub mod media;
pub mod progress;
pub mod state;
pub mod step;
pub mod task;
pub mod template;

pub use self::errors::{
    CaptureError, ConfigError, HostError, PickerError, ProgressError, StoreError, UploadError,
};
pub use self::events::DomainEvent;
pub use self::ids::{ProfileId, StepId, TaskId, TemplateId};
pub use self::media::{CaptureSource, CapturedFile, MediaKind, MediaRef};
pub use self::progress::{StatusMemo, StepChange, Transition, check_completion, next_status};
pub use self::state::TaskStatus;
pub use self::step::{Answer, Step, StepKind, StepValue};
pub use self::task::{InvalidTaskRow, Task, TaskDraft};
pub use self::template::{Template, TemplateStep};
