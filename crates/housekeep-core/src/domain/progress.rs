//! Progress - step 操作からタスク状態を導く純粋関数
//!
//! UI の event handler に埋め込まれがちな遷移ロジックをここに集約します。
//! 永続化は呼び出し側（`app::progress::TaskProgress`）の責務で、
//! この module は I/O を一切しません。

use serde::{Deserialize, Serialize};

use super::ids::StepId;
use super::state::TaskStatus;
use super::step::{Answer, Step, StepValue};

/// A single mutation of one step, as issued by the employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "arg", rename_all = "snake_case")]
pub enum StepChange {
    Check,
    Uncheck,
    Answer(Answer),
    SaveComment(String),
    ClearComment,
    AttachPhoto(String),
    RemovePhoto,
}

/// The change does not fit the step's kind (e.g. `Check` on a yes/no step).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindMismatch;

impl StepChange {
    pub fn name(&self) -> &'static str {
        match self {
            StepChange::Check => "check",
            StepChange::Uncheck => "uncheck",
            StepChange::Answer(_) => "answer",
            StepChange::SaveComment(_) => "save_comment",
            StepChange::ClearComment => "clear_comment",
            StepChange::AttachPhoto(_) => "attach_photo",
            StepChange::RemovePhoto => "remove_photo",
        }
    }

    /// Adds an interaction: may start a pending task.
    pub fn is_additive(&self) -> bool {
        match self {
            StepChange::Check => true,
            StepChange::Answer(answer) => answer.is_answered(),
            StepChange::SaveComment(text) | StepChange::AttachPhoto(text) => {
                !text.trim().is_empty()
            }
            StepChange::Uncheck | StepChange::ClearComment | StepChange::RemovePhoto => false,
        }
    }

    /// Removes an interaction: triggers the rollback check.
    pub fn is_removal(&self) -> bool {
        !self.is_additive()
    }

    /// Apply the change to a step in place.
    pub fn apply(&self, step: &mut Step) -> Result<(), KindMismatch> {
        match (self, &mut step.value) {
            (StepChange::Check, StepValue::Checkbox(v)) => *v = true,
            (StepChange::Uncheck, StepValue::Checkbox(v)) => *v = false,
            (StepChange::Answer(answer), StepValue::YesNo(v)) => *v = *answer,
            (StepChange::Check | StepChange::Uncheck, StepValue::YesNo(_))
            | (StepChange::Answer(_), StepValue::Checkbox(_)) => return Err(KindMismatch),
            (StepChange::SaveComment(text), _) => {
                let text = text.trim();
                step.comment = (!text.is_empty()).then(|| text.to_string());
            }
            (StepChange::ClearComment, _) => step.comment = None,
            (StepChange::AttachPhoto(url), _) => {
                step.photo_url = (!url.trim().is_empty()).then(|| url.clone());
            }
            (StepChange::RemovePhoto, _) => step.photo_url = None,
        }
        Ok(())
    }
}

/// What the state machine remembers between mutations of one task.
///
/// `came_from_pending` is recorded at the pending -> inprogress transition;
/// only such tasks may roll back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusMemo {
    pub came_from_pending: bool,
}

/// Result of `next_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: TaskStatus,
    pub memo: StatusMemo,
    /// `status` differs from the current one; the caller must persist it.
    pub changed: bool,
}

impl Transition {
    fn stay(status: TaskStatus, memo: StatusMemo) -> Self {
        Self {
            status,
            memo,
            changed: false,
        }
    }
}

/// Decide the task status after `change` has been applied to `steps`.
///
/// - completed never moves.
/// - an additive change on a pending task starts it and records the memo.
/// - a removal on an in-progress task that came from pending rolls it back
///   once no step has an interaction left.
pub fn next_status(
    current: TaskStatus,
    memo: StatusMemo,
    steps: &[Step],
    change: &StepChange,
) -> Transition {
    match current {
        TaskStatus::Completed => Transition::stay(current, memo),
        TaskStatus::Pending if change.is_additive() => Transition {
            status: TaskStatus::InProgress,
            memo: StatusMemo {
                came_from_pending: true,
            },
            changed: true,
        },
        TaskStatus::InProgress
            if change.is_removal()
                && memo.came_from_pending
                && !steps.iter().any(Step::has_interaction) =>
        {
            Transition {
                status: TaskStatus::Pending,
                memo: StatusMemo::default(),
                changed: true,
            }
        }
        _ => Transition::stay(current, memo),
    }
}

/// Precondition of "mark complete": every required step is satisfied.
///
/// On failure returns the blocking step ids in step order.
pub fn check_completion(steps: &[Step]) -> Result<(), Vec<StepId>> {
    let blocking: Vec<StepId> = steps
        .iter()
        .filter(|s| !s.is_satisfied())
        .map(|s| s.id)
        .collect();
    if blocking.is_empty() {
        Ok(())
    } else {
        Err(blocking)
    }
}
