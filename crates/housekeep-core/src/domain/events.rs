//! Events - ドメインイベント
//!
//! 状態遷移と step 更新を診断ログ（`DiagnosticSink`）へ流すための型。

use serde::Serialize;

use super::ids::{StepId, TaskId};
use super::state::TaskStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    StepUpdated { task_id: TaskId, step_id: StepId },
    TaskStarted { task_id: TaskId },
    TaskReverted { task_id: TaskId },
    TaskCompleted { task_id: TaskId },
}

impl DomainEvent {
    /// The event for a persisted status change.
    pub fn for_status(task_id: TaskId, from: TaskStatus, to: TaskStatus) -> Option<Self> {
        match (from, to) {
            (TaskStatus::Pending, TaskStatus::InProgress) => Some(DomainEvent::TaskStarted { task_id }),
            (TaskStatus::InProgress, TaskStatus::Pending) => Some(DomainEvent::TaskReverted { task_id }),
            (f, TaskStatus::Completed) if f != TaskStatus::Completed => {
                Some(DomainEvent::TaskCompleted { task_id })
            }
            _ => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            DomainEvent::StepUpdated { .. } => "step",
            _ => "task",
        }
    }

    /// One-line JSON for the log sink.
    pub fn to_log_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    #[test]
    fn status_events() {
        let id = TaskId::from_ulid(Ulid::new());
        assert_eq!(
            DomainEvent::for_status(id, TaskStatus::Pending, TaskStatus::InProgress),
            Some(DomainEvent::TaskStarted { task_id: id })
        );
        assert_eq!(
            DomainEvent::for_status(id, TaskStatus::InProgress, TaskStatus::Completed),
            Some(DomainEvent::TaskCompleted { task_id: id })
        );
        assert_eq!(
            DomainEvent::for_status(id, TaskStatus::Completed, TaskStatus::Completed),
            None
        );
    }

    #[test]
    fn log_line_is_tagged_json() {
        let id = TaskId::from_ulid(Ulid::new());
        let line = DomainEvent::TaskReverted { task_id: id }.to_log_line();
        assert!(line.contains("\"event\":\"task_reverted\""));
        assert!(line.contains(&id.as_ulid().to_string()));
    }
}
