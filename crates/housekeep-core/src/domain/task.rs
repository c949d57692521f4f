//! Task record: metadata + ordered steps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::{ProfileId, StepId, TaskId};
use super::state::TaskStatus;
use super::step::Step;

/// Caller-provided fields of a new task (everything except identity and status).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub location: String,
    pub due_time: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub assignee: Option<ProfileId>,
}

/// A unit of work assigned to an employee.
///
/// Design:
/// - `completed_at` is `Some` exactly when `status == Completed`.
/// - Status changes go through `apply_status` so the invariant cannot drift.
/// - Steps are owned; deleting a task deletes its steps.
/// - Deserializing goes through `TaskRow`, so a stored row that breaks the
///   invariant is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskRow")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub location: String,
    pub due_time: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub assignee: Option<ProfileId>,
    pub created_at: DateTime<Utc>,
    status: TaskStatus,
    completed_at: Option<DateTime<Utc>>,
    pub steps: Vec<Step>,
}

/// A task as stored by the backend, before the status invariant is checked.
#[derive(Deserialize)]
struct TaskRow {
    id: TaskId,
    title: String,
    location: String,
    due_time: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    assignee: Option<ProfileId>,
    created_at: DateTime<Utc>,
    status: TaskStatus,
    completed_at: Option<DateTime<Utc>>,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task_id}: completed_at must be set exactly when status is completed (status={status})")]
pub struct InvalidTaskRow {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

impl TryFrom<TaskRow> for Task {
    type Error = InvalidTaskRow;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        if row.completed_at.is_some() != (row.status == TaskStatus::Completed) {
            return Err(InvalidTaskRow {
                task_id: row.id,
                status: row.status,
            });
        }
        Ok(Self {
            id: row.id,
            title: row.title,
            location: row.location,
            due_time: row.due_time,
            deadline: row.deadline,
            assignee: row.assignee,
            created_at: row.created_at,
            status: row.status,
            completed_at: row.completed_at,
            steps: row.steps,
        })
    }
}

impl Task {
    pub fn new(id: TaskId, draft: TaskDraft, created_at: DateTime<Utc>, steps: Vec<Step>) -> Self {
        Self {
            id,
            title: draft.title,
            location: draft.location,
            due_time: draft.due_time,
            deadline: draft.deadline,
            assignee: draft.assignee,
            created_at,
            status: TaskStatus::Pending,
            completed_at: None,
            steps,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Set the status, stamping `completed_at` on completion and clearing it otherwise.
    pub fn apply_status(&mut self, status: TaskStatus, at: DateTime<Utc>) {
        self.status = status;
        self.completed_at = match status {
            TaskStatus::Completed => Some(self.completed_at.unwrap_or(at)),
            _ => None,
        };
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    /// Required steps that still block completion, in step order.
    pub fn unsatisfied_required_steps(&self) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|s| !s.is_satisfied())
            .map(|s| s.id)
            .collect()
    }
}
