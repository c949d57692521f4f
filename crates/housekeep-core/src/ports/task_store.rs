//! TaskStore port - ホスト型 DB が実装する正本（source of truth）
//!
//! TaskStore は以下を管理します：
//! - タスクと step（step はタスク削除時にまとめて消える）
//! - テンプレート（TemplateStore）
//!
//! last-write-wins が前提で、クライアント間のロックはない。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ProfileId, Step, StoreError, Task, TaskId, TaskStatus, Template, TemplateId};

/// Persistence of tasks and their steps.
///
/// Every call may fail (network / backend). Callers must not assume the
/// write happened on `Err`, and must not retry automatically.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Fresh snapshot of a task with its ordered steps.
    async fn load_task(&self, task_id: TaskId) -> Result<Task, StoreError>;

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    /// Overwrite one step's mutable fields (value, comment, photo).
    async fn update_step(&self, task_id: TaskId, step: &Step) -> Result<(), StoreError>;

    /// `completed_at` must be `Some` exactly when `status` is `Completed`.
    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Delete a task together with its steps.
    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError>;

    async fn tasks_for_assignee(&self, assignee: ProfileId) -> Result<Vec<Task>, StoreError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn load_template(&self, template_id: TemplateId) -> Result<Template, StoreError>;

    async fn save_template(&self, template: &Template) -> Result<(), StoreError>;
}
