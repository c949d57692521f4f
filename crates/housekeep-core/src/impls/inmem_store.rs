//! InMemoryTaskStore - 開発・テスト用の正本
//!
//! # 学習ポイント
//! - tokio::sync::Mutex で状態を 1 か所に集約
//! - 失敗注入（fail_next_*）で「バックエンドが失敗した」経路をテストする

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{ProfileId, Step, StoreError, Task, TaskId, TaskStatus, Template, TemplateId};
use crate::ports::{TaskStore, TemplateStore};

#[derive(Default)]
struct StoreState {
    tasks: HashMap<TaskId, Task>,
    templates: HashMap<TemplateId, Template>,
    fail_next_status_update: bool,
    fail_next_step_update: bool,
    status_update_calls: usize,
    step_update_calls: usize,
}

/// InMemoryTaskStore は TaskStore + TemplateStore の開発用実装
///
/// ```ignore
/// let store = InMemoryTaskStore::new();
/// store.insert_task(&task).await?;
/// store.fail_next_status_update().await;
/// ```
#[derive(Default)]
pub struct InMemoryTaskStore {
    state: Mutex<StoreState>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `update_task_status` call fails with a backend error.
    pub async fn fail_next_status_update(&self) {
        self.state.lock().await.fail_next_status_update = true;
    }

    /// The next `update_step` call fails with a backend error.
    pub async fn fail_next_step_update(&self) {
        self.state.lock().await.fail_next_step_update = true;
    }

    /// Number of `update_task_status` calls that reached the store (failed ones included).
    pub async fn status_update_calls(&self) -> usize {
        self.state.lock().await.status_update_calls
    }

    pub async fn step_update_calls(&self) -> usize {
        self.state.lock().await.step_update_calls
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load_task(&self, task_id: TaskId) -> Result<Task, StoreError> {
        let state = self.state.lock().await;
        state
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(StoreError::TaskNotFound(task_id))
    }

    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.tasks.contains_key(&task.id) {
            return Err(StoreError::Backend(format!("duplicate task id {}", task.id)));
        }
        state.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn update_step(&self, task_id: TaskId, step: &Step) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.step_update_calls += 1;
        if std::mem::take(&mut state.fail_next_step_update) {
            return Err(StoreError::Backend("injected step update failure".into()));
        }
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(StoreError::TaskNotFound(task_id))?;
        let stored = task.step_mut(step.id).ok_or(StoreError::StepNotFound {
            task_id,
            step_id: step.id,
        })?;
        stored.value = step.value;
        stored.comment = step.comment.clone();
        stored.photo_url = step.photo_url.clone();
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.status_update_calls += 1;
        if std::mem::take(&mut state.fail_next_status_update) {
            return Err(StoreError::Backend("injected status update failure".into()));
        }
        if completed_at.is_some() != (status == TaskStatus::Completed) {
            return Err(StoreError::Backend(format!(
                "completed_at must be set exactly for completed tasks (status={status})"
            )));
        }
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(StoreError::TaskNotFound(task_id))?;
        let at = completed_at.unwrap_or(task.created_at);
        task.apply_status(status, at);
        Ok(())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .tasks
            .remove(&task_id)
            .map(|_| ())
            .ok_or(StoreError::TaskNotFound(task_id))
    }

    async fn tasks_for_assignee(&self, assignee: ProfileId) -> Result<Vec<Task>, StoreError> {
        let state = self.state.lock().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.assignee == Some(assignee))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| (t.created_at, t.id));
        Ok(tasks)
    }
}

#[async_trait]
impl TemplateStore for InMemoryTaskStore {
    async fn load_template(&self, template_id: TemplateId) -> Result<Template, StoreError> {
        let state = self.state.lock().await;
        state
            .templates
            .get(&template_id)
            .cloned()
            .ok_or(StoreError::TemplateNotFound(template_id))
    }

    async fn save_template(&self, template: &Template) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.templates.insert(template.id, template.clone());
        Ok(())
    }
}
