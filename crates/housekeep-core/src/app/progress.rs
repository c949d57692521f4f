//! TaskProgress - step 操作を永続化し、タスク状態を進める
//!
//! # フロー（1 回の step 操作）
//! 1. TaskStore::load_task() で最新のタスクを読む（古い status で判断しない）
//! 2. StepChange を step に適用して TaskStore::update_step()
//! 3. domain::next_status() で次の状態を計算
//! 4. 変わったときだけ TaskStore::update_task_status()
//! 5. すべて成功したら memo を確定
//!
//! どこかで失敗したら ProgressError を返し、memo は触らない。自動リトライはしない。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{
    Answer, DomainEvent, ProgressError, StatusMemo, StepChange, StepId, Task, TaskDraft, TaskId,
    TaskStatus, TemplateId, check_completion, next_status,
};
use crate::ports::{Clock, DiagnosticSink, IdGenerator, TaskStore, TemplateStore};

pub struct TaskProgress {
    store: Arc<dyn TaskStore>,
    templates: Arc<dyn TemplateStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    diagnostics: Arc<dyn DiagnosticSink>,
    /// Only tasks this instance saw as in progress have an entry. A change
    /// that loads any other status drops the entry.
    memos: Mutex<HashMap<TaskId, StatusMemo>>,
}

impl TaskProgress {
    pub fn new(
        store: Arc<dyn TaskStore>,
        templates: Arc<dyn TemplateStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            store,
            templates,
            ids,
            clock,
            diagnostics,
            memos: Mutex::new(HashMap::new()),
        }
    }

    /// Current memo of a task (default when never started in this process).
    pub fn memo(&self, task_id: TaskId) -> StatusMemo {
        self.memos
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&task_id)
            .copied()
            .unwrap_or_default()
    }

    fn commit_memo(&self, task_id: TaskId, memo: StatusMemo) {
        let mut memos = self.memos.lock().unwrap_or_else(|p| p.into_inner());
        if memo == StatusMemo::default() {
            memos.remove(&task_id);
        } else {
            memos.insert(task_id, memo);
        }
    }

    fn emit(&self, event: DomainEvent) {
        self.diagnostics.log(event.category(), &event.to_log_line());
    }

    /// Apply one step mutation and advance the task status.
    ///
    /// Returns the task status after the mutation.
    pub async fn apply_change(
        &self,
        task_id: TaskId,
        step_id: StepId,
        change: StepChange,
    ) -> Result<TaskStatus, ProgressError> {
        let mut task = self.store.load_task(task_id).await?;
        let current = task.status();

        let step = task
            .step_mut(step_id)
            .ok_or(ProgressError::StepNotFound { task_id, step_id })?;
        change
            .apply(step)
            .map_err(|_| ProgressError::KindMismatch {
                step_id,
                change: change.name(),
            })?;
        let updated = step.clone();

        self.store.update_step(task_id, &updated).await?;
        debug!(task_id = %task_id, step_id = %step_id, change = change.name(), "step updated");
        self.emit(DomainEvent::StepUpdated { task_id, step_id });

        // a memo only means something while the stored task is in progress
        let memo = match current {
            TaskStatus::InProgress => self.memo(task_id),
            _ => StatusMemo::default(),
        };
        let transition = next_status(current, memo, &task.steps, &change);
        if transition.changed {
            if let Err(err) = self
                .store
                .update_task_status(task_id, transition.status, None)
                .await
            {
                warn!(task_id = %task_id, to = %transition.status, error = %err, "status update failed");
                return Err(err.into());
            }
            info!(task_id = %task_id, from = %current, to = %transition.status, "task status changed");
            if let Some(event) = DomainEvent::for_status(task_id, current, transition.status) {
                self.emit(event);
            }
        }
        self.commit_memo(task_id, transition.memo);
        Ok(transition.status)
    }

    pub async fn set_checkbox(
        &self,
        task_id: TaskId,
        step_id: StepId,
        checked: bool,
    ) -> Result<TaskStatus, ProgressError> {
        let change = if checked {
            StepChange::Check
        } else {
            StepChange::Uncheck
        };
        self.apply_change(task_id, step_id, change).await
    }

    pub async fn answer(
        &self,
        task_id: TaskId,
        step_id: StepId,
        answer: Answer,
    ) -> Result<TaskStatus, ProgressError> {
        self.apply_change(task_id, step_id, StepChange::Answer(answer))
            .await
    }

    /// Saving a blank comment clears it.
    pub async fn save_comment(
        &self,
        task_id: TaskId,
        step_id: StepId,
        text: impl Into<String>,
    ) -> Result<TaskStatus, ProgressError> {
        self.apply_change(task_id, step_id, StepChange::SaveComment(text.into()))
            .await
    }

    pub async fn clear_comment(
        &self,
        task_id: TaskId,
        step_id: StepId,
    ) -> Result<TaskStatus, ProgressError> {
        self.apply_change(task_id, step_id, StepChange::ClearComment)
            .await
    }

    pub async fn attach_photo(
        &self,
        task_id: TaskId,
        step_id: StepId,
        url: impl Into<String>,
    ) -> Result<TaskStatus, ProgressError> {
        self.apply_change(task_id, step_id, StepChange::AttachPhoto(url.into()))
            .await
    }

    pub async fn remove_photo(
        &self,
        task_id: TaskId,
        step_id: StepId,
    ) -> Result<TaskStatus, ProgressError> {
        self.apply_change(task_id, step_id, StepChange::RemovePhoto)
            .await
    }

    /// Explicit "mark complete".
    ///
    /// Fails with `Incomplete` (without touching the store) while a required
    /// step is unsatisfied. Returns the completion time.
    pub async fn mark_complete(&self, task_id: TaskId) -> Result<DateTime<Utc>, ProgressError> {
        let task = self.store.load_task(task_id).await?;
        if let Some(at) = task.completed_at() {
            return Ok(at);
        }
        check_completion(&task.steps)
            .map_err(|unsatisfied| ProgressError::Incomplete { task_id, unsatisfied })?;

        let now = self.clock.now();
        self.store
            .update_task_status(task_id, TaskStatus::Completed, Some(now))
            .await?;
        info!(task_id = %task_id, from = %task.status(), "task completed");
        if let Some(event) = DomainEvent::for_status(task_id, task.status(), TaskStatus::Completed) {
            self.emit(event);
        }
        self.commit_memo(task_id, StatusMemo::default());
        Ok(now)
    }

    /// Copy a template into a new pending task and persist it.
    pub async fn create_from_template(
        &self,
        template_id: TemplateId,
        draft: TaskDraft,
    ) -> Result<Task, ProgressError> {
        let template = self.templates.load_template(template_id).await?;
        let task = template.instantiate(self.ids.as_ref(), self.clock.as_ref(), draft);
        self.store.insert_task(&task).await?;
        info!(task_id = %task.id, template_id = %template_id, steps = task.steps.len(), "task created from template");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StepKind, StepValue, StoreError, Template, TemplateStep};
    use crate::impls::InMemoryTaskStore;
    use crate::ports::{FixedClock, NoopDiagnostics, UlidGenerator};
    use chrono::TimeZone;

    struct Fixture {
        store: Arc<InMemoryTaskStore>,
        clock: FixedClock,
        progress: TaskProgress,
        task: Task,
    }

    impl Fixture {
        fn step(&self, i: usize) -> StepId {
            self.task.steps[i].id
        }

        async fn status(&self) -> TaskStatus {
            self.store.load_task(self.task.id).await.unwrap().status()
        }
    }

    /// Task with: [0] checkbox, [1] yes/no, [2] optional checkbox.
    async fn fixture() -> Fixture {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 4, 2, 8, 0, 0).unwrap());
        let store = Arc::new(InMemoryTaskStore::new());
        let ids = Arc::new(UlidGenerator::new(clock.clone()));
        let progress = TaskProgress::new(
            store.clone(),
            store.clone(),
            ids.clone(),
            Arc::new(clock.clone()),
            Arc::new(NoopDiagnostics),
        );

        let template = Template {
            id: ids.generate_template_id(),
            title: "Suite turnover".into(),
            description: None,
            location: Some("5F".into()),
            department: None,
            steps: vec![
                TemplateStep {
                    title: "Change sheets".into(),
                    kind: StepKind::Checkbox,
                    optional: false,
                    requires_photo: false,
                    position: 0,
                },
                TemplateStep {
                    title: "Safe locked?".into(),
                    kind: StepKind::YesNo,
                    optional: false,
                    requires_photo: false,
                    position: 1,
                },
                TemplateStep {
                    title: "Fold towels into swans".into(),
                    kind: StepKind::Checkbox,
                    optional: true,
                    requires_photo: true,
                    position: 2,
                },
            ],
        };
        store.save_template(&template).await.unwrap();
        let task = progress
            .create_from_template(template.id, TaskDraft::default())
            .await
            .unwrap();

        Fixture {
            store,
            clock,
            progress,
            task,
        }
    }

    #[tokio::test]
    async fn created_task_is_persisted_pending() {
        let f = fixture().await;
        let loaded = f.store.load_task(f.task.id).await.unwrap();
        assert_eq!(loaded, f.task);
        assert_eq!(loaded.status(), TaskStatus::Pending);
        assert_eq!(loaded.location, "5F");
    }

    #[tokio::test]
    async fn check_then_uncheck_round_trips() {
        let f = fixture().await;
        let id = f.task.id;

        let s = f.progress.set_checkbox(id, f.step(0), true).await.unwrap();
        assert_eq!(s, TaskStatus::InProgress);
        assert_eq!(f.status().await, TaskStatus::InProgress);
        assert!(f.progress.memo(id).came_from_pending);

        // a second interaction does not persist another transition
        f.progress.set_checkbox(id, f.step(2), true).await.unwrap();
        f.progress.set_checkbox(id, f.step(2), false).await.unwrap();
        assert_eq!(f.store.status_update_calls().await, 1);

        let s = f.progress.set_checkbox(id, f.step(0), false).await.unwrap();
        assert_eq!(s, TaskStatus::Pending);
        assert_eq!(f.status().await, TaskStatus::Pending);
        assert_eq!(f.store.status_update_calls().await, 2);
        assert_eq!(f.progress.memo(id), StatusMemo::default());
    }

    #[tokio::test]
    async fn comment_rollback_blocked_by_photo_elsewhere() {
        let f = fixture().await;
        let id = f.task.id;

        f.progress.save_comment(id, f.step(0), "mold behind sink").await.unwrap();
        f.progress.attach_photo(id, f.step(1), "https://cdn/sink.jpg").await.unwrap();

        let s = f.progress.clear_comment(id, f.step(0)).await.unwrap();
        assert_eq!(s, TaskStatus::InProgress);

        let s = f.progress.remove_photo(id, f.step(1)).await.unwrap();
        assert_eq!(s, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn blank_comment_clears_and_rolls_back() {
        let f = fixture().await;
        let id = f.task.id;

        f.progress.save_comment(id, f.step(0), "x").await.unwrap();
        let s = f.progress.save_comment(id, f.step(0), "  ").await.unwrap();
        assert_eq!(s, TaskStatus::Pending);
        let loaded = f.store.load_task(id).await.unwrap();
        assert_eq!(loaded.steps[0].comment, None);
    }

    #[tokio::test]
    async fn answering_no_starts_task() {
        let f = fixture().await;
        let s = f.progress.answer(f.task.id, f.step(1), Answer::No).await.unwrap();
        assert_eq!(s, TaskStatus::InProgress);
        let loaded = f.store.load_task(f.task.id).await.unwrap();
        assert_eq!(loaded.steps[1].value, StepValue::YesNo(Answer::No));
    }

    #[tokio::test]
    async fn clearing_the_only_answer_rolls_back() {
        let f = fixture().await;
        let id = f.task.id;

        let s = f.progress.answer(id, f.step(1), Answer::No).await.unwrap();
        assert_eq!(s, TaskStatus::InProgress);

        let s = f.progress.answer(id, f.step(1), Answer::Unanswered).await.unwrap();
        assert_eq!(s, TaskStatus::Pending);
        assert_eq!(f.status().await, TaskStatus::Pending);
        assert_eq!(f.progress.memo(id), StatusMemo::default());
    }

    #[tokio::test]
    async fn answered_no_does_not_hold_progress() {
        let f = fixture().await;
        let id = f.task.id;

        f.progress.answer(id, f.step(1), Answer::No).await.unwrap();
        f.progress.set_checkbox(id, f.step(0), true).await.unwrap();
        let s = f.progress.set_checkbox(id, f.step(0), false).await.unwrap();

        assert_eq!(s, TaskStatus::Pending);
        let loaded = f.store.load_task(id).await.unwrap();
        assert_eq!(loaded.status(), TaskStatus::Pending);
        assert_eq!(loaded.steps[1].value, StepValue::YesNo(Answer::No));
    }

    #[tokio::test]
    async fn memo_is_dropped_once_task_leaves_in_progress_elsewhere() {
        let f = fixture().await;
        let id = f.task.id;
        f.progress.set_checkbox(id, f.step(0), true).await.unwrap();
        f.progress.answer(id, f.step(1), Answer::Yes).await.unwrap();
        assert!(f.progress.memo(id).came_from_pending);

        // another device completed the task
        let at = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        f.store
            .update_task_status(id, TaskStatus::Completed, Some(at))
            .await
            .unwrap();

        let s = f.progress.set_checkbox(id, f.step(2), true).await.unwrap();
        assert_eq!(s, TaskStatus::Completed);
        assert_eq!(f.progress.memo(id), StatusMemo::default());
    }

    #[tokio::test]
    async fn stale_memo_does_not_survive_remote_rollback() {
        let f = fixture().await;
        let id = f.task.id;
        f.progress.set_checkbox(id, f.step(0), true).await.unwrap();

        // another device put the task back to pending
        f.store
            .update_task_status(id, TaskStatus::Pending, None)
            .await
            .unwrap();
        f.progress.set_checkbox(id, f.step(2), false).await.unwrap();
        assert_eq!(f.progress.memo(id), StatusMemo::default());
    }

    #[tokio::test]
    async fn mark_complete_requires_required_steps() {
        let f = fixture().await;
        let id = f.task.id;
        f.progress.set_checkbox(id, f.step(0), true).await.unwrap();
        let calls_before = f.store.status_update_calls().await;

        let err = f.progress.mark_complete(id).await.unwrap_err();
        assert_eq!(
            err,
            ProgressError::Incomplete {
                task_id: id,
                unsatisfied: vec![f.step(1)],
            }
        );
        assert_eq!(f.store.status_update_calls().await, calls_before);

        // optional step [2] stays unchecked
        f.progress.answer(id, f.step(1), Answer::No).await.unwrap();
        let later = Utc.with_ymd_and_hms(2026, 4, 2, 9, 30, 0).unwrap();
        f.clock.set(later);
        let at = f.progress.mark_complete(id).await.unwrap();
        assert_eq!(at, later);

        let loaded = f.store.load_task(id).await.unwrap();
        assert_eq!(loaded.status(), TaskStatus::Completed);
        assert_eq!(loaded.completed_at(), Some(later));
    }

    #[tokio::test]
    async fn completed_task_never_moves_on_step_changes() {
        let f = fixture().await;
        let id = f.task.id;
        f.progress.set_checkbox(id, f.step(0), true).await.unwrap();
        f.progress.answer(id, f.step(1), Answer::Yes).await.unwrap();
        f.progress.mark_complete(id).await.unwrap();
        let calls = f.store.status_update_calls().await;

        let s = f.progress.set_checkbox(id, f.step(0), false).await.unwrap();
        assert_eq!(s, TaskStatus::Completed);
        f.progress.answer(id, f.step(1), Answer::Unanswered).await.unwrap();

        assert_eq!(f.status().await, TaskStatus::Completed);
        assert_eq!(f.store.status_update_calls().await, calls);
        assert!(f.store.load_task(id).await.unwrap().completed_at().is_some());
    }

    #[tokio::test]
    async fn failed_status_update_is_surfaced_and_not_committed() {
        let f = fixture().await;
        let id = f.task.id;
        f.store.fail_next_status_update().await;

        let err = f.progress.set_checkbox(id, f.step(0), true).await.unwrap_err();
        assert!(matches!(err, ProgressError::Store(StoreError::Backend(_))));
        assert_eq!(f.status().await, TaskStatus::Pending);
        assert_eq!(f.progress.memo(id), StatusMemo::default());

        // manual retry
        let s = f.progress.set_checkbox(id, f.step(0), true).await.unwrap();
        assert_eq!(s, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn failed_step_update_skips_status() {
        let f = fixture().await;
        f.store.fail_next_step_update().await;

        assert!(f.progress.set_checkbox(f.task.id, f.step(0), true).await.is_err());
        assert_eq!(f.store.status_update_calls().await, 0);
        assert_eq!(f.status().await, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn reads_fresh_status_before_deciding() {
        let f = fixture().await;
        let id = f.task.id;
        // another device started the task
        f.store
            .update_task_status(id, TaskStatus::InProgress, None)
            .await
            .unwrap();

        f.progress.set_checkbox(id, f.step(0), true).await.unwrap();
        assert_eq!(f.store.status_update_calls().await, 1);

        // this client never saw pending, so unchecking does not roll back
        let s = f.progress.set_checkbox(id, f.step(0), false).await.unwrap();
        assert_eq!(s, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn kind_mismatch_and_unknown_step() {
        let f = fixture().await;
        let id = f.task.id;

        let err = f.progress.set_checkbox(id, f.step(1), true).await.unwrap_err();
        assert!(matches!(err, ProgressError::KindMismatch { change: "check", .. }));

        let stranger = f.task.steps[0].id;
        let other = fixture().await;
        let err = other.progress.remove_photo(other.task.id, stranger).await.unwrap_err();
        assert!(matches!(err, ProgressError::StepNotFound { .. }));
        assert_eq!(other.store.step_update_calls().await, 0);
    }
}
