//! State - タスクの進捗状態

use serde::{Deserialize, Serialize};
use std::fmt;

/// TaskStatus はタスクの進捗を表現
///
/// # 状態遷移
/// - pending -> inprogress: 最初の step 操作（check / answer / comment / photo）
/// - inprogress -> pending: pending から来たタスクの操作がすべて取り消された
/// - any -> completed: 明示的な「完了」操作のみ（必須 step がすべて満たされていること）
///
/// completed から自動で戻る遷移はない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "inprogress")]
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Step mutations never move a task out of this state.
    pub fn is_locked(self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
