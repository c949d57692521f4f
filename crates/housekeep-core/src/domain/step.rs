//! Step: one checklist item within a task.

use serde::{Deserialize, Serialize};

use super::ids::StepId;

/// How the employee interacts with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Checkbox,
    YesNo,
}

/// Answer of a yes/no step.
///
/// `Unanswered` is its own state: it is never the same thing as `No`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    #[default]
    Unanswered,
}

impl Answer {
    pub fn is_answered(self) -> bool {
        !matches!(self, Answer::Unanswered)
    }
}

/// The backend stores the answer as a nullable boolean.
impl From<Option<bool>> for Answer {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Answer::Yes,
            Some(false) => Answer::No,
            None => Answer::Unanswered,
        }
    }
}

impl From<Answer> for Option<bool> {
    fn from(answer: Answer) -> Self {
        match answer {
            Answer::Yes => Some(true),
            Answer::No => Some(false),
            Answer::Unanswered => None,
        }
    }
}

/// Completion value of a step. The kind is carried by the variant,
/// so a checkbox can never hold a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepValue {
    Checkbox(bool),
    YesNo(Answer),
}

impl StepValue {
    /// Fresh (untouched) value for a kind.
    pub fn empty(kind: StepKind) -> Self {
        match kind {
            StepKind::Checkbox => StepValue::Checkbox(false),
            StepKind::YesNo => StepValue::YesNo(Answer::Unanswered),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            StepValue::Checkbox(_) => StepKind::Checkbox,
            StepValue::YesNo(_) => StepKind::YesNo,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub title: String,
    pub value: StepValue,
    pub optional: bool,
    pub requires_photo: bool,
    pub comment: Option<String>,
    pub photo_url: Option<String>,
}

impl Step {
    pub fn new(id: StepId, title: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id,
            title: title.into(),
            value: StepValue::empty(kind),
            optional: false,
            requires_photo: false,
            comment: None,
            photo_url: None,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn requires_photo(mut self, requires_photo: bool) -> Self {
        self.requires_photo = requires_photo;
        self
    }

    pub fn kind(&self) -> StepKind {
        self.value.kind()
    }

    /// The backend's `isCompleted == true`: a checked box or a "yes".
    pub fn is_completed(&self) -> bool {
        matches!(
            self.value,
            StepValue::Checkbox(true) | StepValue::YesNo(Answer::Yes)
        )
    }

    /// Does this step allow the task to be marked complete?
    ///
    /// Any answer (yes or no) satisfies a yes/no step; an unanswered one does not.
    pub fn is_satisfied(&self) -> bool {
        if self.optional {
            return true;
        }
        match self.value {
            StepValue::Checkbox(checked) => checked,
            StepValue::YesNo(answer) => answer.is_answered(),
        }
    }

    pub fn has_comment(&self) -> bool {
        is_present(self.comment.as_deref())
    }

    pub fn has_photo(&self) -> bool {
        is_present(self.photo_url.as_deref())
    }

    /// Used by the rollback check: completed, commented or photographed.
    pub fn has_interaction(&self) -> bool {
        self.is_completed() || self.has_comment() || self.has_photo()
    }
}

/// null and "" both mean "absent" in the backend rows.
fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
