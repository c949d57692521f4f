//! Template: reusable blueprint for tasks.

use serde::{Deserialize, Serialize};

use super::ids::TemplateId;
use super::step::{Step, StepKind};
use super::task::{Task, TaskDraft};
use crate::ports::{Clock, IdGenerator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateStep {
    pub title: String,
    pub kind: StepKind,
    pub optional: bool,
    pub requires_photo: bool,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub steps: Vec<TemplateStep>,
}

impl Template {
    /// Steps sorted by `position` (storage order is not trusted).
    pub fn ordered_steps(&self) -> Vec<&TemplateStep> {
        let mut steps: Vec<&TemplateStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.position);
        steps
    }

    /// Move the step at ordered index `from` to ordered index `to`,
    /// then renumber positions 0..n.
    ///
    /// Returns false (and changes nothing) when an index is out of range.
    pub fn move_step(&mut self, from: usize, to: usize) -> bool {
        let len = self.steps.len();
        if from >= len || to >= len {
            return false;
        }
        self.steps.sort_by_key(|s| s.position);
        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        for (position, step) in self.steps.iter_mut().enumerate() {
            step.position = position as u32;
        }
        true
    }

    /// Copy this template into a new, independent task.
    ///
    /// Steps are duplicated in position order with fresh ids and fresh values.
    /// Missing draft fields fall back to the template's title / location.
    pub fn instantiate<G, C>(&self, ids: &G, clock: &C, mut draft: TaskDraft) -> Task
    where
        G: IdGenerator + ?Sized,
        C: Clock + ?Sized,
    {
        if draft.title.is_empty() {
            draft.title = self.title.clone();
        }
        if draft.location.is_empty() {
            draft.location = self.location.clone().unwrap_or_default();
        }
        let steps = self
            .ordered_steps()
            .into_iter()
            .map(|t| {
                Step::new(ids.generate_step_id(), t.title.clone(), t.kind)
                    .optional(t.optional)
                    .requires_photo(t.requires_photo)
            })
            .collect();
        Task::new(ids.generate_task_id(), draft, clock.now(), steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StepValue, TaskStatus};
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn tstep(title: &str, position: u32) -> TemplateStep {
        TemplateStep {
            title: title.into(),
            kind: StepKind::Checkbox,
            optional: false,
            requires_photo: false,
            position,
        }
    }

    fn template() -> Template {
        Template {
            id: TemplateId::from_ulid(Ulid::new()),
            title: "Checkout clean".into(),
            description: None,
            location: Some("Tower A".into()),
            department: Some("Housekeeping".into()),
            // stored out of order on purpose
            steps: vec![tstep("c", 2), tstep("a", 0), tstep("b", 1)],
        }
    }

    fn titles(t: &Template) -> Vec<String> {
        t.ordered_steps().iter().map(|s| s.title.clone()).collect()
    }

    #[test]
    fn ordered_steps_follow_position() {
        assert_eq!(titles(&template()), vec!["a", "b", "c"]);
    }

    #[test]
    fn move_step_renumbers() {
        let mut t = template();
        assert!(t.move_step(2, 0));
        assert_eq!(titles(&t), vec!["c", "a", "b"]);
        let positions: Vec<u32> = t.steps.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        assert!(!t.move_step(0, 3));
        assert_eq!(titles(&t), vec!["c", "a", "b"]);
    }

    #[test]
    fn instantiate_copies_steps_without_link() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 1, 7, 0, 0).unwrap());
        let ids = UlidGenerator::new(clock.clone());
        let mut tpl = template();
        tpl.steps[1].kind = StepKind::YesNo;
        tpl.steps[1].optional = true;

        let task = tpl.instantiate(&ids, &clock, TaskDraft::default());

        assert_eq!(task.title, "Checkout clean");
        assert_eq!(task.location, "Tower A");
        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.created_at, clock.now());
        let step_titles: Vec<&str> = task.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(step_titles, vec!["a", "b", "c"]);
        assert_eq!(task.steps[0].value, StepValue::YesNo(crate::domain::Answer::Unanswered));
        assert!(task.steps[0].optional);

        // editing the template afterwards does not touch the task
        tpl.steps.clear();
        assert_eq!(task.steps.len(), 3);
    }
}
