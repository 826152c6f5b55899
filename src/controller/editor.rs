use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::model::dates;
use crate::model::{
    MemberDirectory, MemberId, NewTask, Schedule, Task, TaskId, TaskPatch, TaskPriority,
    TaskStatus,
};

/// Field values of the task editor while it is open.
///
/// `is_draft` decides between the create and update commit paths. It is set
/// once when the editor opens and never inferred from the ID.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorForm {
    pub task_id: TaskId,
    pub is_draft: bool,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub progress: u8,
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub assignee: Option<MemberId>,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidForm {
    pub start: NaiveDate,
    pub due: NaiveDate,
    pub assignee: Option<MemberId>,
}

impl EditorForm {
    /// Seed from a task. Unscheduled tasks get today and a week from today.
    pub fn from_task(task: &Task, is_draft: bool) -> Self {
        let (start, due) = match task.schedule {
            Schedule::Scheduled { start, due } => (start, due),
            Schedule::Unscheduled => {
                let today = dates::today();
                (today, dates::add_days(today, 7))
            }
        };
        Self {
            task_id: task.id.clone(),
            is_draft,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.clone(),
            priority: task.priority,
            progress: task.progress,
            start: Some(start),
            due: Some(due),
            assignee: task.assigned_to.clone(),
        }
    }

    /// Check the form before anything is sent. `original` is the task being
    /// edited, if it already exists in the store.
    pub fn validate(
        &self,
        original: Option<&Task>,
        members: &MemberDirectory,
        current_user: Option<&str>,
    ) -> Result<ValidForm, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let (Some(start), Some(due)) = (self.start, self.due) else {
            return Err(ValidationError::MissingDates);
        };
        if start > due {
            return Err(ValidationError::InvertedDates {
                start: dates::to_iso_date(start),
                due: dates::to_iso_date(due),
            });
        }

        let assignee = self
            .assignee
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty());
        let unchanged = original.is_some_and(|t| t.assigned_to.as_deref() == assignee);
        match assignee {
            None if self.is_draft => return Err(ValidationError::NoAssignee),
            Some(id) if !unchanged && !members.can_assign(id, current_user) => {
                return Err(ValidationError::UnresolvedAssignee(id.to_string()));
            }
            _ => {}
        }

        Ok(ValidForm {
            start,
            due,
            assignee: assignee.map(str::to_string),
        })
    }

    /// Create request for a draft.
    pub fn to_new_task(&self, valid: &ValidForm) -> NewTask {
        NewTask {
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            label: String::new(),
            status: self.status.clone(),
            priority: self.priority,
            assigned_to: valid.assignee.clone().unwrap_or_default(),
            start_date: dates::to_iso_date(valid.start),
            due_date: dates::to_iso_date(valid.due),
            progress: self.progress.min(100),
            dependencies: Vec::new(),
        }
    }

    /// Only the fields that differ from `original`.
    pub fn diff(&self, original: &Task, valid: &ValidForm) -> TaskPatch {
        let mut patch = TaskPatch::default();
        let title = self.title.trim();
        if title != original.title {
            patch.title = Some(title.to_string());
        }
        if self.description != original.description {
            patch.description = Some(self.description.clone());
        }
        if self.status != original.status {
            patch.status = Some(self.status.clone());
        }
        if self.priority != original.priority {
            patch.priority = Some(self.priority);
        }
        if let Some(assignee) = &valid.assignee {
            if original.assigned_to.as_ref() != Some(assignee) {
                patch.assigned_to = Some(assignee.clone());
            }
        }
        if original.schedule.start() != Some(valid.start) {
            patch.start_date = Some(dates::to_iso_date(valid.start));
        }
        if original.schedule.due() != Some(valid.due) {
            patch.due_date = Some(dates::to_iso_date(valid.due));
        }
        let progress = self.progress.min(100);
        if progress != original.progress {
            patch.progress = Some(progress);
        }
        patch
    }

    /// Take over the schedule and progress fields that changed between
    /// `seed` and `current` (e.g. a drag on the open task), keeping local
    /// edits to everything else.
    pub fn rebase(&mut self, seed: &EditorForm, current: &EditorForm) {
        if current.start != seed.start {
            self.start = current.start;
        }
        if current.due != seed.due {
            self.due = current.due;
        }
        if current.progress != seed.progress {
            self.progress = current.progress;
        }
    }

    /// Local view of the task with the form applied, used while a save is in
    /// flight.
    pub fn apply_to(&self, task: &mut Task, valid: &ValidForm) {
        task.title = self.title.trim().to_string();
        task.description = self.description.clone();
        task.status = self.status.clone();
        task.priority = self.priority;
        task.progress = self.progress.min(100);
        task.schedule = Schedule::Scheduled {
            start: valid.start,
            due: valid.due,
        };
        if valid.assignee.is_some() {
            task.assigned_to = valid.assignee.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, User};
    use pretty_assertions::assert_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn members() -> MemberDirectory {
        let mut project = Project::new("p1", "P");
        project.members = vec!["u1".into(), "u2".into()];
        MemberDirectory::resolve(&project, &[User {
            id: "u1".into(),
            name: "Ada".into(),
            email: String::new(),
        }])
    }

    fn existing() -> Task {
        let mut t = Task::new(TaskId::from("t1"), "Build", d(4, 1), d(4, 10));
        t.assigned_to = Some("u1".into());
        t.progress = 10;
        t
    }

    #[test]
    fn validation_order() {
        let mut form = EditorForm::from_task(&existing(), false);
        form.title = "  ".into();
        assert_eq!(
            form.validate(None, &members(), None),
            Err(ValidationError::EmptyTitle)
        );
        form.title = "Build".into();
        form.start = Some(d(4, 12));
        assert!(matches!(
            form.validate(None, &members(), None),
            Err(ValidationError::InvertedDates { .. })
        ));
        form.start = None;
        assert_eq!(
            form.validate(None, &members(), None),
            Err(ValidationError::MissingDates)
        );
    }

    #[test]
    fn drafts_need_a_resolvable_assignee() {
        let draft = Task::new(TaskId::new_draft(), "Spec Review", d(3, 1), d(3, 1));
        let mut form = EditorForm::from_task(&draft, true);
        assert_eq!(
            form.validate(None, &members(), Some("me")),
            Err(ValidationError::NoAssignee)
        );
        form.assignee = Some("stranger".into());
        assert_eq!(
            form.validate(None, &members(), Some("me")),
            Err(ValidationError::UnresolvedAssignee("stranger".into()))
        );
        form.assignee = Some("u2".into());
        let valid = form.validate(None, &members(), Some("me")).unwrap();
        let new = form.to_new_task(&valid);
        assert_eq!(new.start_date, "2024-03-01");
        assert_eq!(new.assigned_to, "u2");
    }

    #[test]
    fn former_member_can_stay_assigned() {
        let mut task = existing();
        task.assigned_to = Some("left-the-team".into());
        let form = EditorForm::from_task(&task, false);
        assert!(form.validate(Some(&task), &members(), None).is_ok());
    }

    #[test]
    fn diff_contains_changed_fields_only() {
        let task = existing();
        let mut form = EditorForm::from_task(&task, false);
        form.due = Some(d(4, 15));
        form.status = TaskStatus::InProgress;
        let valid = form.validate(Some(&task), &members(), None).unwrap();
        assert_eq!(
            form.diff(&task, &valid),
            TaskPatch {
                status: Some(TaskStatus::InProgress),
                due_date: Some("2024-04-15".into()),
                ..Default::default()
            }
        );

        let untouched = EditorForm::from_task(&task, false);
        let valid = untouched.validate(Some(&task), &members(), None).unwrap();
        assert!(untouched.diff(&task, &valid).is_empty());
    }

    #[test]
    fn diff_includes_notes() {
        let task = existing();
        let mut form = EditorForm::from_task(&task, false);
        form.description = "new notes".into();
        let valid = form.validate(Some(&task), &members(), None).unwrap();
        assert_eq!(
            form.diff(&task, &valid),
            TaskPatch {
                description: Some("new notes".into()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn rebase_keeps_typed_fields_and_takes_moved_dates() {
        let draft = Task::new(TaskId::new_draft(), "Spec Review", d(3, 1), d(3, 1));
        let seed = EditorForm::from_task(&draft, true);
        let mut local = seed.clone();
        local.title = "Spec Review v2".into();
        local.due = Some(d(3, 2));

        let mut moved = seed.clone();
        moved.start = Some(d(3, 4));
        moved.progress = 30;
        local.rebase(&seed, &moved);

        assert_eq!(local.title, "Spec Review v2");
        assert_eq!(local.start, Some(d(3, 4)));
        assert_eq!(local.due, Some(d(3, 2)));
        assert_eq!(local.progress, 30);
    }
}
