use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::dates::{self, iso_opt};

/// Opaque task identifier, unique within a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A locally generated ID for a bar that has no store record yet.
    pub fn new_draft() -> Self {
        Self(format!("draft-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a project member / user.
pub type MemberId = String;

/// Workflow status. Stored as a free-form string, shown as a fixed set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    ToDo,
    InProgress,
    Done,
    Other(String),
}

impl TaskStatus {
    pub fn all() -> &'static [TaskStatus] {
        &[TaskStatus::ToDo, TaskStatus::InProgress, TaskStatus::Done]
    }

    pub fn label(&self) -> &str {
        match self {
            TaskStatus::ToDo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
            TaskStatus::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.trim() {
            "" | "To Do" => TaskStatus::ToDo,
            "In Progress" => TaskStatus::InProgress,
            "Done" => TaskStatus::Done,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(s: TaskStatus) -> Self {
        s.label().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn all() -> &'static [TaskPriority] {
        &[TaskPriority::Low, TaskPriority::Medium, TaskPriority::High]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }
}

impl From<String> for TaskPriority {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            _ => TaskPriority::Medium,
        }
    }
}

impl From<TaskPriority> for String {
    fn from(p: TaskPriority) -> Self {
        p.label().to_string()
    }
}

/// Where a task sits on the calendar. Tasks missing either date stay off the
/// timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Scheduled { start: NaiveDate, due: NaiveDate },
    Unscheduled,
}

impl Schedule {
    pub fn from_parts(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Self {
        match (start, due) {
            (Some(start), Some(due)) => Schedule::Scheduled { start, due },
            _ => Schedule::Unscheduled,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        match self {
            Schedule::Scheduled { start, .. } => Some(*start),
            Schedule::Unscheduled => None,
        }
    }

    pub fn due(&self) -> Option<NaiveDate> {
        match self {
            Schedule::Scheduled { due, .. } => Some(*due),
            Schedule::Unscheduled => None,
        }
    }
}

/// A single task as the core sees it: a fixed-shape snapshot of a store
/// record.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub label: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<MemberId>,
    pub schedule: Schedule,
    /// Percent complete, 0..=100.
    pub progress: u8,
    /// Predecessors: tasks this one depends on.
    pub dependencies: Vec<TaskId>,
}

impl Task {
    /// Create a scheduled task with defaults for everything else.
    pub fn new(id: TaskId, title: impl Into<String>, start: NaiveDate, due: NaiveDate) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            label: String::new(),
            status: TaskStatus::ToDo,
            priority: TaskPriority::Medium,
            assigned_to: None,
            schedule: Schedule::Scheduled { start, due },
            progress: 0,
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(&self, id: &TaskId) -> bool {
        self.dependencies.contains(id)
    }
}

/// Task as it travels over the store boundary (camelCase JSON, dates as
/// `YYYY-MM-DD`, progress as a percentage).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, with = "iso_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "iso_opt")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub dependencies: Vec<serde_json::Value>,
}

/// Coerce a stored progress value into a whole percentage.
pub fn normalize_progress(raw: Option<f64>) -> u8 {
    match raw {
        Some(p) if p.is_finite() => p.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

/// Stringified dependency reference; blanks and non-scalar values are dropped.
pub(crate) fn dependency_id(value: &serde_json::Value) -> Option<TaskId> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(TaskId::new(s.trim())),
        serde_json::Value::Number(n) => Some(TaskId::new(n.to_string())),
        _ => None,
    }
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        let mut dependencies: Vec<TaskId> = Vec::with_capacity(record.dependencies.len());
        for dep in record.dependencies.iter().filter_map(dependency_id) {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }
        Self {
            id: TaskId::new(record.id),
            title: record.title,
            description: record.description,
            label: record.label,
            status: record.status.map(TaskStatus::from).unwrap_or_default(),
            priority: record.priority.map(TaskPriority::from).unwrap_or_default(),
            assigned_to: record
                .assigned_to
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            schedule: Schedule::from_parts(record.start_date, record.due_date),
            progress: normalize_progress(record.progress),
            dependencies,
        }
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            title: task.title.clone(),
            description: task.description.clone(),
            label: task.label.clone(),
            status: Some(task.status.label().to_string()),
            priority: Some(task.priority.label().to_string()),
            assigned_to: task.assigned_to.clone(),
            start_date: task.schedule.start(),
            due_date: task.schedule.due(),
            progress: Some(f64::from(task.progress)),
            dependencies: task
                .dependencies
                .iter()
                .map(|d| serde_json::Value::String(d.to_string()))
                .collect(),
        }
    }
}

/// Body of a create request. Every field is required by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub label: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: MemberId,
    pub start_date: String,
    pub due_date: String,
    pub progress: u8,
    pub dependencies: Vec<TaskId>,
}

/// Partial update. `None` fields are left unchanged by the store and are
/// not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<MemberId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }

    pub fn dates(start: NaiveDate, due: NaiveDate) -> Self {
        Self {
            start_date: Some(dates::to_iso_date(start)),
            due_date: Some(dates::to_iso_date(due)),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress.min(100)),
            ..Default::default()
        }
    }

    /// Apply the patch to a local task snapshot. Unparseable dates are
    /// ignored.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = &self.status {
            task.status = status.clone();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(assignee) = &self.assigned_to {
            task.assigned_to = Some(assignee.clone()).filter(|a| !a.is_empty());
        }
        let start = dates::parse_opt_date(self.start_date.as_deref()).or(task.schedule.start());
        let due = dates::parse_opt_date(self.due_date.as_deref()).or(task.schedule.due());
        task.schedule = Schedule::from_parts(start, due);
        if let Some(progress) = self.progress {
            task.progress = progress.min(100);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_normalization() {
        let record: TaskRecord = serde_json::from_value(json!({
            "id": "t1",
            "title": "Write docs",
            "status": "In Progress",
            "priority": "urgent",
            "assignedTo": "",
            "startDate": "2024-03-01",
            "dueDate": "garbage",
            "progress": 140.4,
            "dependencies": ["a", "b", "a", 7, null]
        }))
        .unwrap();
        let task = Task::from(record);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.assigned_to, None);
        assert_eq!(task.schedule, Schedule::Unscheduled);
        assert_eq!(task.progress, 100);
        assert_eq!(
            task.dependencies,
            vec![TaskId::from("a"), TaskId::from("b"), TaskId::from("7")]
        );
    }

    #[test]
    fn unknown_status_is_kept() {
        assert_eq!(
            TaskStatus::from("Blocked".to_string()),
            TaskStatus::Other("Blocked".to_string())
        );
        assert_eq!(String::from(TaskStatus::Other("Blocked".into())), "Blocked");
    }

    #[test]
    fn patch_omits_unset_fields() {
        let patch = TaskPatch::progress(40);
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "progress": 40 }));
        assert!(TaskPatch::default().is_empty());
    }

    #[test]
    fn patch_applies_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let due = NaiveDate::from_ymd_opt(2024, 4, 10).unwrap();
        let mut task = Task::new(TaskId::from("x"), "X", start, start);
        TaskPatch::dates(start, due).apply_to(&mut task);
        assert_eq!(task.schedule, Schedule::Scheduled { start, due });
    }

    #[test]
    fn patch_carries_description() {
        let day = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let mut task = Task::new(TaskId::from("x"), "X", day, day);
        let patch = TaskPatch {
            description: Some("new notes".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "description": "new notes" })
        );
        patch.apply_to(&mut task);
        assert_eq!(task.description, "new notes");
        assert_eq!(task.title, "X");
    }

    #[test]
    fn draft_ids_are_unique() {
        assert_ne!(TaskId::new_draft(), TaskId::new_draft());
    }
}
