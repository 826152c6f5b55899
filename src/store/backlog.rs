//! Server-side task bookkeeping shared by the in-process backends: the
//! same checks a real backlog service applies, over plain owned data.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult, ValidationError};
use crate::graph::DependencyGraph;
use crate::model::dates;
use crate::model::{
    NewTask, Project, ProjectRole, Schedule, Task, TaskId, TaskPatch, TaskPriority, TaskStatus,
    User,
};

/// One project together with its tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBacklog {
    pub project: Project,
    #[serde(with = "task_records")]
    pub tasks: Vec<Task>,
}

/// Everything an in-process store holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backlog {
    #[serde(default)]
    pub projects: Vec<ProjectBacklog>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    next_id: u64,
}

impl Backlog {
    pub fn new(projects: Vec<ProjectBacklog>, users: Vec<User>) -> Self {
        let next_id = projects.iter().map(|p| p.tasks.len() as u64).sum();
        Self {
            projects,
            users,
            next_id,
        }
    }

    fn project(&self, project_id: &str) -> StoreResult<&ProjectBacklog> {
        self.projects
            .iter()
            .find(|p| p.project.id == project_id)
            .ok_or_else(|| StoreError::NotFound("Project not found".into()))
    }

    fn project_mut(&mut self, project_id: &str) -> StoreResult<&mut ProjectBacklog> {
        self.projects
            .iter_mut()
            .find(|p| p.project.id == project_id)
            .ok_or_else(|| StoreError::NotFound("Project not found".into()))
    }

    fn fresh_id(&mut self) -> TaskId {
        loop {
            self.next_id += 1;
            let id = TaskId::new(format!("task-{}", self.next_id));
            let taken = self
                .projects
                .iter()
                .any(|p| p.tasks.iter().any(|t| t.id == id));
            if !taken {
                return id;
            }
        }
    }

    pub fn get_project(&self, project_id: &str) -> StoreResult<Project> {
        Ok(self.project(project_id)?.project.clone())
    }

    pub fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        Ok(self.project(project_id)?.tasks.clone())
    }

    pub fn create_task(&mut self, project_id: &str, new: &NewTask) -> StoreResult<TaskId> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(StoreError::Rejected("Title is required".into()));
        }
        let (start, due) = parse_range(&new.start_date, &new.due_date)?;

        let id = self.fresh_id();
        let backlog = self.project_mut(project_id)?;
        if !is_member(&backlog.project, &new.assigned_to) {
            return Err(StoreError::Rejected(
                "Assignee must be a member of the project".into(),
            ));
        }

        let mut task = Task::new(id.clone(), title, start, due);
        task.description = new.description.clone();
        task.label = new.label.clone();
        task.status = new.status.clone();
        task.priority = new.priority;
        task.assigned_to = Some(new.assigned_to.clone());
        task.progress = new.progress.min(100);
        task.dependencies = new
            .dependencies
            .iter()
            .filter(|d| backlog.tasks.iter().any(|t| &t.id == *d))
            .cloned()
            .collect();
        backlog.tasks.push(task);
        debug!(%id, project_id, "task created");
        Ok(id)
    }

    pub fn update_task(&mut self, project_id: &str, id: &TaskId, patch: &TaskPatch) -> StoreResult<()> {
        let backlog = self.project_mut(project_id)?;
        let project = backlog.project.clone();
        let task = find_mut(&mut backlog.tasks, id)?;

        let mut updated = task.clone();
        patch.apply_to(&mut updated);
        if updated.title.trim().is_empty() {
            return Err(StoreError::Rejected("Title is required".into()));
        }
        if let Schedule::Scheduled { start, due } = updated.schedule {
            if start > due {
                return Err(StoreError::Rejected(
                    "Start date must be on or before the due date".into(),
                ));
            }
        }
        if let Some(assignee) = &patch.assigned_to {
            if !is_member(&project, assignee) {
                return Err(StoreError::Rejected(
                    "Assignee must be a member of the project".into(),
                ));
            }
        }
        *task = updated;
        Ok(())
    }

    /// Remove a task and every dependency link pointing at it.
    pub fn delete_task(&mut self, project_id: &str, id: &TaskId) -> StoreResult<()> {
        let backlog = self.project_mut(project_id)?;
        let before = backlog.tasks.len();
        backlog.tasks.retain(|t| &t.id != id);
        if backlog.tasks.len() == before {
            return Err(StoreError::NotFound("Task not found".into()));
        }
        for task in &mut backlog.tasks {
            task.dependencies.retain(|d| d != id);
        }
        Ok(())
    }

    pub fn add_dependency(
        &mut self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        let backlog = self.project_mut(project_id)?;
        if !backlog.tasks.iter().any(|t| &t.id == dependency_id) {
            return Err(StoreError::NotFound("Dependency task not found".into()));
        }
        match DependencyGraph::new(&backlog.tasks).check_edge(dependency_id, task_id) {
            Ok(()) | Err(ValidationError::DuplicateDependency) => {}
            Err(e) => return Err(StoreError::Rejected(e.to_string())),
        }
        let task = find_mut(&mut backlog.tasks, task_id)?;
        if !task.depends_on(dependency_id) {
            task.dependencies.push(dependency_id.clone());
        }
        Ok(task.dependencies.clone())
    }

    pub fn remove_dependency(
        &mut self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        let backlog = self.project_mut(project_id)?;
        let task = find_mut(&mut backlog.tasks, task_id)?;
        task.dependencies.retain(|d| d != dependency_id);
        Ok(task.dependencies.clone())
    }

    /// A small sample project laid out around `today`.
    pub fn demo(today: NaiveDate) -> Self {
        let users = vec![
            user("u-ada", "Ada Lovelace", "ada@teamworks.dev"),
            user("u-grace", "Grace Hopper", "grace@teamworks.dev"),
            user("u-linus", "", "linus@teamworks.dev"),
        ];
        let project = Project {
            id: "demo".into(),
            name: "Website Relaunch".into(),
            owner: Some("u-ada".into()),
            members: users.iter().map(|u| u.id.clone()).collect(),
            roles: vec![
                ProjectRole {
                    user_id: "u-grace".into(),
                    can_edit_gantt: true,
                },
                ProjectRole {
                    user_id: "u-linus".into(),
                    can_edit_gantt: false,
                },
            ],
        };

        let day = |offset: i64| dates::add_days(today, offset);
        let mut tasks = Vec::new();
        let mut push = |title: &str,
                        start: i64,
                        due: i64,
                        status: TaskStatus,
                        priority: TaskPriority,
                        assignee: &str,
                        progress: u8,
                        deps: &[usize]| {
            let id = TaskId::new(format!("task-{}", tasks.len() + 1));
            let mut task = Task::new(id, title, day(start), day(due));
            task.status = status;
            task.priority = priority;
            task.assigned_to = Some(assignee.to_string());
            task.progress = progress;
            task.dependencies = deps
                .iter()
                .map(|n| TaskId::new(format!("task-{n}")))
                .collect();
            tasks.push(task);
        };
        push("Requirements", -14, -8, TaskStatus::Done, TaskPriority::High, "u-ada", 100, &[]);
        push("Wireframes", -7, -1, TaskStatus::Done, TaskPriority::Medium, "u-grace", 100, &[1]);
        push("Visual design", -2, 6, TaskStatus::InProgress, TaskPriority::Medium, "u-grace", 40, &[2]);
        push("Frontend build", 3, 17, TaskStatus::ToDo, TaskPriority::High, "u-linus", 0, &[3]);
        push("Content migration", 0, 10, TaskStatus::InProgress, TaskPriority::Low, "u-ada", 20, &[1]);
        push("QA pass", 18, 22, TaskStatus::ToDo, TaskPriority::High, "u-linus", 0, &[4, 5]);
        push("Launch", 24, 24, TaskStatus::ToDo, TaskPriority::High, "u-ada", 0, &[6]);

        let mut unscheduled = Task::new(TaskId::new("task-8"), "Retrospective", today, today);
        unscheduled.schedule = Schedule::Unscheduled;
        tasks.push(unscheduled);

        Self::new(vec![ProjectBacklog { project, tasks }], users)
    }
}

fn user(id: &str, name: &str, email: &str) -> User {
    User {
        id: id.into(),
        name: name.into(),
        email: email.into(),
    }
}

fn is_member(project: &Project, id: &str) -> bool {
    project.owner.as_deref() == Some(id) || project.members.iter().any(|m| m == id)
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &TaskId) -> StoreResult<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|t| &t.id == id)
        .ok_or_else(|| StoreError::NotFound("Task not found".into()))
}

fn parse_range(start: &str, due: &str) -> StoreResult<(NaiveDate, NaiveDate)> {
    let (Some(start), Some(due)) = (dates::parse_date(start), dates::parse_date(due)) else {
        return Err(StoreError::Rejected(
            "Start date and due date are required".into(),
        ));
    };
    if start > due {
        return Err(StoreError::Rejected(
            "Start date must be on or before the due date".into(),
        ));
    }
    Ok((start, due))
}

/// Tasks are kept on disk in their wire shape.
mod task_records {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::model::{Task, TaskRecord};

    pub fn serialize<S>(tasks: &[Task], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let records: Vec<TaskRecord> = tasks.iter().map(TaskRecord::from).collect();
        records.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Task>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records: Vec<TaskRecord> = Vec::deserialize(deserializer)?;
        Ok(records.into_iter().map(Task::from).collect())
    }
}
