use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::backlog::Backlog;
use super::{ProjectDirectory, TaskStore};
use crate::error::StoreResult;
use crate::model::{dates, NewTask, Project, Task, TaskId, TaskPatch, User};

/// Save a backlog to a JSON file.
pub fn save_backlog(backlog: &Backlog, path: &Path) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(backlog)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a backlog from a JSON file.
pub fn load_backlog(path: &Path) -> StoreResult<Backlog> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Store backed by a single JSON file, rewritten after every successful
/// mutation.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    backlog: Arc<Mutex<Backlog>>,
}

impl FileStore {
    /// Open `path`, seeding it with the demo project when it doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let backlog = if path.exists() {
            load_backlog(&path)?
        } else {
            info!(path = %path.display(), "creating data file with sample project");
            let backlog = Backlog::demo(dates::today());
            save_backlog(&backlog, &path)?;
            backlog
        };
        Ok(Self {
            path,
            backlog: Arc::new(Mutex::new(backlog)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a mutation and persist the result when it succeeds. A failed
    /// write rolls the in-memory state back.
    async fn mutate<T>(&self, op: impl FnOnce(&mut Backlog) -> StoreResult<T>) -> StoreResult<T> {
        let mut backlog = self.backlog.lock().await;
        let mut next = backlog.clone();
        let out = op(&mut next)?;
        save_backlog(&next, &self.path)?;
        debug!(path = %self.path.display(), "data file saved");
        *backlog = next;
        Ok(out)
    }
}

#[async_trait]
impl TaskStore for FileStore {
    async fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        self.backlog.lock().await.list_tasks(project_id)
    }

    async fn create_task(&self, project_id: &str, task: &NewTask) -> StoreResult<TaskId> {
        self.mutate(|b| b.create_task(project_id, task)).await
    }

    async fn update_task(
        &self,
        project_id: &str,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> StoreResult<()> {
        self.mutate(|b| b.update_task(project_id, id, patch)).await
    }

    async fn delete_task(&self, project_id: &str, id: &TaskId) -> StoreResult<()> {
        self.mutate(|b| b.delete_task(project_id, id)).await
    }

    async fn add_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        self.mutate(|b| b.add_dependency(project_id, task_id, dependency_id))
            .await
    }

    async fn remove_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        self.mutate(|b| b.remove_dependency(project_id, task_id, dependency_id))
            .await
    }
}

#[async_trait]
impl ProjectDirectory for FileStore {
    async fn get_project(&self, project_id: &str) -> StoreResult<Project> {
        self.backlog.lock().await.get_project(project_id)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.backlog.lock().await.users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskPriority, TaskStatus};

    #[tokio::test]
    async fn mutations_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gantt.json");

        let store = FileStore::open(&path).unwrap();
        assert!(path.exists());
        let id = store
            .create_task(
                "demo",
                &NewTask {
                    title: "Spec Review".into(),
                    description: String::new(),
                    label: String::new(),
                    status: TaskStatus::ToDo,
                    priority: TaskPriority::Medium,
                    assigned_to: "u-ada".into(),
                    start_date: "2024-03-01".into(),
                    due_date: "2024-03-05".into(),
                    progress: 0,
                    dependencies: Vec::new(),
                },
            )
            .await
            .unwrap();
        store
            .update_task("demo", &id, &TaskPatch::progress(30))
            .await
            .unwrap();

        let reopened = FileStore::open(&path).unwrap();
        let tasks = reopened.list_tasks("demo").await.unwrap();
        let task = tasks.iter().find(|t| t.id == id).unwrap();
        assert_eq!(task.title, "Spec Review");
        assert_eq!(task.progress, 30);
    }

    #[tokio::test]
    async fn rejected_mutation_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gantt.json");
        let store = FileStore::open(&path).unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = store
            .add_dependency("demo", &TaskId::from("task-1"), &TaskId::from("task-1"))
            .await;
        assert!(err.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }
}
