use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::backlog::{Backlog, ProjectBacklog};
use super::{ProjectDirectory, TaskStore};
use crate::error::{StoreError, StoreResult};
use crate::model::{dates, NewTask, Project, Task, TaskId, TaskPatch, User};

/// Store operations, used to target failure injection and to count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetProject,
    ListUsers,
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    AddDependency,
    RemoveDependency,
}

/// A recorded call with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    GetProject(String),
    ListUsers,
    ListTasks(String),
    CreateTask(NewTask),
    UpdateTask(TaskId, TaskPatch),
    DeleteTask(TaskId),
    AddDependency { task: TaskId, dependency: TaskId },
    RemoveDependency { task: TaskId, dependency: TaskId },
}

impl StoreCall {
    pub fn op(&self) -> StoreOp {
        match self {
            StoreCall::GetProject(_) => StoreOp::GetProject,
            StoreCall::ListUsers => StoreOp::ListUsers,
            StoreCall::ListTasks(_) => StoreOp::ListTasks,
            StoreCall::CreateTask(_) => StoreOp::CreateTask,
            StoreCall::UpdateTask(..) => StoreOp::UpdateTask,
            StoreCall::DeleteTask(_) => StoreOp::DeleteTask,
            StoreCall::AddDependency { .. } => StoreOp::AddDependency,
            StoreCall::RemoveDependency { .. } => StoreOp::RemoveDependency,
        }
    }
}

/// In-process store used by the demo mode and as the test double.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    backlog: Arc<Mutex<Backlog>>,
    failures: Arc<Mutex<HashMap<StoreOp, VecDeque<StoreError>>>>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl InMemoryStore {
    pub fn new(backlog: Backlog) -> Self {
        Self {
            backlog: Arc::new(Mutex::new(backlog)),
            ..Default::default()
        }
    }

    /// Sample project `demo` laid out around today.
    pub fn demo() -> Self {
        Self::new(Backlog::demo(dates::today()))
    }

    /// A store holding a single project.
    pub fn with_project(project: Project, users: Vec<User>, tasks: Vec<Task>) -> Self {
        Self::new(Backlog::new(vec![ProjectBacklog { project, tasks }], users))
    }

    /// Make the next call of `op` fail with `error`. Queued failures are
    /// consumed in order.
    pub async fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.failures
            .lock()
            .await
            .entry(op)
            .or_default()
            .push_back(error);
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, op: StoreOp) -> usize {
        self.calls.lock().await.iter().filter(|c| c.op() == op).count()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Snapshot of the whole backlog.
    pub async fn snapshot(&self) -> Backlog {
        self.backlog.lock().await.clone()
    }

    async fn record(&self, call: StoreCall) -> StoreResult<()> {
        let op = call.op();
        self.calls.lock().await.push(call);
        let injected = self
            .failures
            .lock()
            .await
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(err) => {
                debug!(?op, %err, "injected store failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        self.record(StoreCall::ListTasks(project_id.to_string())).await?;
        self.backlog.lock().await.list_tasks(project_id)
    }

    async fn create_task(&self, project_id: &str, task: &NewTask) -> StoreResult<TaskId> {
        self.record(StoreCall::CreateTask(task.clone())).await?;
        self.backlog.lock().await.create_task(project_id, task)
    }

    async fn update_task(
        &self,
        project_id: &str,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> StoreResult<()> {
        self.record(StoreCall::UpdateTask(id.clone(), patch.clone())).await?;
        self.backlog.lock().await.update_task(project_id, id, patch)
    }

    async fn delete_task(&self, project_id: &str, id: &TaskId) -> StoreResult<()> {
        self.record(StoreCall::DeleteTask(id.clone())).await?;
        self.backlog.lock().await.delete_task(project_id, id)
    }

    async fn add_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        self.record(StoreCall::AddDependency {
            task: task_id.clone(),
            dependency: dependency_id.clone(),
        })
        .await?;
        self.backlog
            .lock()
            .await
            .add_dependency(project_id, task_id, dependency_id)
    }

    async fn remove_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        self.record(StoreCall::RemoveDependency {
            task: task_id.clone(),
            dependency: dependency_id.clone(),
        })
        .await?;
        self.backlog
            .lock()
            .await
            .remove_dependency(project_id, task_id, dependency_id)
    }
}

#[async_trait]
impl ProjectDirectory for InMemoryStore {
    async fn get_project(&self, project_id: &str) -> StoreResult<Project> {
        self.record(StoreCall::GetProject(project_id.to_string())).await?;
        self.backlog.lock().await.get_project(project_id)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.record(StoreCall::ListUsers).await?;
        Ok(self.backlog.lock().await.users.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_are_consumed_once() {
        let store = InMemoryStore::demo();
        store
            .fail_next(StoreOp::ListTasks, StoreError::Transport("offline".into()))
            .await;
        assert!(store.list_tasks("demo").await.is_err());
        assert!(store.list_tasks("demo").await.is_ok());
        assert_eq!(store.count(StoreOp::ListTasks).await, 2);
    }

    #[tokio::test]
    async fn dependency_calls_return_updated_list() {
        let store = InMemoryStore::demo();
        let deps = store
            .add_dependency("demo", &TaskId::from("task-7"), &TaskId::from("task-1"))
            .await
            .unwrap();
        assert_eq!(deps, vec![TaskId::from("task-6"), TaskId::from("task-1")]);
        let deps = store
            .remove_dependency("demo", &TaskId::from("task-7"), &TaskId::from("task-6"))
            .await
            .unwrap();
        assert_eq!(deps, vec![TaskId::from("task-1")]);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let store = InMemoryStore::demo();
        let err = store.get_project("nope").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
