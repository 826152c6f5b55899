//! Task Store and project directory contracts, plus the backends the
//! client can run against.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::model::{NewTask, Project, Task, TaskId, TaskPatch, User};

pub mod backlog;
pub mod file;
pub mod http;
pub mod memory;

pub use file::FileStore;
pub use http::HttpStore;
pub use memory::{InMemoryStore, StoreCall, StoreOp};

/// Authoritative task collection for a project.
///
/// Every call may fail; callers treat their own local state as suspect
/// after any failure and re-list.
#[async_trait]
pub trait TaskStore: Send + Sync + 'static {
    /// Full, ordered snapshot of a project's tasks.
    async fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>>;

    /// Persist a new task and return its store-assigned ID.
    async fn create_task(&self, project_id: &str, task: &NewTask) -> StoreResult<TaskId>;

    /// Partial update; fields absent from `patch` are left unchanged.
    async fn update_task(&self, project_id: &str, id: &TaskId, patch: &TaskPatch)
        -> StoreResult<()>;

    async fn delete_task(&self, project_id: &str, id: &TaskId) -> StoreResult<()>;

    /// Make `task_id` depend on `dependency_id`. Returns the task's updated
    /// dependency list.
    async fn add_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>>;

    async fn remove_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>>;
}

/// Project metadata and the global user directory.
#[async_trait]
pub trait ProjectDirectory: Send + Sync + 'static {
    async fn get_project(&self, project_id: &str) -> StoreResult<Project>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;
}
