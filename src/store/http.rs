use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ProjectDirectory, TaskStore};
use crate::error::{StoreError, StoreResult};
use crate::model::task::dependency_id;
use crate::model::{NewTask, Project, Task, TaskId, TaskPatch, TaskRecord, User};

const USER_HEADER: &str = "X-User-Id";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct DependenciesBody {
    #[serde(default)]
    dependencies: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddDependencyRequest<'a> {
    dependency_id: &'a str,
}

/// REST backend for the teamworks API.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base_url: Url,
    user_id: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: &str, user_id: Option<String>, timeout: Duration) -> StoreResult<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| StoreError::Transport(format!("invalid API URL {base_url}: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            user_id,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("cannot build URL from {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn backlog(&self, project_id: &str, rest: &[&str]) -> StoreResult<Url> {
        let mut segments = vec!["api", "projects", project_id, "backlog"];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn with_user(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.user_id {
            Some(id) => request.header(USER_HEADER, id),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, call_name: &str) -> StoreResult<Response> {
        let response = self.with_user(request).send().await.map_err(|e| {
            warn!(call = call_name, error = %e, "request failed");
            StoreError::from(e)
        })?;
        let status = response.status();
        debug!(call = call_name, %status, "response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.trim().is_empty());
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, call_name: &str) -> StoreResult<T> {
        let response = self.send(self.client.get(url), call_name).await?;
        Ok(response.json::<T>().await?)
    }
}

fn dependency_list(body: DependenciesBody) -> Vec<TaskId> {
    let mut out: Vec<TaskId> = Vec::with_capacity(body.dependencies.len());
    for id in body.dependencies.iter().filter_map(dependency_id) {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[async_trait]
impl TaskStore for HttpStore {
    async fn list_tasks(&self, project_id: &str) -> StoreResult<Vec<Task>> {
        let url = self.backlog(project_id, &[])?;
        let records: Vec<TaskRecord> = self.get_json(url, "list_tasks").await?;
        Ok(records.into_iter().map(Task::from).collect())
    }

    async fn create_task(&self, project_id: &str, task: &NewTask) -> StoreResult<TaskId> {
        let url = self.backlog(project_id, &[])?;
        let response = self
            .send(self.client.post(url).json(task), "create_task")
            .await?;
        let body: CreatedBody = response.json().await?;
        dependency_id(&body.id)
            .ok_or_else(|| StoreError::Decode("create response carried no task id".into()))
    }

    async fn update_task(
        &self,
        project_id: &str,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> StoreResult<()> {
        let url = self.backlog(project_id, &[id.as_str()])?;
        self.send(self.client.put(url).json(patch), "update_task")
            .await?;
        Ok(())
    }

    async fn delete_task(&self, project_id: &str, id: &TaskId) -> StoreResult<()> {
        let url = self.backlog(project_id, &[id.as_str()])?;
        self.send(self.client.delete(url), "delete_task").await?;
        Ok(())
    }

    async fn add_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        let url = self.backlog(project_id, &[task_id.as_str(), "dependencies"])?;
        let body = AddDependencyRequest {
            dependency_id: dependency_id.as_str(),
        };
        let response = self
            .send(self.client.post(url).json(&body), "add_dependency")
            .await?;
        Ok(dependency_list(response.json().await?))
    }

    async fn remove_dependency(
        &self,
        project_id: &str,
        task_id: &TaskId,
        dependency_id: &TaskId,
    ) -> StoreResult<Vec<TaskId>> {
        let url = self.backlog(
            project_id,
            &[task_id.as_str(), "dependencies", dependency_id.as_str()],
        )?;
        let response = self
            .send(self.client.delete(url), "remove_dependency")
            .await?;
        Ok(dependency_list(response.json().await?))
    }
}

#[async_trait]
impl ProjectDirectory for HttpStore {
    async fn get_project(&self, project_id: &str) -> StoreResult<Project> {
        let url = self.endpoint(&["api", "project", project_id])?;
        self.get_json(url, "get_project").await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let url = self.endpoint(&["api", "users"])?;
        self.get_json(url, "list_users").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> HttpStore {
        HttpStore::new("http://localhost:5001/", Some("u1".into()), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn builds_backlog_routes() {
        let store = store();
        assert_eq!(
            store.backlog("p 1", &[]).unwrap().as_str(),
            "http://localhost:5001/api/projects/p%201/backlog"
        );
        assert_eq!(
            store
                .backlog("p1", &["t1", "dependencies", "t2"])
                .unwrap()
                .as_str(),
            "http://localhost:5001/api/projects/p1/backlog/t1/dependencies/t2"
        );
        assert_eq!(
            store.endpoint(&["api", "project", "p1"]).unwrap().as_str(),
            "http://localhost:5001/api/project/p1"
        );
    }

    #[test]
    fn dependency_bodies_are_normalized() {
        let body: DependenciesBody =
            serde_json::from_value(serde_json::json!({ "dependencies": [1, "2", "2", null] }))
                .unwrap();
        assert_eq!(dependency_list(body), vec![TaskId::from("1"), TaskId::from("2")]);
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(HttpStore::new("not a url", None, Duration::from_secs(1)).is_err());
    }
}
