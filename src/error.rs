use thiserror::Error;

use crate::model::TaskId;

/// Problems caught before any request is sent. The transition is aborted
/// and no state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task title cannot be empty.")]
    EmptyTitle,
    #[error("Start date {start} is after due date {due}.")]
    InvertedDates { start: String, due: String },
    #[error("Start date and due date are required.")]
    MissingDates,
    #[error("Cannot assign task: no assignee available.")]
    NoAssignee,
    #[error("Assignee {0} is not a member of this project.")]
    UnresolvedAssignee(String),
    #[error("A task cannot depend on itself.")]
    SelfDependency,
    #[error("Adding this dependency would create a cycle.")]
    Cycle { from: TaskId, to: TaskId },
    #[error("This dependency already exists.")]
    DuplicateDependency,
    #[error("Task {0} not found.")]
    UnknownTask(TaskId),
    #[error("No task is selected.")]
    NoSelection,
    #[error("The task editor is not open.")]
    EditorClosed,
    #[error("You don't have permission to edit this timeline.")]
    ReadOnly,
}

/// Failures reported by a task store or project directory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned {status}")]
    Status { status: u16, message: Option<String> },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Message for the user: the server-provided one when there is one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            StoreError::Status {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            StoreError::Rejected(m) | StoreError::NotFound(m) if !m.trim().is_empty() => {
                m.clone()
            }
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_text() {
        let err = StoreError::Status {
            status: 400,
            message: Some("Due date must be after start".into()),
        };
        assert_eq!(err.user_message("Failed"), "Due date must be after start");

        let err = StoreError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message("Failed to save task."), "Failed to save task.");

        let err = StoreError::Transport("connection refused".into());
        assert_eq!(err.user_message("Failed"), "Failed");
    }
}
