use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Transient, dismissible notice shown above the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    pub raised_at: Instant,
}

impl Banner {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
            raised_at: Instant::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
            raised_at: Instant::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == BannerKind::Error
    }

    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= ttl
    }
}

/// User-facing messages for each mutation outcome.
pub mod messages {
    pub const CREATED: &str = "Task created successfully!";
    pub const SAVED: &str = "Task saved successfully!";
    pub const DELETED: &str = "Task deleted.";
    pub const DEPENDENCY_ADDED: &str = "Dependency added.";
    pub const DEPENDENCY_REMOVED: &str = "Dependency removed.";
    pub const PROGRESS_UPDATED: &str = "Progress updated.";

    pub const CREATE_FAILED: &str = "Failed to create task.";
    pub const SAVE_FAILED: &str = "Failed to save task.";
    pub const DELETE_FAILED: &str = "Failed to delete task.";
    pub const ADD_DEPENDENCY_FAILED: &str = "Failed to add dependency.";
    pub const REMOVE_DEPENDENCY_FAILED: &str = "Failed to remove dependency.";
    pub const PROGRESS_FAILED: &str = "Failed to update progress.";
    pub const REFRESH_FAILED: &str = "Failed to refresh tasks.";
    pub const LOAD_FAILED: &str = "Something went wrong while loading data.";
}
