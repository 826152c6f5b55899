pub mod dates;
pub mod project;
pub mod task;
pub mod timeline;

pub use project::{Member, MemberDirectory, Project, ProjectRole, User};
pub use task::{
    MemberId, NewTask, Schedule, Task, TaskId, TaskPatch, TaskPriority, TaskRecord, TaskStatus,
};
pub use timeline::{range_label, TimelineBounds, TimelineScale, TimelineViewport};
