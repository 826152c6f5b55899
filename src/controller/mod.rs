//! The interactive edit controller: sole owner of the task list, driven by
//! one [`Action`] at a time.
//!
//! [`EditController::apply`] validates an action and applies its optimistic
//! local effect synchronously, returning the store work still to do as an
//! [`Effect`]. [`EditController::run`] performs that work and reconciles
//! with the store afterwards; after a failure it always re-lists.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, ValidationError};
use crate::graph::DependencyGraph;
use crate::model::dates;
use crate::model::{
    MemberDirectory, MemberId, NewTask, Project, Schedule, Task, TaskId, TaskPatch,
    TimelineScale,
};
use crate::projection::{self, DependencyEdge, TimelineFilter, TimelineProjection};
use crate::store::{ProjectDirectory, TaskStore};

pub mod actor;
pub mod banner;
pub mod editor;

pub use actor::{spawn, ControllerHandle};
pub use banner::{messages, Banner, BannerKind};
pub use editor::{EditorForm, ValidForm};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Selected(TaskId),
    Editing(TaskId),
}

impl EditState {
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            EditState::Idle => None,
            EditState::Selected(id) | EditState::Editing(id) => Some(id),
        }
    }
}

/// Which part of a bar a drag gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    ResizeStart,
    ResizeEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Initial load, also used to retry after a failed load.
    Load,
    Select(TaskId),
    Deselect,
    SetFilter(TimelineFilter),
    SetScale(TimelineScale),
    /// Draw a new bar on the chart. It stays local until saved.
    CreateDraft {
        title: String,
        start: NaiveDate,
        due: NaiveDate,
    },
    /// End of a drag gesture, already converted to whole days.
    Drag {
        id: TaskId,
        kind: DragKind,
        day_delta: i64,
    },
    OpenEditor,
    Save(EditorForm),
    Cancel,
    Delete(TaskId),
    /// Make `to` depend on `from`.
    AddDependency {
        from: TaskId,
        to: TaskId,
    },
    RemoveDependency {
        from: TaskId,
        to: TaskId,
    },
    SetProgress {
        id: TaskId,
        progress: u8,
    },
    DismissBanner,
}

impl Action {
    fn is_mutation(&self) -> bool {
        matches!(
            self,
            Action::CreateDraft { .. }
                | Action::Drag { .. }
                | Action::OpenEditor
                | Action::Save(_)
                | Action::Delete(_)
                | Action::AddDependency { .. }
                | Action::RemoveDependency { .. }
                | Action::SetProgress { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Save,
    Drag,
    Progress,
}

impl UpdateKind {
    fn success(self) -> &'static str {
        match self {
            UpdateKind::Save | UpdateKind::Drag => messages::SAVED,
            UpdateKind::Progress => messages::PROGRESS_UPDATED,
        }
    }

    fn failure(self) -> &'static str {
        match self {
            UpdateKind::Save | UpdateKind::Drag => messages::SAVE_FAILED,
            UpdateKind::Progress => messages::PROGRESS_FAILED,
        }
    }
}

/// Store work left over after an action was applied locally.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Load,
    Create { draft_id: TaskId, task: NewTask },
    Update {
        id: TaskId,
        patch: TaskPatch,
        kind: UpdateKind,
    },
    Delete(TaskId),
    AddDependency { from: TaskId, to: TaskId },
    RemoveDependency { from: TaskId, to: TaskId },
}

/// Read-only snapshot handed to the rendering layer.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub load_state: LoadState,
    pub project_name: String,
    pub read_only: bool,
    pub current_user: Option<MemberId>,
    pub members: MemberDirectory,
    /// Stored tasks followed by drafts, with pending draft links applied.
    pub tasks: Vec<Task>,
    pub drafts: Vec<TaskId>,
    pub projection: TimelineProjection,
    pub filter: TimelineFilter,
    pub edit_state: EditState,
    pub editor: Option<EditorForm>,
    pub banner: Option<Banner>,
    pub inline_error: Option<String>,
}

impl ViewState {
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn is_draft(&self, id: &TaskId) -> bool {
        self.drafts.contains(id)
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.edit_state.task_id().and_then(|id| self.task(id))
    }

    pub fn dependency_candidates(&self) -> Vec<&Task> {
        match self.edit_state.task_id() {
            Some(id) => projection::dependency_candidates(&self.tasks, id),
            None => Vec::new(),
        }
    }
}

pub struct EditController {
    store: Arc<dyn TaskStore>,
    directory: Arc<dyn ProjectDirectory>,
    project_id: String,
    current_user: Option<MemberId>,
    project: Option<Project>,
    members: MemberDirectory,
    read_only: bool,
    load_state: LoadState,
    tasks: Vec<Task>,
    drafts: Vec<Task>,
    /// Links with a draft at either end; persisted once both ends exist.
    draft_edges: Vec<DependencyEdge>,
    state: EditState,
    editor: Option<EditorForm>,
    filter: TimelineFilter,
    scale: TimelineScale,
    banner: Option<Banner>,
    inline_error: Option<String>,
}

impl EditController {
    pub fn new(
        store: Arc<dyn TaskStore>,
        directory: Arc<dyn ProjectDirectory>,
        project_id: impl Into<String>,
        current_user: Option<MemberId>,
        scale: TimelineScale,
    ) -> Self {
        Self {
            store,
            directory,
            project_id: project_id.into(),
            current_user,
            project: None,
            members: MemberDirectory::default(),
            read_only: true,
            load_state: LoadState::Loading,
            tasks: Vec::new(),
            drafts: Vec::new(),
            draft_edges: Vec::new(),
            state: EditState::Idle,
            editor: None,
            filter: TimelineFilter::default(),
            scale,
            banner: None,
            inline_error: None,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn editor(&self) -> Option<&EditorForm> {
        self.editor.as_ref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Tasks last received from the store.
    pub fn stored_tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn drafts(&self) -> &[Task] {
        &self.drafts
    }

    /// Stored tasks and drafts, with pending draft links applied.
    pub fn all_tasks(&self) -> Vec<Task> {
        let mut all: Vec<Task> = self.tasks.iter().chain(&self.drafts).cloned().collect();
        for edge in &self.draft_edges {
            if let Some(task) = all.iter_mut().find(|t| t.id == edge.to) {
                if !task.depends_on(&edge.from) {
                    task.dependencies.push(edge.from.clone());
                }
            }
        }
        all
    }

    pub fn projection(&self) -> TimelineProjection {
        projection::project(&self.all_tasks(), &self.filter, self.scale)
    }

    pub fn view(&self) -> ViewState {
        let tasks = self.all_tasks();
        ViewState {
            load_state: self.load_state.clone(),
            project_name: self
                .project
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_default(),
            read_only: self.read_only,
            current_user: self.current_user.clone(),
            members: self.members.clone(),
            projection: projection::project(&tasks, &self.filter, self.scale),
            tasks,
            drafts: self.drafts.iter().map(|d| d.id.clone()).collect(),
            filter: self.filter.clone(),
            edit_state: self.state.clone(),
            editor: self.editor.clone(),
            banner: self.banner.clone(),
            inline_error: self.inline_error.clone(),
        }
    }

    /// Apply an action and run whatever store work it needs.
    pub async fn dispatch(&mut self, action: Action) -> Result<(), ValidationError> {
        if let Some(effect) = self.apply(action)? {
            self.run(effect).await;
        }
        Ok(())
    }

    /// Validate `action` and apply its local part. On error nothing changes
    /// except the inline error message.
    pub fn apply(&mut self, action: Action) -> Result<Option<Effect>, ValidationError> {
        let result = self.reduce(action);
        match &result {
            Ok(_) => self.inline_error = None,
            Err(e) => {
                debug!(error = %e, "action refused");
                self.inline_error = Some(e.to_string());
            }
        }
        result
    }

    fn reduce(&mut self, action: Action) -> Result<Option<Effect>, ValidationError> {
        if self.read_only && action.is_mutation() {
            return Err(ValidationError::ReadOnly);
        }
        debug!(?action, state = ?self.state, "applying action");

        match action {
            Action::Load => {
                self.load_state = LoadState::Loading;
                Ok(Some(Effect::Load))
            }
            Action::Select(id) => {
                if self.find_task(&id).is_none() {
                    return Err(ValidationError::UnknownTask(id));
                }
                if self.state.task_id() != Some(&id) || self.editor.is_none() {
                    self.editor = None;
                    self.state = EditState::Selected(id);
                }
                Ok(None)
            }
            Action::Deselect => {
                self.editor = None;
                self.state = EditState::Idle;
                Ok(None)
            }
            Action::SetFilter(filter) => {
                self.filter = filter;
                self.drop_hidden_selection();
                Ok(None)
            }
            Action::SetScale(scale) => {
                self.scale = scale;
                Ok(None)
            }
            Action::CreateDraft { title, start, due } => self.create_draft(title, start, due),
            Action::Drag {
                id,
                kind,
                day_delta,
            } => self.drag(id, kind, day_delta),
            Action::OpenEditor => self.open_editor(),
            Action::Save(form) => self.save(form),
            Action::Cancel => {
                if let EditState::Editing(id) = self.state.clone() {
                    self.editor = None;
                    if self.is_draft(&id) {
                        debug!(%id, "discarding draft");
                        self.discard_draft(&id);
                        self.state = EditState::Idle;
                    } else {
                        self.state = EditState::Selected(id);
                    }
                }
                Ok(None)
            }
            Action::Delete(id) => self.delete(id),
            Action::AddDependency { from, to } => self.add_dependency(from, to),
            Action::RemoveDependency { from, to } => self.remove_dependency(from, to),
            Action::SetProgress { id, progress } => self.set_progress(id, progress),
            Action::DismissBanner => {
                self.banner = None;
                Ok(None)
            }
        }
    }

    fn find_task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().chain(&self.drafts).find(|t| &t.id == id)
    }

    fn is_draft(&self, id: &TaskId) -> bool {
        self.drafts.iter().any(|t| &t.id == id)
    }

    fn stored_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| &t.id == id)
    }

    fn draft_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.drafts.iter_mut().find(|t| &t.id == id)
    }

    fn discard_draft(&mut self, id: &TaskId) {
        self.drafts.retain(|t| &t.id != id);
        self.draft_edges.retain(|e| &e.from != id && &e.to != id);
        for draft in &mut self.drafts {
            draft.dependencies.retain(|d| d != id);
        }
    }

    fn drop_hidden_selection(&mut self) {
        let hidden = match self.state.task_id() {
            Some(id) => match self.find_task(id) {
                Some(task) => !self.filter.matches(task),
                None => !self.is_draft(id),
            },
            None => false,
        };
        if hidden {
            debug!("selection hidden by filter");
            self.state = EditState::Idle;
            self.editor = None;
        }
    }

    fn create_draft(
        &mut self,
        title: String,
        start: NaiveDate,
        due: NaiveDate,
    ) -> Result<Option<Effect>, ValidationError> {
        if start > due {
            return Err(ValidationError::InvertedDates {
                start: dates::to_iso_date(start),
                due: dates::to_iso_date(due),
            });
        }
        let title = match title.trim() {
            "" => "New Task".to_string(),
            t => t.to_string(),
        };
        let mut draft = Task::new(TaskId::new_draft(), title, start, due);
        draft.assigned_to = self.members.default_assignee(self.current_user.as_deref());
        debug!(id = %draft.id, "draft created");

        self.editor = Some(EditorForm::from_task(&draft, true));
        self.state = EditState::Editing(draft.id.clone());
        self.drafts.push(draft);
        Ok(None)
    }

    fn drag(
        &mut self,
        id: TaskId,
        kind: DragKind,
        day_delta: i64,
    ) -> Result<Option<Effect>, ValidationError> {
        let task = self
            .find_task(&id)
            .ok_or_else(|| ValidationError::UnknownTask(id.clone()))?;
        let Schedule::Scheduled { start, due } = task.schedule else {
            return Ok(None);
        };
        let (new_start, new_due) = match kind {
            DragKind::Move => (
                dates::add_days(start, day_delta),
                dates::add_days(due, day_delta),
            ),
            DragKind::ResizeStart => (dates::add_days(start, day_delta).min(due), due),
            DragKind::ResizeEnd => (start, dates::add_days(due, day_delta).max(start)),
        };
        if (new_start, new_due) == (start, due) {
            return Ok(None);
        }

        if !matches!(self.state, EditState::Editing(_)) {
            self.state = EditState::Selected(id.clone());
        }
        let patch = TaskPatch::dates(new_start, new_due);

        if self.is_draft(&id) {
            if let Some(draft) = self.draft_mut(&id) {
                patch.apply_to(draft);
            }
            if let Some(form) = self.editor.as_mut().filter(|f| f.task_id == id) {
                form.start = Some(new_start);
                form.due = Some(new_due);
            }
            return Ok(None);
        }

        if let Some(task) = self.stored_mut(&id) {
            patch.apply_to(task);
        }
        Ok(Some(Effect::Update {
            id,
            patch,
            kind: UpdateKind::Drag,
        }))
    }

    fn open_editor(&mut self) -> Result<Option<Effect>, ValidationError> {
        let id = match &self.state {
            EditState::Idle => return Err(ValidationError::NoSelection),
            EditState::Editing(_) => return Ok(None),
            EditState::Selected(id) => id.clone(),
        };
        let task = self
            .find_task(&id)
            .ok_or_else(|| ValidationError::UnknownTask(id.clone()))?;
        self.editor = Some(EditorForm::from_task(task, self.is_draft(&id)));
        self.state = EditState::Editing(id);
        Ok(None)
    }

    fn save(&mut self, form: EditorForm) -> Result<Option<Effect>, ValidationError> {
        match &self.state {
            EditState::Editing(id) if *id == form.task_id => {}
            _ => return Err(ValidationError::EditorClosed),
        }
        let id = form.task_id.clone();

        if form.is_draft {
            if !self.is_draft(&id) {
                return Err(ValidationError::UnknownTask(id));
            }
            let valid = form.validate(None, &self.members, self.current_user.as_deref())?;
            let task = form.to_new_task(&valid);
            if let Some(draft) = self.draft_mut(&id) {
                form.apply_to(draft, &valid);
            }
            self.editor = None;
            self.state = EditState::Selected(id.clone());
            return Ok(Some(Effect::Create { draft_id: id, task }));
        }

        let original = self
            .tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| ValidationError::UnknownTask(id.clone()))?;
        let valid = form.validate(
            Some(original),
            &self.members,
            self.current_user.as_deref(),
        )?;
        let patch = form.diff(original, &valid);

        self.editor = None;
        self.state = EditState::Selected(id.clone());
        if patch.is_empty() {
            debug!(%id, "nothing changed");
            return Ok(None);
        }
        if let Some(task) = self.stored_mut(&id) {
            form.apply_to(task, &valid);
        }
        Ok(Some(Effect::Update {
            id,
            patch,
            kind: UpdateKind::Save,
        }))
    }

    fn delete(&mut self, id: TaskId) -> Result<Option<Effect>, ValidationError> {
        if self.find_task(&id).is_none() {
            return Err(ValidationError::UnknownTask(id));
        }
        if self.state.task_id() == Some(&id) {
            self.state = EditState::Idle;
            self.editor = None;
        }
        if self.is_draft(&id) {
            self.discard_draft(&id);
            return Ok(None);
        }
        self.tasks.retain(|t| t.id != id);
        for task in &mut self.tasks {
            task.dependencies.retain(|d| d != &id);
        }
        self.draft_edges.retain(|e| e.from != id && e.to != id);
        Ok(Some(Effect::Delete(id)))
    }

    fn add_dependency(&mut self, from: TaskId, to: TaskId) -> Result<Option<Effect>, ValidationError> {
        let all = self.all_tasks();
        let graph = DependencyGraph::new(&all);
        for id in [&from, &to] {
            if !graph.contains(id) {
                return Err(ValidationError::UnknownTask(id.clone()));
            }
        }
        if let Err(e) = graph.check_edge(&from, &to) {
            warn!(%from, %to, reason = %e, "dependency rejected");
            return Err(e);
        }

        if self.is_draft(&from) || self.is_draft(&to) {
            debug!(%from, %to, "holding dependency until draft is saved");
            self.draft_edges.push(DependencyEdge { from, to });
            return Ok(None);
        }
        if let Some(task) = self.stored_mut(&to) {
            task.dependencies.push(from.clone());
        }
        Ok(Some(Effect::AddDependency { from, to }))
    }

    fn remove_dependency(
        &mut self,
        from: TaskId,
        to: TaskId,
    ) -> Result<Option<Effect>, ValidationError> {
        let pending = self.draft_edges.len();
        self.draft_edges.retain(|e| !(e.from == from && e.to == to));
        if self.draft_edges.len() != pending || self.is_draft(&to) || self.is_draft(&from) {
            if let Some(draft) = self.draft_mut(&to) {
                draft.dependencies.retain(|d| d != &from);
            }
            return Ok(None);
        }
        let task = self
            .stored_mut(&to)
            .ok_or_else(|| ValidationError::UnknownTask(to.clone()))?;
        task.dependencies.retain(|d| d != &from);
        Ok(Some(Effect::RemoveDependency { from, to }))
    }

    fn set_progress(&mut self, id: TaskId, progress: u8) -> Result<Option<Effect>, ValidationError> {
        let progress = progress.min(100);
        if self.is_draft(&id) {
            if let Some(draft) = self.draft_mut(&id) {
                draft.progress = progress;
            }
            if let Some(form) = self.editor.as_mut().filter(|f| f.task_id == id) {
                form.progress = progress;
            }
            return Ok(None);
        }
        let task = self
            .stored_mut(&id)
            .ok_or_else(|| ValidationError::UnknownTask(id.clone()))?;
        if task.progress == progress {
            return Ok(None);
        }
        task.progress = progress;
        Ok(Some(Effect::Update {
            id,
            patch: TaskPatch::progress(progress),
            kind: UpdateKind::Progress,
        }))
    }

    /// Perform the store side of an applied action.
    pub async fn run(&mut self, effect: Effect) {
        match effect {
            Effect::Load => self.load().await,
            Effect::Create { draft_id, task } => {
                match self.store.create_task(&self.project_id, &task).await {
                    Ok(id) => {
                        info!(%id, title = %task.title, "task created");
                        self.promote_draft(&draft_id, &id);
                        self.banner = Some(Banner::success(messages::CREATED));
                        self.flush_draft_edges().await;
                    }
                    Err(e) => self.fail(&e, messages::CREATE_FAILED),
                }
                self.resync().await;
            }
            Effect::Update { id, patch, kind } => {
                match self.store.update_task(&self.project_id, &id, &patch).await {
                    Ok(()) => {
                        info!(%id, ?kind, "task updated");
                        self.banner = Some(Banner::success(kind.success()));
                        if kind == UpdateKind::Save {
                            self.resync().await;
                        }
                    }
                    Err(e) => {
                        self.fail(&e, kind.failure());
                        self.resync().await;
                    }
                }
            }
            Effect::Delete(id) => {
                match self.store.delete_task(&self.project_id, &id).await {
                    Ok(()) => {
                        info!(%id, "task deleted");
                        self.banner = Some(Banner::success(messages::DELETED));
                    }
                    Err(e) => self.fail(&e, messages::DELETE_FAILED),
                }
                self.resync().await;
            }
            Effect::AddDependency { from, to } => {
                match self.store.add_dependency(&self.project_id, &to, &from).await {
                    Ok(deps) => {
                        info!(%from, %to, "dependency added");
                        self.set_dependencies(&to, deps);
                        self.banner = Some(Banner::success(messages::DEPENDENCY_ADDED));
                    }
                    Err(e) => {
                        self.fail(&e, messages::ADD_DEPENDENCY_FAILED);
                        self.resync().await;
                    }
                }
            }
            Effect::RemoveDependency { from, to } => {
                match self.store.remove_dependency(&self.project_id, &to, &from).await {
                    Ok(deps) => {
                        info!(%from, %to, "dependency removed");
                        self.set_dependencies(&to, deps);
                        self.banner = Some(Banner::success(messages::DEPENDENCY_REMOVED));
                    }
                    Err(e) => {
                        self.fail(&e, messages::REMOVE_DEPENDENCY_FAILED);
                        self.resync().await;
                    }
                }
            }
        }
    }

    async fn load(&mut self) {
        match self.fetch_all().await {
            Ok(()) => {
                info!(project = %self.project_id, tasks = self.tasks.len(), "project loaded");
                projection::report_unplotted(&self.tasks);
                if let Some(cycle) = DependencyGraph::new(&self.tasks).find_cycle() {
                    warn!(?cycle, "stored dependencies contain a cycle");
                }
                self.load_state = LoadState::Ready;
                self.reconcile();
            }
            Err(e) => {
                error!(project = %self.project_id, error = %e, "failed to load project");
                self.load_state = LoadState::Failed(e.user_message(messages::LOAD_FAILED));
            }
        }
    }

    async fn fetch_all(&mut self) -> Result<(), StoreError> {
        let project = self.directory.get_project(&self.project_id).await?;
        let users = self.directory.list_users().await?;
        let tasks = self.store.list_tasks(&self.project_id).await?;

        self.read_only = !project.can_edit(self.current_user.as_deref());
        if self.read_only {
            info!(user = ?self.current_user, "timeline is read-only for this user");
        }
        self.members = MemberDirectory::resolve(&project, &users);
        self.project = Some(project);
        self.tasks = tasks;
        Ok(())
    }

    /// Replace the local list with the store's. A failed fetch keeps the
    /// last good list and raises a banner.
    async fn resync(&mut self) {
        match self.store.list_tasks(&self.project_id).await {
            Ok(tasks) => {
                debug!(tasks = tasks.len(), "resynced");
                self.tasks = tasks;
                self.reconcile();
            }
            Err(e) => self.fail(&e, messages::REFRESH_FAILED),
        }
    }

    /// Drop selection and pending links that point at tasks which no longer
    /// exist.
    fn reconcile(&mut self) {
        let known = |id: &TaskId| {
            self.tasks.iter().any(|t| &t.id == id) || self.drafts.iter().any(|t| &t.id == id)
        };
        self.draft_edges.retain(|e| known(&e.from) && known(&e.to));
        if let Some(id) = self.state.task_id() {
            if !known(id) {
                debug!(%id, "selected task is gone");
                self.state = EditState::Idle;
                self.editor = None;
            }
        }
        self.drop_hidden_selection();
    }

    fn fail(&mut self, err: &StoreError, fallback: &str) {
        error!(error = %err, "{fallback}");
        self.banner = Some(Banner::error(err.user_message(fallback)));
    }

    fn set_dependencies(&mut self, id: &TaskId, deps: Vec<TaskId>) {
        if let Some(task) = self.stored_mut(id) {
            task.dependencies = deps;
        }
    }

    /// Swap a draft's temporary ID for the store-assigned one everywhere it
    /// appears and move it to the stored list.
    fn promote_draft(&mut self, draft_id: &TaskId, id: &TaskId) {
        let Some(pos) = self.drafts.iter().position(|t| &t.id == draft_id) else {
            return;
        };
        let mut task = self.drafts.remove(pos);
        task.id = id.clone();
        self.tasks.push(task);

        let rewrite = |t: &mut TaskId| {
            if t == draft_id {
                *t = id.clone();
            }
        };
        for edge in &mut self.draft_edges {
            rewrite(&mut edge.from);
            rewrite(&mut edge.to);
        }
        for task in self.tasks.iter_mut().chain(self.drafts.iter_mut()) {
            task.dependencies.iter_mut().for_each(rewrite);
        }
        match &mut self.state {
            EditState::Selected(t) | EditState::Editing(t) => rewrite(t),
            EditState::Idle => {}
        }
        if let Some(form) = self.editor.as_mut() {
            if &form.task_id == draft_id {
                form.task_id = id.clone();
                form.is_draft = false;
            }
        }
        debug!(%draft_id, %id, "draft promoted");
    }

    /// Persist pending links whose ends are both stored now.
    async fn flush_draft_edges(&mut self) {
        let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.draft_edges)
            .into_iter()
            .partition(|e| !self.is_draft(&e.from) && !self.is_draft(&e.to));
        self.draft_edges = pending;

        for edge in ready {
            match self
                .store
                .add_dependency(&self.project_id, &edge.to, &edge.from)
                .await
            {
                Ok(deps) => {
                    info!(from = %edge.from, to = %edge.to, "dependency added");
                    self.set_dependencies(&edge.to, deps);
                }
                Err(e) => self.fail(&e, messages::ADD_DEPENDENCY_FAILED),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, User};
    use crate::store::InMemoryStore;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn fixture() -> (InMemoryStore, EditController) {
        let mut project = Project::new("p1", "Launch");
        project.owner = Some("u1".into());
        project.members = vec!["u1".into()];
        let users = vec![User {
            id: "u1".into(),
            name: "Ada".into(),
            email: String::new(),
        }];
        let mut a = Task::new(TaskId::from("a"), "A", d(4, 1), d(4, 10));
        a.assigned_to = Some("u1".into());
        let b = Task::new(TaskId::from("b"), "B", d(4, 11), d(4, 12));
        let store = InMemoryStore::with_project(project, users, vec![a, b]);
        let controller = EditController::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            "p1",
            Some("u1".into()),
            TimelineScale::Week,
        );
        (store, controller)
    }

    #[tokio::test]
    async fn select_then_edit_then_cancel() {
        let (_, mut c) = fixture();
        c.dispatch(Action::Load).await.unwrap();
        assert_eq!(c.load_state(), &LoadState::Ready);

        assert_eq!(c.apply(Action::OpenEditor), Err(ValidationError::NoSelection));
        c.apply(Action::Select(TaskId::from("a"))).unwrap();
        c.apply(Action::OpenEditor).unwrap();
        assert_eq!(c.state(), &EditState::Editing(TaskId::from("a")));
        assert!(!c.editor().unwrap().is_draft);
        c.apply(Action::Cancel).unwrap();
        assert_eq!(c.state(), &EditState::Selected(TaskId::from("a")));
        c.apply(Action::Cancel).unwrap();
        assert_eq!(c.state(), &EditState::Selected(TaskId::from("a")));
    }

    #[tokio::test]
    async fn resize_start_never_passes_due() {
        let (_, mut c) = fixture();
        c.dispatch(Action::Load).await.unwrap();
        let effect = c
            .apply(Action::Drag {
                id: TaskId::from("b"),
                kind: DragKind::ResizeStart,
                day_delta: 5,
            })
            .unwrap();
        assert_eq!(
            effect,
            Some(Effect::Update {
                id: TaskId::from("b"),
                patch: TaskPatch::dates(d(4, 12), d(4, 12)),
                kind: UpdateKind::Drag,
            })
        );
    }

    #[tokio::test]
    async fn cancelling_a_new_draft_discards_it() {
        let (store, mut c) = fixture();
        c.dispatch(Action::Load).await.unwrap();
        c.apply(Action::CreateDraft {
            title: String::new(),
            start: d(5, 1),
            due: d(5, 2),
        })
        .unwrap();
        assert_eq!(c.drafts().len(), 1);
        assert_eq!(c.drafts()[0].title, "New Task");
        assert_eq!(c.drafts()[0].assigned_to.as_deref(), Some("u1"));
        c.apply(Action::Cancel).unwrap();
        assert!(c.drafts().is_empty());
        assert_eq!(c.state(), &EditState::Idle);
        assert_eq!(store.count(crate::store::StoreOp::CreateTask).await, 0);
    }

    #[tokio::test]
    async fn filter_hides_selection() {
        let (_, mut c) = fixture();
        c.dispatch(Action::Load).await.unwrap();
        c.apply(Action::Select(TaskId::from("b"))).unwrap();
        c.apply(Action::SetFilter(TimelineFilter {
            assignee: projection::AssigneeFilter::Member("u1".into()),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(c.state(), &EditState::Idle);
    }
}
