use std::sync::Arc;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use teamworks_gantt::controller::{DragKind, EditState, LoadState};
use teamworks_gantt::model::{Project, Schedule, Task, TaskId, TimelineScale, User};
use teamworks_gantt::store::{InMemoryStore, StoreCall, StoreOp};
use teamworks_gantt::{Action, EditController, StoreError, ValidationError};

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn users() -> Vec<User> {
    vec![
        User {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
        },
        User {
            id: "u2".into(),
            name: "Grace".into(),
            email: "grace@example.com".into(),
        },
    ]
}

fn project() -> Project {
    let mut project = Project::new("p1", "Launch");
    project.owner = Some("u1".into());
    project.members = vec!["u1".into(), "u2".into()];
    project
}

fn task(id: &str, start: NaiveDate, due: NaiveDate) -> Task {
    let mut task = Task::new(TaskId::from(id), id.to_uppercase(), start, due);
    task.assigned_to = Some("u1".into());
    task
}

fn controller(store: &InMemoryStore, user: &str) -> EditController {
    EditController::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        "p1",
        Some(user.into()),
        TimelineScale::Week,
    )
}

async fn loaded(tasks: Vec<Task>) -> (InMemoryStore, EditController) {
    let store = InMemoryStore::with_project(project(), users(), tasks);
    let mut c = controller(&store, "u1");
    c.dispatch(Action::Load).await.unwrap();
    assert_eq!(c.load_state(), &LoadState::Ready);
    store.clear_calls().await;
    (store, c)
}

#[tokio::test]
async fn saving_a_draft_creates_the_task_and_swaps_its_id() {
    let (store, mut c) = loaded(vec![task("a", d(2, 1), d(2, 5))]).await;

    c.dispatch(Action::CreateDraft {
        title: "Spec Review".into(),
        start: d(3, 1),
        due: d(3, 1),
    })
    .await
    .unwrap();
    let draft_id = c.drafts()[0].id.clone();
    assert_eq!(c.projection().bar(&draft_id).unwrap().duration_days, 1);

    let mut form = c.editor().unwrap().clone();
    assert!(form.is_draft);
    form.due = Some(d(3, 5));
    c.dispatch(Action::Save(form)).await.unwrap();

    let creates: Vec<_> = store
        .calls()
        .await
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::CreateTask(new) => Some(new),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].title, "Spec Review");
    assert_eq!(creates[0].start_date, "2024-03-01");
    assert_eq!(creates[0].due_date, "2024-03-05");
    assert_eq!(creates[0].assigned_to, "u1");

    assert!(c.drafts().is_empty());
    let created = c
        .stored_tasks()
        .iter()
        .find(|t| t.title == "Spec Review")
        .unwrap();
    assert!(created.id.as_str().starts_with("task-"));
    assert_eq!(c.state(), &EditState::Selected(created.id.clone()));
    assert!(c.all_tasks().iter().all(|t| t.id != draft_id));
    assert_eq!(c.projection().bar(&created.id).unwrap().duration_days, 5);
    assert!(!c.banner().unwrap().is_error());
}

#[tokio::test]
async fn failed_drag_resyncs_to_the_stored_dates() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 10))]).await;
    let a = TaskId::from("a");

    c.dispatch(Action::Select(a.clone())).await.unwrap();
    store
        .fail_next(StoreOp::UpdateTask, StoreError::Transport("connection reset".into()))
        .await;

    let effect = c
        .apply(Action::Drag {
            id: a.clone(),
            kind: DragKind::ResizeEnd,
            day_delta: 5,
        })
        .unwrap();
    assert_eq!(c.projection().bar(&a).unwrap().end, d(4, 15));
    c.run(effect.unwrap()).await;

    assert_eq!(store.count(StoreOp::UpdateTask).await, 1);
    assert_eq!(store.count(StoreOp::ListTasks).await, 1);
    let bar = c.projection().bar(&a).cloned().unwrap();
    assert_eq!(bar.end, d(4, 10));
    assert_eq!(bar.duration_days, 10);
    assert!(c.banner().unwrap().is_error());
}

#[tokio::test]
async fn successful_drag_keeps_the_optimistic_dates() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 10))]).await;
    let a = TaskId::from("a");

    c.dispatch(Action::Drag {
        id: a.clone(),
        kind: DragKind::Move,
        day_delta: -3,
    })
    .await
    .unwrap();

    assert_eq!(store.count(StoreOp::ListTasks).await, 0);
    assert_eq!(
        c.stored_tasks()[0].schedule,
        Schedule::Scheduled {
            start: d(3, 29),
            due: d(4, 7)
        }
    );
    let stored = store.snapshot().await.list_tasks("p1").unwrap();
    assert_eq!(stored[0].schedule, c.stored_tasks()[0].schedule);
    assert_eq!(c.state(), &EditState::Selected(a));
}

#[tokio::test]
async fn read_only_users_cannot_mutate() {
    let store = InMemoryStore::with_project(project(), users(), vec![task("a", d(4, 1), d(4, 2))]);
    let mut c = controller(&store, "guest");
    c.dispatch(Action::Load).await.unwrap();
    assert!(c.is_read_only());
    store.clear_calls().await;

    let a = TaskId::from("a");
    c.dispatch(Action::Select(a.clone())).await.unwrap();
    let refused = c
        .dispatch(Action::Drag {
            id: a.clone(),
            kind: DragKind::Move,
            day_delta: 1,
        })
        .await;
    assert_eq!(refused, Err(ValidationError::ReadOnly));
    assert_eq!(
        c.dispatch(Action::CreateDraft {
            title: "x".into(),
            start: d(4, 1),
            due: d(4, 1),
        })
        .await,
        Err(ValidationError::ReadOnly)
    );
    assert_eq!(c.dispatch(Action::Delete(a)).await, Err(ValidationError::ReadOnly));

    assert!(store.calls().await.is_empty());
    assert!(c.view().inline_error.is_some());
}

#[tokio::test]
async fn cyclic_links_are_refused_locally() {
    let mut a = task("a", d(4, 1), d(4, 2));
    let mut b = task("b", d(4, 3), d(4, 4));
    let c_task = task("c", d(4, 5), d(4, 6));
    a.dependencies = vec![TaskId::from("b")];
    b.dependencies = vec![TaskId::from("c")];
    let (store, mut c) = loaded(vec![a, b, c_task]).await;

    let refused = c
        .dispatch(Action::AddDependency {
            from: TaskId::from("a"),
            to: TaskId::from("c"),
        })
        .await;
    assert!(matches!(refused, Err(ValidationError::Cycle { .. })));
    assert_eq!(
        c.dispatch(Action::AddDependency {
            from: TaskId::from("b"),
            to: TaskId::from("b"),
        })
        .await,
        Err(ValidationError::SelfDependency)
    );
    assert_eq!(store.count(StoreOp::AddDependency).await, 0);
}

#[tokio::test]
async fn added_link_uses_the_returned_list() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2)), task("b", d(4, 3), d(4, 4))]).await;

    c.dispatch(Action::AddDependency {
        from: TaskId::from("a"),
        to: TaskId::from("b"),
    })
    .await
    .unwrap();

    assert_eq!(
        store.calls().await,
        vec![StoreCall::AddDependency {
            task: TaskId::from("b"),
            dependency: TaskId::from("a"),
        }]
    );
    let b = c.stored_tasks().iter().find(|t| t.id.as_str() == "b").unwrap();
    assert_eq!(b.dependencies, vec![TaskId::from("a")]);
    let edges = c.projection().edges;
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].from, TaskId::from("a"));
    assert_eq!(edges[0].to, TaskId::from("b"));
}

#[tokio::test]
async fn failed_link_changes_resync() {
    let mut b = task("b", d(4, 3), d(4, 4));
    b.dependencies = vec![TaskId::from("a")];
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2)), b]).await;

    store
        .fail_next(
            StoreOp::RemoveDependency,
            StoreError::Status {
                status: 403,
                message: Some("Not allowed".into()),
            },
        )
        .await;
    c.dispatch(Action::RemoveDependency {
        from: TaskId::from("a"),
        to: TaskId::from("b"),
    })
    .await
    .unwrap();

    assert_eq!(store.count(StoreOp::ListTasks).await, 1);
    assert_eq!(c.projection().edges.len(), 1);
    let banner = c.banner().unwrap();
    assert!(banner.is_error());
    assert_eq!(banner.message, "Not allowed");

    store
        .fail_next(StoreOp::AddDependency, StoreError::Transport("timeout".into()))
        .await;
    c.dispatch(Action::AddDependency {
        from: TaskId::from("b"),
        to: TaskId::from("a"),
    })
    .await
    .unwrap_err();
    assert_eq!(store.count(StoreOp::AddDependency).await, 0);
}

#[tokio::test]
async fn links_to_a_draft_are_sent_after_it_is_created() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2))]).await;

    c.dispatch(Action::CreateDraft {
        title: "Follow-up".into(),
        start: d(4, 3),
        due: d(4, 4),
    })
    .await
    .unwrap();
    let draft_id = c.drafts()[0].id.clone();
    let form = c.editor().unwrap().clone();

    c.dispatch(Action::AddDependency {
        from: TaskId::from("a"),
        to: draft_id.clone(),
    })
    .await
    .unwrap();
    assert_eq!(store.count(StoreOp::AddDependency).await, 0);
    assert_eq!(c.projection().edges.len(), 1);

    c.dispatch(Action::Save(form)).await.unwrap();

    let created = c
        .stored_tasks()
        .iter()
        .find(|t| t.title == "Follow-up")
        .cloned()
        .unwrap();
    assert!(store.calls().await.contains(&StoreCall::AddDependency {
        task: created.id.clone(),
        dependency: TaskId::from("a"),
    }));
    assert_eq!(created.dependencies, vec![TaskId::from("a")]);
    let edges = c.projection().edges;
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].to, created.id);
}

#[tokio::test]
async fn load_failure_can_be_retried() {
    let store = InMemoryStore::with_project(project(), users(), vec![task("a", d(4, 1), d(4, 2))]);
    store
        .fail_next(StoreOp::ListTasks, StoreError::Transport("offline".into()))
        .await;
    let mut c = controller(&store, "u1");

    c.dispatch(Action::Load).await.unwrap();
    assert!(matches!(c.load_state(), LoadState::Failed(msg) if !msg.is_empty()));
    assert!(c.is_read_only());
    assert!(c.stored_tasks().is_empty());

    c.dispatch(Action::Load).await.unwrap();
    assert_eq!(c.load_state(), &LoadState::Ready);
    assert_eq!(c.stored_tasks().len(), 1);
    assert!(!c.is_read_only());
}

#[tokio::test]
async fn task_without_due_date_appears_once_scheduled() {
    let mut loose = task("loose", d(4, 1), d(4, 1));
    loose.schedule = Schedule::Unscheduled;
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2)), loose]).await;
    let id = TaskId::from("loose");

    assert!(c.projection().bar(&id).is_none());

    c.dispatch(Action::Select(id.clone())).await.unwrap();
    c.dispatch(Action::OpenEditor).await.unwrap();
    let mut form = c.editor().unwrap().clone();
    form.start = Some(d(4, 20));
    form.due = Some(d(4, 22));
    c.dispatch(Action::Save(form)).await.unwrap();

    assert_eq!(store.count(StoreOp::UpdateTask).await, 1);
    assert_eq!(store.count(StoreOp::ListTasks).await, 1);
    let bar = c.projection().bar(&id).cloned().unwrap();
    assert_eq!((bar.start, bar.end, bar.duration_days), (d(4, 20), d(4, 22), 3));
}

#[tokio::test]
async fn invalid_forms_never_reach_the_store() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2))]).await;
    c.dispatch(Action::Select(TaskId::from("a"))).await.unwrap();
    c.dispatch(Action::OpenEditor).await.unwrap();

    let mut form = c.editor().unwrap().clone();
    form.start = Some(d(4, 9));
    form.due = Some(d(4, 2));
    let err = c.dispatch(Action::Save(form.clone())).await.unwrap_err();
    assert!(matches!(err, ValidationError::InvertedDates { .. }));
    assert_eq!(c.state(), &EditState::Editing(TaskId::from("a")));

    form.start = Some(d(4, 1));
    form.title = "   ".into();
    assert_eq!(
        c.dispatch(Action::Save(form.clone())).await,
        Err(ValidationError::EmptyTitle)
    );

    form.title = "A".into();
    form.assignee = Some("stranger".into());
    assert!(matches!(
        c.dispatch(Action::Save(form)).await,
        Err(ValidationError::UnresolvedAssignee(_))
    ));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn deleting_a_task_drops_links_to_it() {
    let mut b = task("b", d(4, 3), d(4, 4));
    b.dependencies = vec![TaskId::from("a")];
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2)), b]).await;

    c.dispatch(Action::Select(TaskId::from("a"))).await.unwrap();
    c.dispatch(Action::Delete(TaskId::from("a"))).await.unwrap();

    assert_eq!(store.calls().await[0], StoreCall::DeleteTask(TaskId::from("a")));
    assert_eq!(c.state(), &EditState::Idle);
    assert_eq!(c.stored_tasks().len(), 1);
    assert!(c.stored_tasks()[0].dependencies.is_empty());
    assert!(c.projection().edges.is_empty());
}

#[tokio::test]
async fn progress_is_clamped_and_sent_as_a_patch() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2))]).await;

    c.dispatch(Action::SetProgress {
        id: TaskId::from("a"),
        progress: 140,
    })
    .await
    .unwrap();

    match &store.calls().await[0] {
        StoreCall::UpdateTask(id, patch) => {
            assert_eq!(id, &TaskId::from("a"));
            assert_eq!(patch.progress, Some(100));
            assert_eq!(patch.start_date, None);
        }
        other => panic!("unexpected call {other:?}"),
    }
    assert_eq!(c.projection().bars[0].progress, 1.0);
}

#[tokio::test]
async fn editing_only_the_notes_is_saved() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2))]).await;
    c.dispatch(Action::Select(TaskId::from("a"))).await.unwrap();
    c.dispatch(Action::OpenEditor).await.unwrap();

    let mut form = c.editor().unwrap().clone();
    form.description = "new notes".into();
    c.dispatch(Action::Save(form)).await.unwrap();

    match &store.calls().await[0] {
        StoreCall::UpdateTask(id, patch) => {
            assert_eq!(id, &TaskId::from("a"));
            assert_eq!(patch.description.as_deref(), Some("new notes"));
            assert_eq!(patch.start_date, None);
        }
        other => panic!("unexpected call {other:?}"),
    }
    let stored = store.snapshot().await.list_tasks("p1").unwrap();
    assert_eq!(stored[0].description, "new notes");
    assert_eq!(c.stored_tasks()[0].description, "new notes");
}

#[tokio::test]
async fn dragging_an_open_draft_reaches_the_create_request() {
    let (store, mut c) = loaded(vec![task("a", d(2, 1), d(2, 5))]).await;
    c.dispatch(Action::CreateDraft {
        title: "Spec Review".into(),
        start: d(3, 1),
        due: d(3, 1),
    })
    .await
    .unwrap();
    let draft_id = c.drafts()[0].id.clone();
    let seed = c.editor().unwrap().clone();
    let mut local = seed.clone();
    local.title = "Spec Review (final)".into();

    c.dispatch(Action::Drag {
        id: draft_id.clone(),
        kind: DragKind::Move,
        day_delta: 3,
    })
    .await
    .unwrap();
    assert_eq!(c.state(), &EditState::Editing(draft_id));
    local.rebase(&seed, c.editor().unwrap());
    c.dispatch(Action::Save(local)).await.unwrap();

    let created = store
        .calls()
        .await
        .into_iter()
        .find_map(|call| match call {
            StoreCall::CreateTask(new) => Some(new),
            _ => None,
        })
        .unwrap();
    assert_eq!(created.title, "Spec Review (final)");
    assert_eq!(created.start_date, "2024-03-04");
    assert_eq!(created.due_date, "2024-03-04");
}

#[tokio::test]
async fn failed_create_keeps_the_draft() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2))]).await;
    c.dispatch(Action::CreateDraft {
        title: "Spec Review".into(),
        start: d(3, 1),
        due: d(3, 5),
    })
    .await
    .unwrap();
    let draft_id = c.drafts()[0].id.clone();
    let form = c.editor().unwrap().clone();

    store
        .fail_next(
            StoreOp::CreateTask,
            StoreError::Status {
                status: 500,
                message: None,
            },
        )
        .await;
    c.dispatch(Action::Save(form)).await.unwrap();

    assert_eq!(store.count(StoreOp::CreateTask).await, 1);
    assert_eq!(store.count(StoreOp::ListTasks).await, 1);
    assert_eq!(c.drafts().len(), 1);
    assert_eq!(c.drafts()[0].id, draft_id);
    assert_eq!(c.stored_tasks().len(), 1);
    assert!(c.projection().bar(&draft_id).is_some());
    let banner = c.banner().unwrap();
    assert!(banner.is_error());
    assert_eq!(banner.message, "Failed to create task.");
}

#[tokio::test]
async fn failed_delete_brings_the_task_back() {
    let mut b = task("b", d(4, 3), d(4, 4));
    b.dependencies = vec![TaskId::from("a")];
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2)), b]).await;

    store
        .fail_next(StoreOp::DeleteTask, StoreError::Transport("offline".into()))
        .await;
    c.dispatch(Action::Delete(TaskId::from("a"))).await.unwrap();

    assert_eq!(store.count(StoreOp::ListTasks).await, 1);
    assert_eq!(c.stored_tasks().len(), 2);
    let b = c.stored_tasks().iter().find(|t| t.id.as_str() == "b").unwrap();
    assert_eq!(b.dependencies, vec![TaskId::from("a")]);
    assert_eq!(c.projection().edges.len(), 1);
    assert!(c.banner().unwrap().is_error());
}

#[tokio::test]
async fn deleting_an_unknown_task_leaves_the_editor_open() {
    let (store, mut c) = loaded(vec![task("a", d(4, 1), d(4, 2))]).await;
    c.dispatch(Action::Select(TaskId::from("a"))).await.unwrap();
    c.dispatch(Action::OpenEditor).await.unwrap();

    let refused = c.dispatch(Action::Delete(TaskId::from("ghost"))).await;
    assert_eq!(refused, Err(ValidationError::UnknownTask(TaskId::from("ghost"))));
    assert_eq!(c.state(), &EditState::Editing(TaskId::from("a")));
    assert!(c.editor().is_some());
    assert!(store.calls().await.is_empty());
}
