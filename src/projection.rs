//! Pure derivation of the renderable chart model from a task snapshot, the
//! active filters and the zoom scale.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::warn;

use crate::graph::DependencyGraph;
use crate::model::dates;
use crate::model::{
    MemberDirectory, MemberId, Schedule, Task, TaskId, TaskPriority, TaskStatus, TimelineBounds,
    TimelineScale,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Is(TaskStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssigneeFilter {
    #[default]
    All,
    Unassigned,
    Member(MemberId),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimelineFilter {
    pub status: StatusFilter,
    pub assignee: AssigneeFilter,
}

impl TimelineFilter {
    pub fn matches(&self, task: &Task) -> bool {
        let status_ok = match &self.status {
            StatusFilter::All => true,
            StatusFilter::Is(status) => &task.status == status,
        };
        let assignee_ok = match &self.assignee {
            AssigneeFilter::All => true,
            AssigneeFilter::Unassigned => task.assigned_to.is_none(),
            AssigneeFilter::Member(id) => task.assigned_to.as_ref() == Some(id),
        };
        status_ok && assignee_ok
    }
}

/// A task as drawn on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineBar {
    pub id: TaskId,
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: i64,
    /// Progress as a 0..=1 fraction.
    pub progress: f32,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

/// Precedence link: `to` depends on `from`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyEdge {
    pub from: TaskId,
    pub to: TaskId,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimelineProjection {
    pub bars: Vec<TimelineBar>,
    pub edges: Vec<DependencyEdge>,
    pub scale: TimelineScale,
    pub bounds: Option<TimelineBounds>,
}

impl TimelineProjection {
    pub fn bar(&self, id: &TaskId) -> Option<&TimelineBar> {
        self.bars.iter().find(|b| &b.id == id)
    }

    pub fn range_label(&self) -> String {
        crate::model::range_label(self.scale, self.bounds)
    }
}

fn to_bar(task: &Task) -> Option<TimelineBar> {
    let Schedule::Scheduled { start, due } = task.schedule else {
        return None;
    };
    Some(TimelineBar {
        id: task.id.clone(),
        label: task.title.clone(),
        start,
        end: due,
        duration_days: dates::duration_days(start, due),
        progress: f32::from(task.progress.min(100)) / 100.0,
        status: task.status.clone(),
        priority: task.priority,
    })
}

/// Project `tasks` onto the timeline. Unscheduled tasks and edges whose
/// predecessor is not plotted are left out; nothing here fails.
pub fn project(tasks: &[Task], filter: &TimelineFilter, scale: TimelineScale) -> TimelineProjection {
    let included: Vec<&Task> = tasks.iter().filter(|t| filter.matches(t)).collect();

    let bars: Vec<TimelineBar> = included.iter().filter_map(|t| to_bar(t)).collect();
    let plotted: HashSet<&TaskId> = bars.iter().map(|b| &b.id).collect();

    let mut edges = Vec::new();
    for task in included.iter().filter(|t| plotted.contains(&t.id)) {
        for dep in &task.dependencies {
            if plotted.contains(dep) && dep != &task.id {
                edges.push(DependencyEdge {
                    from: dep.clone(),
                    to: task.id.clone(),
                });
            }
        }
    }

    let bounds = bars
        .iter()
        .map(|b| b.start)
        .min()
        .zip(bars.iter().map(|b| b.end).max())
        .map(|(min, max)| TimelineBounds { min, max });

    TimelineProjection {
        bars,
        edges,
        scale,
        bounds,
    }
}

/// Log tasks that cannot be plotted. Kept out of [`project`] so the
/// projection stays free of side effects.
pub fn report_unplotted(tasks: &[Task]) {
    for task in tasks.iter().filter(|t| t.schedule == Schedule::Unscheduled) {
        warn!(id = %task.id, title = %task.title, "skipping task without valid dates");
    }
}

/// "All" followed by the distinct statuses present, first seen first.
pub fn status_options(tasks: &[Task]) -> Vec<StatusFilter> {
    let mut out = vec![StatusFilter::All];
    for task in tasks {
        let option = StatusFilter::Is(task.status.clone());
        if !out.contains(&option) {
            out.push(option);
        }
    }
    out
}

/// Assignee filter choices with their display labels.
pub fn assignee_options(tasks: &[Task], members: &MemberDirectory) -> Vec<(AssigneeFilter, String)> {
    let mut out = vec![(AssigneeFilter::All, "All assignees".to_string())];
    for task in tasks {
        let option = match &task.assigned_to {
            Some(id) => AssigneeFilter::Member(id.clone()),
            None => AssigneeFilter::Unassigned,
        };
        if out.iter().any(|(o, _)| o == &option) {
            continue;
        }
        let label = match &option {
            AssigneeFilter::Member(id) => members.display_name(id).to_string(),
            _ => "Unassigned".to_string(),
        };
        out.push((option, label));
    }
    out
}

/// Tasks that may become predecessors of `selected`: not itself, not
/// already a predecessor, and not closing a cycle.
pub fn dependency_candidates<'a>(tasks: &'a [Task], selected: &TaskId) -> Vec<&'a Task> {
    let graph = DependencyGraph::new(tasks);
    tasks
        .iter()
        .filter(|t| graph.check_edge(&t.id, selected).is_ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn task(id: &str, start: Option<NaiveDate>, due: Option<NaiveDate>) -> Task {
        let mut t = Task::new(TaskId::from(id), id, d(1, 1), d(1, 1));
        t.schedule = Schedule::from_parts(start, due);
        t
    }

    #[test]
    fn bars_carry_duration_and_fraction() {
        let mut t = task("a", Some(d(3, 1)), Some(d(3, 7)));
        t.progress = 25;
        let p = project(&[t], &TimelineFilter::default(), TimelineScale::Week);
        assert_eq!(p.bars.len(), 1);
        assert_eq!(p.bars[0].duration_days, 7);
        assert_eq!(p.bars[0].progress, 0.25);
        assert_eq!(p.bounds, Some(TimelineBounds { min: d(3, 1), max: d(3, 7) }));
    }

    #[test]
    fn unscheduled_tasks_are_dropped() {
        let tasks = vec![
            task("a", Some(d(3, 1)), None),
            task("b", None, Some(d(3, 1))),
            task("c", Some(d(3, 1)), Some(d(3, 1))),
        ];
        let p = project(&tasks, &TimelineFilter::default(), TimelineScale::Day);
        let ids: Vec<&str> = p.bars.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
        assert_eq!(p.bars[0].duration_days, 1);
    }

    #[test]
    fn edges_need_both_endpoints_plotted() {
        let mut a = task("a", Some(d(3, 1)), Some(d(3, 2)));
        let b = task("b", Some(d(3, 3)), Some(d(3, 4)));
        let c = task("c", None, None);
        a.dependencies = vec![TaskId::from("b"), TaskId::from("c"), TaskId::from("gone")];
        let p = project(&[a, b, c], &TimelineFilter::default(), TimelineScale::Week);
        assert_eq!(
            p.edges,
            vec![DependencyEdge {
                from: TaskId::from("b"),
                to: TaskId::from("a"),
            }]
        );
    }

    #[test]
    fn filters_combine() {
        let mut a = task("a", Some(d(3, 1)), Some(d(3, 2)));
        a.status = TaskStatus::Done;
        a.assigned_to = Some("u1".into());
        let mut b = task("b", Some(d(3, 1)), Some(d(3, 2)));
        b.status = TaskStatus::Done;
        let c = task("c", Some(d(3, 1)), Some(d(3, 2)));

        let filter = TimelineFilter {
            status: StatusFilter::Is(TaskStatus::Done),
            assignee: AssigneeFilter::Unassigned,
        };
        let p = project(&[a.clone(), b, c], &filter, TimelineScale::Week);
        assert_eq!(p.bars.len(), 1);
        assert_eq!(p.bars[0].id.as_str(), "b");

        let filter = TimelineFilter {
            status: StatusFilter::All,
            assignee: AssigneeFilter::Member("u1".into()),
        };
        assert_eq!(project(&[a], &filter, TimelineScale::Week).bars.len(), 1);
    }

    #[test]
    fn scale_does_not_change_geometry() {
        let tasks = vec![task("a", Some(d(3, 1)), Some(d(3, 9)))];
        let day = project(&tasks, &TimelineFilter::default(), TimelineScale::Day);
        let month = project(&tasks, &TimelineFilter::default(), TimelineScale::Month);
        assert_eq!(day.bars, month.bars);
        assert_eq!(day.edges, month.edges);
    }

    #[test]
    fn option_lists() {
        let mut a = task("a", None, None);
        a.status = TaskStatus::InProgress;
        a.assigned_to = Some("u1".into());
        let b = task("b", None, None);
        let mut c = task("c", None, None);
        c.status = TaskStatus::InProgress;
        c.assigned_to = Some("u1".into());
        let tasks = vec![a, b, c];

        assert_eq!(
            status_options(&tasks),
            vec![
                StatusFilter::All,
                StatusFilter::Is(TaskStatus::InProgress),
                StatusFilter::Is(TaskStatus::ToDo),
            ]
        );
        let labels: Vec<String> = assignee_options(&tasks, &MemberDirectory::default())
            .into_iter()
            .map(|(_, l)| l)
            .collect();
        assert_eq!(labels, vec!["All assignees", "u1", "Unassigned"]);
    }

    #[test]
    fn candidates_exclude_cycles() {
        let mut a = task("a", None, None);
        a.dependencies = vec![TaskId::from("b")];
        let mut b = task("b", None, None);
        b.dependencies = vec![TaskId::from("c")];
        let c = task("c", None, None);
        let d_task = task("d", None, None);
        let tasks = vec![a, b, c, d_task];

        let ids: Vec<&str> = dependency_candidates(&tasks, &TaskId::from("c"))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["d"]);

        let ids: Vec<&str> = dependency_candidates(&tasks, &TaskId::from("a"))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "d"]);
    }
}
