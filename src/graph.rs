//! Admissibility checks for dependency edges. An edge `from -> to` means
//! `to` depends on `from` (`from` is the predecessor). The predecessor
//! relation over a project's tasks must stay acyclic.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::ValidationError;
use crate::model::{Task, TaskId};

/// Read-only index over a task list for predecessor walks.
pub struct DependencyGraph<'a> {
    by_id: HashMap<&'a TaskId, &'a Task>,
}

impl<'a> DependencyGraph<'a> {
    pub fn new(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        Self {
            by_id: tasks.into_iter().map(|t| (&t.id, t)).collect(),
        }
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Whether `ancestor` is reachable from `task` by following dependency
    /// links, i.e. `task` transitively depends on `ancestor`. Unknown IDs
    /// along the way are skipped.
    pub fn depends_on(&self, task: &TaskId, ancestor: &TaskId) -> bool {
        let mut visited: HashSet<&TaskId> = HashSet::new();
        let mut stack: Vec<&TaskId> = vec![task];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            let Some(node) = self.by_id.get(current) else {
                continue;
            };
            for dep in &node.dependencies {
                if dep == ancestor {
                    return true;
                }
                if !visited.contains(dep) {
                    stack.push(dep);
                }
            }
        }
        false
    }

    /// Every task `task` transitively depends on, in discovery order.
    pub fn predecessors(&self, task: &TaskId) -> Vec<TaskId> {
        let mut seen: HashSet<&TaskId> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<&TaskId> = vec![task];
        while let Some(current) = stack.pop() {
            let Some(node) = self.by_id.get(current) else {
                continue;
            };
            for dep in &node.dependencies {
                if dep != task && self.by_id.contains_key(dep) && seen.insert(dep) {
                    out.push(dep.clone());
                    stack.push(dep);
                }
            }
        }
        out
    }

    /// Admissibility of the edge `from -> to` (make `to` depend on `from`).
    pub fn check_edge(&self, from: &TaskId, to: &TaskId) -> Result<(), ValidationError> {
        if from == to {
            return Err(ValidationError::SelfDependency);
        }
        if self.depends_on(from, to) {
            debug!(%from, %to, "edge would close a cycle");
            return Err(ValidationError::Cycle {
                from: from.clone(),
                to: to.clone(),
            });
        }
        if let Some(dependent) = self.by_id.get(to) {
            if dependent.depends_on(from) {
                return Err(ValidationError::DuplicateDependency);
            }
        }
        Ok(())
    }

    /// Tasks already part of a cycle in loaded data, if any. Used to flag
    /// corrupt store contents; never blocks rendering.
    pub fn find_cycle(&self) -> Option<Vec<TaskId>> {
        let mut ids: Vec<&TaskId> = self.by_id.keys().copied().collect();
        ids.sort();
        for id in ids {
            if self.depends_on(id, id) {
                let mut members = vec![id.clone()];
                members.extend(
                    self.predecessors(id)
                        .into_iter()
                        .filter(|p| self.depends_on(p, id)),
                );
                return Some(members);
            }
        }
        None
    }
}

/// `false` for a self-loop, or when `to` is already a (transitive)
/// predecessor of `from` so the edge would close a cycle; `true` otherwise.
pub fn can_add_edge(tasks: &[Task], from: &TaskId, to: &TaskId) -> bool {
    if from == to {
        return false;
    }
    !DependencyGraph::new(tasks).depends_on(from, to)
}
