use serde::{Deserialize, Serialize};

use super::task::MemberId;

/// Per-user permission entry on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRole {
    pub user_id: MemberId,
    #[serde(default)]
    pub can_edit_gantt: bool,
}

/// The slice of a project the timeline needs: who owns it and who is on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: Option<MemberId>,
    #[serde(default)]
    pub members: Vec<MemberId>,
    #[serde(default)]
    pub roles: Vec<ProjectRole>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: None,
            members: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// Whether `user` may edit the chart: the owner always may; otherwise an
    /// explicit role decides when the project has roles, else membership.
    pub fn can_edit(&self, user: Option<&str>) -> bool {
        let Some(user) = user else {
            return false;
        };
        if self.owner.as_deref() == Some(user) {
            return true;
        }
        if !self.roles.is_empty() {
            return self
                .roles
                .iter()
                .any(|role| role.user_id == user && role.can_edit_gantt);
        }
        self.members.iter().any(|m| m == user)
    }
}

/// Entry of the global user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: MemberId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// A project member resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
}

/// ID → display name map for a project's members, in project member order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDirectory {
    members: Vec<Member>,
}

impl MemberDirectory {
    /// Resolve each member ID against the user directory: name if present,
    /// else email, else the raw ID.
    pub fn resolve(project: &Project, users: &[User]) -> Self {
        let mut members: Vec<Member> = Vec::with_capacity(project.members.len());
        for id in &project.members {
            if members.iter().any(|m| &m.id == id) {
                continue;
            }
            let display_name = users
                .iter()
                .find(|u| &u.id == id)
                .and_then(|u| {
                    let name = u.name.trim();
                    if !name.is_empty() {
                        Some(name.to_string())
                    } else if !u.email.trim().is_empty() {
                        Some(u.email.trim().to_string())
                    } else {
                        None
                    }
                })
                .unwrap_or_else(|| id.clone());
            members.push(Member {
                id: id.clone(),
                display_name,
            });
        }
        Self { members }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Display name for an ID; unknown IDs are shown raw.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.members
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.display_name.as_str())
            .unwrap_or(id)
    }

    /// Assignee for a freshly drafted task: the first member, or the current
    /// user when the project has none.
    pub fn default_assignee(&self, current_user: Option<&str>) -> Option<MemberId> {
        self.members
            .first()
            .map(|m| m.id.clone())
            .or_else(|| current_user.map(str::to_string))
    }

    /// An assignee is acceptable when it is a member, or when the project has
    /// no resolvable members and it is the current user.
    pub fn can_assign(&self, id: &str, current_user: Option<&str>) -> bool {
        if id.trim().is_empty() {
            return false;
        }
        self.contains(id) || (self.is_empty() && current_user == Some(id))
    }
}
