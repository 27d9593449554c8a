use serde::{Deserialize, Serialize};

/// Admin-assigned task identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Admin-managed task. Immutable from the player's perspective except for
/// completion tracking, which lives in the `(user, task)` completion table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub points: u64,
    pub link: String,
    pub icon: String,
}

/// Task fields without an id, for admin create/edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    pub points: u64,
    pub link: String,
    pub icon: String,
}

impl NewTask {
    pub fn into_task(self, id: TaskId) -> TaskDefinition {
        TaskDefinition {
            id,
            name: self.name,
            description: self.description,
            points: self.points,
            link: self.link,
            icon: self.icon,
        }
    }
}
