//! Task group and task records for the todo backend.
//!
//! Todo records are deleted physically; removing a group removes its tasks
//! through the schema-level `ON DELETE CASCADE`.

use crate::model::validation::{
    limit_optional_text, require_text, ValidationError, SHORT_TEXT_MAX_CHARS,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TaskGroupId = Uuid;
pub type TaskId = Uuid;

/// Named bucket of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: TaskGroupId,
    pub name: String,
    /// Epoch ms, written by storage on insert.
    pub created_at: i64,
    /// Epoch ms, refreshed on every update.
    pub updated_at: i64,
}

impl TaskGroup {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, Some(SHORT_TEXT_MAX_CHARS))
    }
}

/// Input for creating a task group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaskGroup {
    pub name: String,
}

impl NewTaskGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, Some(SHORT_TEXT_MAX_CHARS))
    }
}

/// One actionable item, optionally grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    /// Completion time in epoch ms; `None` while open.
    pub done_at: Option<i64>,
    pub group_id: Option<TaskGroupId>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_task_fields(&self.title, self.description.as_deref())
    }

    pub fn is_done(&self) -> bool {
        self.done_at.is_some()
    }

    /// Marks the task complete at `at_epoch_ms`. Keeps the first completion time.
    pub fn mark_done(&mut self, at_epoch_ms: i64) {
        if self.done_at.is_none() {
            self.done_at = Some(at_epoch_ms);
        }
    }

    pub fn reopen(&mut self) {
        self.done_at = None;
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_id: Option<TaskGroupId>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn in_group(mut self, group_id: TaskGroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_task_fields(&self.title, self.description.as_deref())
    }
}

fn validate_task_fields(title: &str, description: Option<&str>) -> Result<(), ValidationError> {
    require_text("title", title, Some(SHORT_TEXT_MAX_CHARS))?;
    limit_optional_text("description", description, SHORT_TEXT_MAX_CHARS)
}
