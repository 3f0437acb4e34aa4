//! Todo use-case service.
//!
//! # Responsibility
//! - Normalize user input before it reaches the repository.
//! - Provide the group-scoped task lookups used by nested task routes.
//!
//! # Invariants
//! - Service layer remains storage-agnostic.
//! - A task resolved through a group must belong to that group.

use crate::model::todo::{NewTask, NewTaskGroup, Task, TaskGroup, TaskGroupId, TaskId};
use crate::repo::todo_repo::{
    TaskGroupListQuery, TaskListQuery, TodoRepository, TASKS_TABLE, TASK_GROUPS_TABLE,
};
use crate::repo::{RepoError, RepoResult};
use crate::service::{normalize_optional_text, normalize_text};
use chrono::Utc;

/// Use-case service wrapper for todo CRUD operations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
}

impl<R: TodoRepository> TodoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_group(&self, name: impl Into<String>) -> RepoResult<TaskGroup> {
        self.repo
            .create_group(&NewTaskGroup::new(normalize_text(name.into())))
    }

    pub fn rename_group(&self, id: TaskGroupId, name: impl Into<String>) -> RepoResult<TaskGroup> {
        let mut group = self.require_group(id)?;
        group.name = normalize_text(name.into());
        self.repo.update_group(&group)
    }

    pub fn get_group(&self, id: TaskGroupId) -> RepoResult<Option<TaskGroup>> {
        self.repo.get_group(id)
    }

    pub fn list_groups(&self, query: &TaskGroupListQuery) -> RepoResult<Vec<TaskGroup>> {
        self.repo.list_groups(query)
    }

    /// Deletes a group and its tasks; returns the number of tasks removed.
    pub fn delete_group(&self, id: TaskGroupId) -> RepoResult<usize> {
        self.repo.delete_group(id)
    }

    pub fn create_task(&self, draft: NewTask) -> RepoResult<Task> {
        let draft = NewTask {
            title: normalize_text(draft.title),
            description: normalize_optional_text(draft.description),
            group_id: draft.group_id,
        };
        self.repo.create_task(&draft)
    }

    /// Creates a task inside `group_id`, ignoring any group set on `draft`.
    pub fn create_task_in_group(&self, group_id: TaskGroupId, draft: NewTask) -> RepoResult<Task> {
        self.create_task(draft.in_group(group_id))
    }

    pub fn update_task(&self, task: &Task) -> RepoResult<Task> {
        let mut normalized = task.clone();
        normalized.title = normalize_text(normalized.title);
        normalized.description = normalize_optional_text(normalized.description);
        self.repo.update_task(&normalized)
    }

    pub fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.repo.get_task(id)
    }

    /// Resolves a task through its group.
    ///
    /// # Errors
    /// - `NotFound` for the group when it does not exist.
    /// - `NotFound` for the task when it is missing or belongs elsewhere.
    pub fn get_task_in_group(&self, group_id: TaskGroupId, task_id: TaskId) -> RepoResult<Task> {
        self.require_group(group_id)?;
        self.repo
            .get_task(task_id)?
            .filter(|task| task.group_id == Some(group_id))
            .ok_or(RepoError::NotFound {
                table: TASKS_TABLE,
                id: task_id,
            })
    }

    pub fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        self.repo.list_tasks(query)
    }

    /// Lists tasks of one existing group.
    pub fn list_group_tasks(&self, group_id: TaskGroupId) -> RepoResult<Vec<Task>> {
        self.require_group(group_id)?;
        self.repo.list_tasks(&TaskListQuery {
            group_id: Some(group_id),
            ..TaskListQuery::default()
        })
    }

    pub fn mark_task_done(&self, id: TaskId) -> RepoResult<Task> {
        let mut task = self.require_task(id)?;
        task.mark_done(Utc::now().timestamp_millis());
        self.repo.update_task(&task)
    }

    pub fn reopen_task(&self, id: TaskId) -> RepoResult<Task> {
        let mut task = self.require_task(id)?;
        task.reopen();
        self.repo.update_task(&task)
    }

    pub fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        self.repo.delete_task(id)
    }

    fn require_group(&self, id: TaskGroupId) -> RepoResult<TaskGroup> {
        self.repo.get_group(id)?.ok_or(RepoError::NotFound {
            table: TASK_GROUPS_TABLE,
            id,
        })
    }

    fn require_task(&self, id: TaskId) -> RepoResult<Task> {
        self.repo.get_task(id)?.ok_or(RepoError::NotFound {
            table: TASKS_TABLE,
            id,
        })
    }
}
