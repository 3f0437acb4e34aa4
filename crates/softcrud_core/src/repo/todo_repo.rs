//! Task group / task repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Deletes are physical. Removing a group removes its tasks through the
//!   `tasks.group_id ON DELETE CASCADE` foreign key.
//! - Listing is deterministic: `created_at ASC, id ASC`.

use crate::model::todo::{NewTask, NewTaskGroup, Task, TaskGroup, TaskGroupId, TaskId};
use crate::repo::{
    ensure_connection_ready, parse_optional_uuid, parse_uuid, push_pagination, RepoError,
    RepoResult, SchemaRequirement, NOW_EPOCH_MS_SQL,
};
use log::info;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use uuid::Uuid;

pub const TASK_GROUPS_TABLE: &str = "task_groups";
pub const TASKS_TABLE: &str = "tasks";

const GROUP_SELECT_SQL: &str = "SELECT id, name, created_at, updated_at FROM task_groups";
const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    done_at,
    group_id,
    created_at,
    updated_at
FROM tasks";

const REQUIRED_SCHEMA: &[SchemaRequirement] = &[
    (TASK_GROUPS_TABLE, &["id", "name", "created_at", "updated_at"]),
    (
        TASKS_TABLE,
        &[
            "id",
            "title",
            "description",
            "done_at",
            "group_id",
            "created_at",
            "updated_at",
        ],
    ),
];

/// Pagination for group listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGroupListQuery {
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Filters for task listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    /// Restrict to tasks in one group.
    pub group_id: Option<TaskGroupId>,
    /// `Some(true)` for completed tasks only, `Some(false)` for open ones.
    pub done: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for todo CRUD operations.
pub trait TodoRepository {
    fn create_group(&self, draft: &NewTaskGroup) -> RepoResult<TaskGroup>;
    fn update_group(&self, group: &TaskGroup) -> RepoResult<TaskGroup>;
    fn get_group(&self, id: TaskGroupId) -> RepoResult<Option<TaskGroup>>;
    fn list_groups(&self, query: &TaskGroupListQuery) -> RepoResult<Vec<TaskGroup>>;
    /// Deletes the group and returns how many of its tasks went with it.
    fn delete_group(&self, id: TaskGroupId) -> RepoResult<usize>;
    fn create_task(&self, draft: &NewTask) -> RepoResult<Task>;
    fn update_task(&self, task: &Task) -> RepoResult<Task>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }

    fn load_group(&self, id: TaskGroupId) -> RepoResult<TaskGroup> {
        self.get_group(id)?.ok_or(RepoError::NotFound {
            table: TASK_GROUPS_TABLE,
            id,
        })
    }

    fn load_task(&self, id: TaskId) -> RepoResult<Task> {
        self.get_task(id)?.ok_or(RepoError::NotFound {
            table: TASKS_TABLE,
            id,
        })
    }

    fn ensure_group_exists(&self, group_id: Option<TaskGroupId>) -> RepoResult<()> {
        match group_id {
            Some(group_id) => self.load_group(group_id).map(|_| ()),
            None => Ok(()),
        }
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn create_group(&self, draft: &NewTaskGroup) -> RepoResult<TaskGroup> {
        draft.validate()?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO task_groups (id, name) VALUES (?1, ?2);",
            params![id.to_string(), draft.name.as_str()],
        )?;
        self.load_group(id)
    }

    fn update_group(&self, group: &TaskGroup) -> RepoResult<TaskGroup> {
        group.validate()?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE task_groups
                 SET name = ?2,
                     updated_at = {NOW_EPOCH_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![group.id.to_string(), group.name.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: TASK_GROUPS_TABLE,
                id: group.id,
            });
        }
        self.load_group(group.id)
    }

    fn get_group(&self, id: TaskGroupId) -> RepoResult<Option<TaskGroup>> {
        self.conn
            .query_row(
                &format!("{GROUP_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_group_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_groups(&self, query: &TaskGroupListQuery) -> RepoResult<Vec<TaskGroup>> {
        let mut sql = format!("{GROUP_SELECT_SQL} ORDER BY created_at ASC, id ASC");
        let mut binds = Vec::new();
        push_pagination(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next()? {
            groups.push(parse_group_row(row)?);
        }
        Ok(groups)
    }

    fn delete_group(&self, id: TaskGroupId) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let task_count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM tasks WHERE group_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        let changed = tx.execute("DELETE FROM task_groups WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: TASK_GROUPS_TABLE,
                id,
            });
        }
        tx.commit()?;

        info!("event=hard_delete module=repo status=ok table=task_groups cascaded_tasks={task_count}");
        Ok(usize::try_from(task_count).unwrap_or(0))
    }

    fn create_task(&self, draft: &NewTask) -> RepoResult<Task> {
        draft.validate()?;
        self.ensure_group_exists(draft.group_id)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO tasks (id, title, description, group_id) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                draft.title.as_str(),
                draft.description.as_deref(),
                draft.group_id.map(|group_id| group_id.to_string()),
            ],
        )?;
        self.load_task(id)
    }

    fn update_task(&self, task: &Task) -> RepoResult<Task> {
        task.validate()?;
        self.ensure_group_exists(task.group_id)?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE tasks
                 SET title = ?2,
                     description = ?3,
                     done_at = ?4,
                     group_id = ?5,
                     updated_at = {NOW_EPOCH_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![
                task.id.to_string(),
                task.title.as_str(),
                task.description.as_deref(),
                task.done_at,
                task.group_id.map(|group_id| group_id.to_string()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: TASKS_TABLE,
                id: task.id,
            });
        }
        self.load_task(task.id)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        self.conn
            .query_row(
                &format!("{TASK_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_task_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();

        if let Some(group_id) = query.group_id {
            sql.push_str(" AND group_id = ?");
            binds.push(Value::Text(group_id.to_string()));
        }
        match query.done {
            Some(true) => sql.push_str(" AND done_at IS NOT NULL"),
            Some(false) => sql.push_str(" AND done_at IS NULL"),
            None => {}
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");
        push_pagination(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: TASKS_TABLE,
                id,
            });
        }
        Ok(())
    }
}

fn parse_group_row(row: &Row<'_>) -> RepoResult<TaskGroup> {
    let id_text: String = row.get("id")?;
    Ok(TaskGroup {
        id: parse_uuid(&id_text, "task_groups.id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    Ok(Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        done_at: row.get("done_at")?,
        group_id: parse_optional_uuid(row.get("group_id")?, "tasks.group_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
