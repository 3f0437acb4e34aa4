use rusqlite::Connection;
use softcrud_core::db::open_db_in_memory;
use softcrud_core::repo::todo_repo::{TASKS_TABLE, TASK_GROUPS_TABLE};
use softcrud_core::{
    NewTask, RepoError, SqliteTodoRepository, TaskGroupListQuery, TaskListQuery, TodoRepository,
    TodoService, ValidationError,
};
use uuid::Uuid;

fn service(conn: &Connection) -> TodoService<SqliteTodoRepository<'_>> {
    TodoService::new(SqliteTodoRepository::try_new(conn).unwrap())
}

#[test]
fn create_and_get_group_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let group = todo.create_group("  Groceries  ").unwrap();
    assert_eq!(group.name, "Groceries");

    let loaded = todo.get_group(group.id).unwrap().unwrap();
    assert_eq!(loaded, group);
}

#[test]
fn blank_group_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let err = todo.create_group("   ").unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::Blank { .. })
    ));
}

#[test]
fn rename_group_updates_name() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let group = todo.create_group("Work").unwrap();
    let renamed = todo.rename_group(group.id, "Office").unwrap();
    assert_eq!(renamed.id, group.id);
    assert_eq!(renamed.name, "Office");
}

#[test]
fn deleting_group_removes_its_tasks_physically() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let group = todo.create_group("Chores").unwrap();
    let other = todo.create_group("Errands").unwrap();
    todo.create_task_in_group(group.id, NewTask::new("dishes"))
        .unwrap();
    todo.create_task_in_group(group.id, NewTask::new("laundry"))
        .unwrap();
    let kept = todo
        .create_task_in_group(other.id, NewTask::new("post office"))
        .unwrap();

    let removed = todo.delete_group(group.id).unwrap();
    assert_eq!(removed, 2);

    assert!(todo.get_group(group.id).unwrap().is_none());
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM tasks;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 1);
    assert!(todo.get_task(kept.id).unwrap().is_some());
}

#[test]
fn deleting_missing_group_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);
    let missing = Uuid::new_v4();

    let err = todo.delete_group(missing).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound { table, id } if table == TASK_GROUPS_TABLE && id == missing
    ));
}

#[test]
fn nested_lookup_rejects_task_from_other_group() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let home = todo.create_group("Home").unwrap();
    let work = todo.create_group("Work").unwrap();
    let task = todo
        .create_task_in_group(home.id, NewTask::new("water plants"))
        .unwrap();

    let found = todo.get_task_in_group(home.id, task.id).unwrap();
    assert_eq!(found.id, task.id);

    let err = todo.get_task_in_group(work.id, task.id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound { table, .. } if table == TASKS_TABLE
    ));

    let err = todo.get_task_in_group(Uuid::new_v4(), task.id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound { table, .. } if table == TASK_GROUPS_TABLE
    ));
}

#[test]
fn creating_task_in_missing_group_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let err = todo
        .create_task(NewTask::new("orphan").in_group(Uuid::new_v4()))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound { table, .. } if table == TASK_GROUPS_TABLE
    ));
}

#[test]
fn task_without_group_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let task = todo
        .create_task(NewTask::new("inbox item").with_description("  triage later  "))
        .unwrap();
    assert_eq!(task.group_id, None);
    assert_eq!(task.description.as_deref(), Some("triage later"));
}

#[test]
fn mark_done_and_reopen_toggle_done_at() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let task = todo.create_task(NewTask::new("write report")).unwrap();
    assert!(!task.is_done());

    let done = todo.mark_task_done(task.id).unwrap();
    assert!(done.is_done());
    let first_done_at = done.done_at;

    let done_again = todo.mark_task_done(task.id).unwrap();
    assert_eq!(done_again.done_at, first_done_at);

    let reopened = todo.reopen_task(task.id).unwrap();
    assert!(!reopened.is_done());
}

#[test]
fn list_tasks_filters_by_group_and_done_state() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    let group = todo.create_group("Sprint").unwrap();
    let first = todo
        .create_task_in_group(group.id, NewTask::new("design"))
        .unwrap();
    let second = todo
        .create_task_in_group(group.id, NewTask::new("build"))
        .unwrap();
    todo.create_task(NewTask::new("unrelated")).unwrap();
    todo.mark_task_done(first.id).unwrap();

    let in_group = todo.list_group_tasks(group.id).unwrap();
    assert_eq!(in_group.len(), 2);

    let open = todo
        .list_tasks(&TaskListQuery {
            group_id: Some(group.id),
            done: Some(false),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(open.iter().map(|task| task.id).collect::<Vec<_>>(), vec![second.id]);

    let all = todo.list_tasks(&TaskListQuery::default()).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn list_groups_paginates() {
    let conn = open_db_in_memory().unwrap();
    let todo = service(&conn);

    for name in ["a", "b", "c"] {
        todo.create_group(name).unwrap();
    }

    let page = todo
        .list_groups(&TaskGroupListQuery {
            limit: Some(2),
            offset: 1,
        })
        .unwrap();
    assert_eq!(page.len(), 2);
}

#[test]
fn update_and_delete_missing_task_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTodoRepository::try_new(&conn).unwrap();

    let mut task = repo.create_task(&NewTask::new("ghost")).unwrap();
    repo.delete_task(task.id).unwrap();

    task.title = "still ghost".to_string();
    assert!(matches!(
        repo.update_task(&task).unwrap_err(),
        RepoError::NotFound { .. }
    ));
    assert!(matches!(
        repo.delete_task(task.id).unwrap_err(),
        RepoError::NotFound { .. }
    ));
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteTodoRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}
