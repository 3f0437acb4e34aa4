//! Logical deletion with recursive cascade.
//!
//! # Responsibility
//! - Replace physical deletes with one `deleted_at` write per row.
//! - Propagate the same write to active dependents declared in a
//!   [`Relation`] table, level by level.
//!
//! # Invariants
//! - One timestamp is captured per top-level call and shared by every row
//!   that call touches.
//! - Each `(table, id)` is visited at most once per call, so cyclic relation
//!   graphs terminate.
//! - Every top-level call runs in one `IMMEDIATE` transaction; a failure
//!   anywhere in the cascade leaves storage untouched.
//! - Rows that are already deleted keep their original `deleted_at`.

use super::visibility::ACTIVE_ROWS;
use crate::db::relations::{dependents_of, OnDelete, Relation};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use chrono::Utc;
use log::{error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use uuid::Uuid;

// Keeps every statement well below SQLite's bound-parameter limit.
const MAX_IDS_PER_STATEMENT: usize = 500;

/// Outcome of one logical deletion event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    /// Timestamp written to every affected row.
    pub deleted_at: i64,
    affected: BTreeMap<&'static str, usize>,
}

impl DeletionReport {
    fn new(deleted_at: i64) -> Self {
        Self {
            deleted_at,
            affected: BTreeMap::new(),
        }
    }

    fn record(&mut self, table: &'static str, rows: usize) {
        if rows > 0 {
            *self.affected.entry(table).or_insert(0) += rows;
        }
    }

    /// Rows newly marked deleted in `table`.
    pub fn affected(&self, table: &str) -> usize {
        self.affected.get(table).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.affected.values().sum()
    }

    /// `true` when the call changed nothing, e.g. the target was already deleted.
    pub fn is_empty(&self) -> bool {
        self.affected.is_empty()
    }

    /// Per-table counts in table-name order.
    pub fn tables(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.affected.iter().map(|(table, rows)| (*table, *rows))
    }
}

/// Soft-deletes one row and its dependents.
///
/// # Errors
/// - `NotFound` when `id` does not exist in `table` at all.
/// - `Restricted` when a restrict edge still has active dependents.
/// - `Db` when the transaction cannot begin or commit.
pub fn soft_delete_one(
    conn: &Connection,
    relations: &[Relation],
    table: &'static str,
    id: Uuid,
) -> RepoResult<DeletionReport> {
    run_logged(conn, relations, "one", table, |cascade| {
        cascade.delete_one(table, id)
    })
}

/// Soft-deletes the rows returned by `select_ids` and all of their dependents.
///
/// `select_ids` runs inside the deletion transaction, so the selected set and
/// the writes observe the same snapshot.
pub fn soft_delete_many<F>(
    conn: &Connection,
    relations: &[Relation],
    table: &'static str,
    select_ids: F,
) -> RepoResult<DeletionReport>
where
    F: FnOnce(&Connection) -> RepoResult<Vec<Uuid>>,
{
    run_logged(conn, relations, "many", table, |cascade| {
        let ids = select_ids(cascade.conn)?;
        cascade.delete_many(table, ids)
    })
}

fn run_logged<F>(
    conn: &Connection,
    relations: &[Relation],
    mode: &'static str,
    table: &'static str,
    work: F,
) -> RepoResult<DeletionReport>
where
    F: FnOnce(Cascade<'_>) -> RepoResult<DeletionReport>,
{
    let started_at = Instant::now();
    let deleted_at = Utc::now().timestamp_millis();

    match run_in_transaction(conn, relations, deleted_at, work) {
        Ok(report) => {
            info!(
                "event=soft_delete module=repo status=ok mode={mode} table={table} rows={} deleted_at={} duration_ms={}",
                report.total(),
                report.deleted_at,
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=soft_delete module=repo status=error mode={mode} table={table} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
    }
}

fn run_in_transaction<F>(
    conn: &Connection,
    relations: &[Relation],
    deleted_at: i64,
    work: F,
) -> RepoResult<DeletionReport>
where
    F: FnOnce(Cascade<'_>) -> RepoResult<DeletionReport>,
{
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let report = work(Cascade::new(&tx, relations, deleted_at))?;
    tx.commit()?;
    Ok(report)
}

struct Cascade<'a> {
    conn: &'a Connection,
    relations: &'a [Relation],
    visited: HashSet<(&'static str, Uuid)>,
    report: DeletionReport,
}

impl<'a> Cascade<'a> {
    fn new(conn: &'a Connection, relations: &'a [Relation], deleted_at: i64) -> Self {
        Self {
            conn,
            relations,
            visited: HashSet::new(),
            report: DeletionReport::new(deleted_at),
        }
    }

    fn delete_one(mut self, table: &'static str, id: Uuid) -> RepoResult<DeletionReport> {
        let state: Option<Option<i64>> = self
            .conn
            .query_row(
                &format!("SELECT deleted_at FROM {table} WHERE id = ?1;"),
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match state {
            None => Err(RepoError::NotFound { table, id }),
            Some(Some(_)) => Ok(self.report),
            Some(None) => {
                self.visit(table, vec![id])?;
                Ok(self.report)
            }
        }
    }

    fn delete_many(mut self, table: &'static str, ids: Vec<Uuid>) -> RepoResult<DeletionReport> {
        self.visit(table, ids)?;
        Ok(self.report)
    }

    /// Deletes dependents first, then `ids` themselves.
    fn visit(&mut self, table: &'static str, ids: Vec<Uuid>) -> RepoResult<()> {
        let pending: Vec<Uuid> = ids
            .into_iter()
            .filter(|id| self.visited.insert((table, *id)))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let relations = self.relations;
        for relation in dependents_of(relations, table) {
            let mut dependents = active_dependents(self.conn, relation, &pending)?;
            dependents.retain(|id| !self.visited.contains(&(relation.child, *id)));
            if dependents.is_empty() {
                continue;
            }

            match relation.on_delete {
                OnDelete::Restrict => {
                    return Err(RepoError::Restricted {
                        table,
                        dependent_table: relation.child,
                    });
                }
                OnDelete::Cascade => self.visit(relation.child, dependents)?,
            }
        }

        let changed = mark_deleted(self.conn, table, &pending, self.report.deleted_at)?;
        self.report.record(table, changed);
        Ok(())
    }
}

fn active_dependents(
    conn: &Connection,
    relation: &Relation,
    parent_ids: &[Uuid],
) -> RepoResult<Vec<Uuid>> {
    let mut ids = Vec::new();
    for chunk in parent_ids.chunks(MAX_IDS_PER_STATEMENT) {
        let sql = format!(
            "SELECT id FROM {child} WHERE {foreign_key} IN ({placeholders}) AND {ACTIVE_ROWS} ORDER BY id ASC;",
            child = relation.child,
            foreign_key = relation.foreign_key,
            placeholders = placeholders(chunk.len()),
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(chunk.iter().map(Uuid::to_string)))?;
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "dependent id")?);
        }
    }
    Ok(ids)
}

fn mark_deleted(
    conn: &Connection,
    table: &'static str,
    ids: &[Uuid],
    deleted_at: i64,
) -> RepoResult<usize> {
    let mut changed = 0;
    for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
        let sql = format!(
            "UPDATE {table}
             SET deleted_at = ?, updated_at = ?
             WHERE id IN ({}) AND {ACTIVE_ROWS};",
            placeholders(chunk.len())
        );
        let mut binds = vec![Value::Integer(deleted_at), Value::Integer(deleted_at)];
        binds.extend(chunk.iter().map(|id| Value::Text(id.to_string())));
        changed += conn.execute(&sql, params_from_iter(binds))?;
    }
    Ok(changed)
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    const OWNERS: &str = "owners";
    const PETS: &str = "pets";
    const ALPHA: &str = "alpha";
    const BETA: &str = "beta";
    const THREADS: &str = "threads";
    const TOYS: &str = "toys";

    const RESTRICTED: &[Relation] = &[Relation {
        parent: OWNERS,
        child: PETS,
        foreign_key: "owner_id",
        on_delete: OnDelete::Restrict,
    }];

    // Cascade edge declared first so its writes land before the restrict check.
    const CASCADE_THEN_RESTRICT: &[Relation] = &[
        Relation {
            parent: OWNERS,
            child: PETS,
            foreign_key: "owner_id",
            on_delete: OnDelete::Cascade,
        },
        Relation {
            parent: OWNERS,
            child: TOYS,
            foreign_key: "owner_id",
            on_delete: OnDelete::Restrict,
        },
    ];

    const CYCLIC: &[Relation] = &[
        Relation {
            parent: ALPHA,
            child: BETA,
            foreign_key: "alpha_id",
            on_delete: OnDelete::Cascade,
        },
        Relation {
            parent: BETA,
            child: ALPHA,
            foreign_key: "beta_id",
            on_delete: OnDelete::Cascade,
        },
    ];

    const SELF_REFERENCING: &[Relation] = &[Relation {
        parent: THREADS,
        child: THREADS,
        foreign_key: "parent_id",
        on_delete: OnDelete::Cascade,
    }];

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE owners (id TEXT PRIMARY KEY, updated_at INTEGER, deleted_at INTEGER);
             CREATE TABLE pets (id TEXT PRIMARY KEY, owner_id TEXT, updated_at INTEGER, deleted_at INTEGER);
             CREATE TABLE toys (id TEXT PRIMARY KEY, owner_id TEXT, updated_at INTEGER, deleted_at INTEGER);
             CREATE TABLE alpha (id TEXT PRIMARY KEY, beta_id TEXT, updated_at INTEGER, deleted_at INTEGER);
             CREATE TABLE beta (id TEXT PRIMARY KEY, alpha_id TEXT, updated_at INTEGER, deleted_at INTEGER);
             CREATE TABLE threads (id TEXT PRIMARY KEY, parent_id TEXT, updated_at INTEGER, deleted_at INTEGER);",
        )
        .unwrap();
        conn
    }

    fn insert(conn: &Connection, table: &str, fk_column: Option<(&str, Uuid)>) -> Uuid {
        let id = Uuid::new_v4();
        match fk_column {
            Some((column, parent)) => conn
                .execute(
                    &format!("INSERT INTO {table} (id, {column}) VALUES (?1, ?2);"),
                    params![id.to_string(), parent.to_string()],
                )
                .unwrap(),
            None => conn
                .execute(
                    &format!("INSERT INTO {table} (id) VALUES (?1);"),
                    [id.to_string()],
                )
                .unwrap(),
        };
        id
    }

    fn deleted_at(conn: &Connection, table: &str, id: Uuid) -> Option<i64> {
        conn.query_row(
            &format!("SELECT deleted_at FROM {table} WHERE id = ?1;"),
            [id.to_string()],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn missing_row_is_not_found() {
        let conn = setup();
        let id = Uuid::new_v4();
        let err = soft_delete_one(&conn, RESTRICTED, OWNERS, id).unwrap_err();
        assert!(matches!(err, RepoError::NotFound { table: "owners", id: missing } if missing == id));
    }

    #[test]
    fn second_delete_is_a_noop_and_keeps_timestamp() {
        let conn = setup();
        let owner = insert(&conn, OWNERS, None);

        let first = soft_delete_one(&conn, RESTRICTED, OWNERS, owner).unwrap();
        assert_eq!(first.affected(OWNERS), 1);
        let stamped = deleted_at(&conn, OWNERS, owner);
        assert_eq!(stamped, Some(first.deleted_at));

        let second = soft_delete_one(&conn, RESTRICTED, OWNERS, owner).unwrap();
        assert!(second.is_empty());
        assert_eq!(deleted_at(&conn, OWNERS, owner), stamped);
    }

    #[test]
    fn restrict_edge_rolls_back_whole_call() {
        let conn = setup();
        let owner = insert(&conn, OWNERS, None);
        let pet = insert(&conn, PETS, Some(("owner_id", owner)));

        let err = soft_delete_one(&conn, RESTRICTED, OWNERS, owner).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Restricted {
                table: "owners",
                dependent_table: "pets"
            }
        ));
        assert_eq!(deleted_at(&conn, OWNERS, owner), None);

        soft_delete_one(&conn, RESTRICTED, PETS, pet).unwrap();
        let report = soft_delete_one(&conn, RESTRICTED, OWNERS, owner).unwrap();
        assert_eq!(report.affected(OWNERS), 1);
    }

    #[test]
    fn restrict_after_cascade_discards_cascaded_writes() {
        let conn = setup();
        let owner = insert(&conn, OWNERS, None);
        let pet = insert(&conn, PETS, Some(("owner_id", owner)));
        let toy = insert(&conn, TOYS, Some(("owner_id", owner)));

        let err = soft_delete_one(&conn, CASCADE_THEN_RESTRICT, OWNERS, owner).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Restricted {
                table: "owners",
                dependent_table: "toys"
            }
        ));
        assert!(conn.is_autocommit());
        assert_eq!(deleted_at(&conn, PETS, pet), None);
        assert_eq!(deleted_at(&conn, OWNERS, owner), None);

        soft_delete_one(&conn, CASCADE_THEN_RESTRICT, TOYS, toy).unwrap();
        let report = soft_delete_one(&conn, CASCADE_THEN_RESTRICT, OWNERS, owner).unwrap();
        assert_eq!(report.affected(OWNERS), 1);
        assert_eq!(report.affected(PETS), 1);
        assert_eq!(deleted_at(&conn, PETS, pet), Some(report.deleted_at));
    }

    #[test]
    fn cyclic_relations_terminate_with_one_timestamp() {
        let conn = setup();
        let a = insert(&conn, ALPHA, None);
        let b = insert(&conn, BETA, Some(("alpha_id", a)));
        conn.execute(
            "UPDATE alpha SET beta_id = ?1 WHERE id = ?2;",
            params![b.to_string(), a.to_string()],
        )
        .unwrap();

        let report = soft_delete_one(&conn, CYCLIC, ALPHA, a).unwrap();
        assert_eq!(report.affected(ALPHA), 1);
        assert_eq!(report.affected(BETA), 1);
        assert_eq!(deleted_at(&conn, ALPHA, a), Some(report.deleted_at));
        assert_eq!(deleted_at(&conn, BETA, b), Some(report.deleted_at));
    }

    #[test]
    fn self_referencing_chain_is_deleted_transitively() {
        let conn = setup();
        let root = insert(&conn, THREADS, None);
        let reply = insert(&conn, THREADS, Some(("parent_id", root)));
        let nested = insert(&conn, THREADS, Some(("parent_id", reply)));
        let unrelated = insert(&conn, THREADS, None);

        let report = soft_delete_one(&conn, SELF_REFERENCING, THREADS, root).unwrap();
        assert_eq!(report.affected(THREADS), 3);
        for id in [root, reply, nested] {
            assert_eq!(deleted_at(&conn, THREADS, id), Some(report.deleted_at));
        }
        assert_eq!(deleted_at(&conn, THREADS, unrelated), None);
    }

    #[test]
    fn many_uses_selector_inside_transaction() {
        let conn = setup();
        let first = insert(&conn, THREADS, None);
        let second = insert(&conn, THREADS, None);
        let child = insert(&conn, THREADS, Some(("parent_id", second)));

        let report = soft_delete_many(&conn, SELF_REFERENCING, THREADS, |_| {
            Ok(vec![first, second])
        })
        .unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(
            report.tables().collect::<Vec<_>>(),
            vec![(THREADS, 3)]
        );
        assert_eq!(deleted_at(&conn, THREADS, child), Some(report.deleted_at));
    }

    #[test]
    fn selector_error_aborts_call() {
        let conn = setup();
        let err = soft_delete_many(&conn, SELF_REFERENCING, THREADS, |_| {
            Err(RepoError::InvalidData("selector failed".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
    }

    #[test]
    fn placeholders_match_count() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }
}
