//! Default read scope for soft-deletable tables.
//!
//! Default reads hide rows with `deleted_at` set. Callers opt out per query by
//! passing `include_deleted = true`; there is no global switch.

use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use uuid::Uuid;

/// Predicate selecting rows that are not logically deleted.
pub(crate) const ACTIVE_ROWS: &str = "deleted_at IS NULL";

/// Appends the default-scope predicate unless the escape hatch is requested.
pub(crate) fn push_visibility(sql: &mut String, include_deleted: bool) {
    if !include_deleted {
        sql.push_str(" AND ");
        sql.push_str(ACTIVE_ROWS);
    }
}

/// Single-row lookup predicate honouring `include_deleted` through a bind.
///
/// `?2` must be bound to `include_deleted` as an integer flag.
pub(crate) const SCOPED_BY_ID: &str = "id = ?1 AND (?2 = 1 OR deleted_at IS NULL)";

pub(crate) fn scope_flag(include_deleted: bool) -> i64 {
    i64::from(include_deleted)
}

/// Fails with `NotFound` unless `id` is a visible row of `table`.
///
/// Used before attaching children, so nothing is created under a deleted parent.
pub(crate) fn ensure_visible(conn: &Connection, table: &'static str, id: Uuid) -> RepoResult<()> {
    let visible: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1 AND {ACTIVE_ROWS});"),
        [id.to_string()],
        |row| row.get(0),
    )?;
    if visible == 1 {
        Ok(())
    } else {
        Err(RepoError::NotFound { table, id })
    }
}

/// Row counts of one soft-deletable table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    /// Rows inside the default scope.
    pub active: u64,
    /// All rows, soft-deleted included.
    pub total: u64,
}

impl TableCounts {
    pub fn deleted(&self) -> u64 {
        self.total - self.active
    }
}

/// Counts visible and total rows of `table`.
pub fn table_counts(conn: &Connection, table: &'static str) -> RepoResult<TableCounts> {
    let (active, total): (i64, i64) = conn.query_row(
        &format!("SELECT COUNT(*) FILTER (WHERE {ACTIVE_ROWS}), COUNT(*) FROM {table};"),
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(TableCounts {
        active: u64::try_from(active).unwrap_or(0),
        total: u64::try_from(total).unwrap_or(0),
    })
}
