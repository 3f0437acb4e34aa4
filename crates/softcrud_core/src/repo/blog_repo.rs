//! User and blog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist blog owners and blogs.
//! - Expose single and filtered logical deletion of blogs, cascading to posts
//!   and comments.
//!
//! # Invariants
//! - Default reads exclude soft-deleted blogs; `include_deleted` opts out.
//! - Updates only touch visible blogs.

use super::visibility::{push_visibility, scope_flag, SCOPED_BY_ID};
use crate::db::relations::{BLOGS_TABLE, BLOG_RELATIONS};
use crate::filter::DateRange;
use crate::model::blog::{validate_username, Blog, BlogId, NewBlog, User, UserId};
use crate::repo::deletion::{soft_delete_many, soft_delete_one, DeletionReport};
use crate::repo::{
    ensure_connection_ready, parse_uuid, push_pagination, RepoError, RepoResult,
    SchemaRequirement, NOW_EPOCH_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub const USERS_TABLE: &str = "users";

const BLOG_SELECT_SQL: &str = "SELECT
    id,
    name,
    owner_id,
    created_at,
    updated_at,
    deleted_at
FROM blogs";

const REQUIRED_SCHEMA: &[SchemaRequirement] = &[
    (USERS_TABLE, &["id", "username", "created_at"]),
    (
        BLOGS_TABLE,
        &[
            "id",
            "name",
            "owner_id",
            "created_at",
            "updated_at",
            "deleted_at",
        ],
    ),
];

/// Filters for blog listing and filtered deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogListQuery {
    /// Inclusive `created_at` bounds.
    pub created_at: DateRange,
    pub owner_id: Option<UserId>,
    /// Escape hatch: also return soft-deleted blogs.
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for users and blogs.
pub trait BlogRepository {
    fn create_user(&self, username: &str) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn create_blog(&self, draft: &NewBlog) -> RepoResult<Blog>;
    fn update_blog(&self, blog: &Blog) -> RepoResult<Blog>;
    fn get_blog(&self, id: BlogId, include_deleted: bool) -> RepoResult<Option<Blog>>;
    fn list_blogs(&self, query: &BlogListQuery) -> RepoResult<Vec<Blog>>;
    /// Soft-deletes one blog with its posts and comments.
    fn soft_delete_blog(&self, id: BlogId) -> RepoResult<DeletionReport>;
    /// Soft-deletes every visible blog matching `query` in one event.
    ///
    /// Pagination and `include_deleted` are ignored: the selected set is always
    /// every active blog matching the filters.
    fn soft_delete_blogs(&self, query: &BlogListQuery) -> RepoResult<DeletionReport>;
}

/// SQLite-backed blog repository.
pub struct SqliteBlogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlogRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }

    fn load_blog(&self, id: BlogId) -> RepoResult<Blog> {
        self.get_blog(id, false)?.ok_or(RepoError::NotFound {
            table: BLOGS_TABLE,
            id,
        })
    }

    fn ensure_user_exists(&self, id: UserId) -> RepoResult<()> {
        match self.get_user(id)? {
            Some(_) => Ok(()),
            None => Err(RepoError::NotFound {
                table: USERS_TABLE,
                id,
            }),
        }
    }
}

impl BlogRepository for SqliteBlogRepository<'_> {
    fn create_user(&self, username: &str) -> RepoResult<User> {
        validate_username(username)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO users (id, username) VALUES (?1, ?2);",
            params![id.to_string(), username],
        )?;
        self.get_user(id)?.ok_or(RepoError::NotFound {
            table: USERS_TABLE,
            id,
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1;",
                [id.to_string()],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn create_blog(&self, draft: &NewBlog) -> RepoResult<Blog> {
        draft.validate()?;
        self.ensure_user_exists(draft.owner_id)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO blogs (id, name, owner_id) VALUES (?1, ?2, ?3);",
            params![id.to_string(), draft.name.as_str(), draft.owner_id.to_string()],
        )?;
        self.load_blog(id)
    }

    fn update_blog(&self, blog: &Blog) -> RepoResult<Blog> {
        blog.validate()?;
        self.ensure_user_exists(blog.owner_id)?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE blogs
                 SET name = ?2,
                     owner_id = ?3,
                     updated_at = {NOW_EPOCH_MS_SQL}
                 WHERE id = ?1
                   AND deleted_at IS NULL;"
            ),
            params![
                blog.id.to_string(),
                blog.name.as_str(),
                blog.owner_id.to_string()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: BLOGS_TABLE,
                id: blog.id,
            });
        }
        self.load_blog(blog.id)
    }

    fn get_blog(&self, id: BlogId, include_deleted: bool) -> RepoResult<Option<Blog>> {
        self.conn
            .query_row(
                &format!("{BLOG_SELECT_SQL} WHERE {SCOPED_BY_ID};"),
                params![id.to_string(), scope_flag(include_deleted)],
                |row| Ok(parse_blog_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_blogs(&self, query: &BlogListQuery) -> RepoResult<Vec<Blog>> {
        query.created_at.validate()?;

        let (mut sql, mut binds) =
            filtered_blogs_sql(BLOG_SELECT_SQL, query, query.include_deleted);
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        push_pagination(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut blogs = Vec::new();
        while let Some(row) = rows.next()? {
            blogs.push(parse_blog_row(row)?);
        }
        Ok(blogs)
    }

    fn soft_delete_blog(&self, id: BlogId) -> RepoResult<DeletionReport> {
        soft_delete_one(self.conn, BLOG_RELATIONS, BLOGS_TABLE, id)
    }

    fn soft_delete_blogs(&self, query: &BlogListQuery) -> RepoResult<DeletionReport> {
        query.created_at.validate()?;
        soft_delete_many(self.conn, BLOG_RELATIONS, BLOGS_TABLE, |conn| {
            let (sql, binds) = filtered_blogs_sql("SELECT id FROM blogs", query, false);
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                ids.push(parse_uuid(&value, "blogs.id")?);
            }
            Ok(ids)
        })
    }
}

fn filtered_blogs_sql(
    select_sql: &str,
    query: &BlogListQuery,
    include_deleted: bool,
) -> (String, Vec<Value>) {
    let mut sql = format!("{select_sql} WHERE 1 = 1");
    let mut binds: Vec<Value> = Vec::new();

    push_visibility(&mut sql, include_deleted);
    if let Some(owner_id) = query.owner_id {
        sql.push_str(" AND owner_id = ?");
        binds.push(Value::Text(owner_id.to_string()));
    }
    query.created_at.push_sql("created_at", &mut sql, &mut binds);

    (sql, binds)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    Ok(User {
        id: parse_uuid(&id_text, "users.id")?,
        username: row.get("username")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_blog_row(row: &Row<'_>) -> RepoResult<Blog> {
    let id_text: String = row.get("id")?;
    let owner_text: String = row.get("owner_id")?;
    Ok(Blog {
        id: parse_uuid(&id_text, "blogs.id")?,
        name: row.get("name")?,
        owner_id: parse_uuid(&owner_text, "blogs.owner_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
