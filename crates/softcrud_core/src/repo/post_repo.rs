//! Post and comment repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Posts attach only to visible blogs, comments only to visible posts.
//! - Deleting a post soft-deletes its comments in the same event.
//! - Listing is deterministic: `created_at ASC, id ASC`.

use super::visibility::{ensure_visible, push_visibility, scope_flag, SCOPED_BY_ID};
use crate::db::relations::{BLOGS_TABLE, BLOG_RELATIONS, COMMENTS_TABLE, POSTS_TABLE};
use crate::filter::DateRange;
use crate::model::blog::{BlogId, Comment, CommentId, NewComment, NewPost, Post, PostId};
use crate::repo::deletion::{soft_delete_one, DeletionReport};
use crate::repo::{
    ensure_connection_ready, parse_uuid, push_pagination, RepoError, RepoResult,
    SchemaRequirement, NOW_EPOCH_MS_SQL,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use uuid::Uuid;

const POST_SELECT_SQL: &str = "SELECT
    id,
    title,
    content,
    blog_id,
    created_at,
    updated_at,
    deleted_at
FROM posts";

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    content,
    post_id,
    created_at,
    updated_at,
    deleted_at
FROM comments";

const REQUIRED_SCHEMA: &[SchemaRequirement] = &[
    (BLOGS_TABLE, &["id", "deleted_at"]),
    (
        POSTS_TABLE,
        &[
            "id",
            "title",
            "content",
            "blog_id",
            "created_at",
            "updated_at",
            "deleted_at",
        ],
    ),
    (
        COMMENTS_TABLE,
        &[
            "id",
            "content",
            "post_id",
            "created_at",
            "updated_at",
            "deleted_at",
        ],
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListQuery {
    pub blog_id: Option<BlogId>,
    pub created_at: DateRange,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentListQuery {
    pub post_id: Option<PostId>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for posts and their comments.
pub trait PostRepository {
    fn create_post(&self, draft: &NewPost) -> RepoResult<Post>;
    fn update_post(&self, post: &Post) -> RepoResult<Post>;
    fn get_post(&self, id: PostId, include_deleted: bool) -> RepoResult<Option<Post>>;
    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Vec<Post>>;
    fn soft_delete_post(&self, id: PostId) -> RepoResult<DeletionReport>;
    fn create_comment(&self, draft: &NewComment) -> RepoResult<Comment>;
    fn update_comment(&self, comment: &Comment) -> RepoResult<Comment>;
    fn get_comment(&self, id: CommentId, include_deleted: bool) -> RepoResult<Option<Comment>>;
    fn list_comments(&self, query: &CommentListQuery) -> RepoResult<Vec<Comment>>;
    fn soft_delete_comment(&self, id: CommentId) -> RepoResult<DeletionReport>;
}

/// SQLite-backed post/comment repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, REQUIRED_SCHEMA)?;
        Ok(Self { conn })
    }

    fn load_post(&self, id: PostId) -> RepoResult<Post> {
        self.get_post(id, false)?.ok_or(RepoError::NotFound {
            table: POSTS_TABLE,
            id,
        })
    }

    fn load_comment(&self, id: CommentId) -> RepoResult<Comment> {
        self.get_comment(id, false)?.ok_or(RepoError::NotFound {
            table: COMMENTS_TABLE,
            id,
        })
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn create_post(&self, draft: &NewPost) -> RepoResult<Post> {
        draft.validate()?;
        ensure_visible(self.conn, BLOGS_TABLE, draft.blog_id)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO posts (id, title, content, blog_id) VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                draft.title.as_str(),
                draft.content.as_str(),
                draft.blog_id.to_string()
            ],
        )?;
        self.load_post(id)
    }

    fn update_post(&self, post: &Post) -> RepoResult<Post> {
        post.validate()?;
        ensure_visible(self.conn, BLOGS_TABLE, post.blog_id)?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE posts
                 SET title = ?2,
                     content = ?3,
                     blog_id = ?4,
                     updated_at = {NOW_EPOCH_MS_SQL}
                 WHERE id = ?1
                   AND deleted_at IS NULL;"
            ),
            params![
                post.id.to_string(),
                post.title.as_str(),
                post.content.as_str(),
                post.blog_id.to_string()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: POSTS_TABLE,
                id: post.id,
            });
        }
        self.load_post(post.id)
    }

    fn get_post(&self, id: PostId, include_deleted: bool) -> RepoResult<Option<Post>> {
        self.conn
            .query_row(
                &format!("{POST_SELECT_SQL} WHERE {SCOPED_BY_ID};"),
                params![id.to_string(), scope_flag(include_deleted)],
                |row| Ok(parse_post_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Vec<Post>> {
        query.created_at.validate()?;

        let mut sql = format!("{POST_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();
        push_visibility(&mut sql, query.include_deleted);
        if let Some(blog_id) = query.blog_id {
            sql.push_str(" AND blog_id = ?");
            binds.push(Value::Text(blog_id.to_string()));
        }
        query.created_at.push_sql("created_at", &mut sql, &mut binds);
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        push_pagination(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }
        Ok(posts)
    }

    fn soft_delete_post(&self, id: PostId) -> RepoResult<DeletionReport> {
        soft_delete_one(self.conn, BLOG_RELATIONS, POSTS_TABLE, id)
    }

    fn create_comment(&self, draft: &NewComment) -> RepoResult<Comment> {
        draft.validate()?;
        ensure_visible(self.conn, POSTS_TABLE, draft.post_id)?;

        let id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO comments (id, content, post_id) VALUES (?1, ?2, ?3);",
            params![
                id.to_string(),
                draft.content.as_str(),
                draft.post_id.to_string()
            ],
        )?;
        self.load_comment(id)
    }

    fn update_comment(&self, comment: &Comment) -> RepoResult<Comment> {
        comment.validate()?;
        ensure_visible(self.conn, POSTS_TABLE, comment.post_id)?;

        let changed = self.conn.execute(
            &format!(
                "UPDATE comments
                 SET content = ?2,
                     post_id = ?3,
                     updated_at = {NOW_EPOCH_MS_SQL}
                 WHERE id = ?1
                   AND deleted_at IS NULL;"
            ),
            params![
                comment.id.to_string(),
                comment.content.as_str(),
                comment.post_id.to_string()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                table: COMMENTS_TABLE,
                id: comment.id,
            });
        }
        self.load_comment(comment.id)
    }

    fn get_comment(&self, id: CommentId, include_deleted: bool) -> RepoResult<Option<Comment>> {
        self.conn
            .query_row(
                &format!("{COMMENT_SELECT_SQL} WHERE {SCOPED_BY_ID};"),
                params![id.to_string(), scope_flag(include_deleted)],
                |row| Ok(parse_comment_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_comments(&self, query: &CommentListQuery) -> RepoResult<Vec<Comment>> {
        let mut sql = format!("{COMMENT_SELECT_SQL} WHERE 1 = 1");
        let mut binds: Vec<Value> = Vec::new();
        push_visibility(&mut sql, query.include_deleted);
        if let Some(post_id) = query.post_id {
            sql.push_str(" AND post_id = ?");
            binds.push(Value::Text(post_id.to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        push_pagination(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(parse_comment_row(row)?);
        }
        Ok(comments)
    }

    fn soft_delete_comment(&self, id: CommentId) -> RepoResult<DeletionReport> {
        soft_delete_one(self.conn, BLOG_RELATIONS, COMMENTS_TABLE, id)
    }
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<Post> {
    let id_text: String = row.get("id")?;
    let blog_text: String = row.get("blog_id")?;
    Ok(Post {
        id: parse_uuid(&id_text, "posts.id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        blog_id: parse_uuid(&blog_text, "posts.blog_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn parse_comment_row(row: &Row<'_>) -> RepoResult<Comment> {
    let id_text: String = row.get("id")?;
    let post_text: String = row.get("post_id")?;
    Ok(Comment {
        id: parse_uuid(&id_text, "comments.id")?,
        content: row.get("content")?,
        post_id: parse_uuid(&post_text, "comments.post_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
