//! Blog, post and comment use-case services.
//!
//! # Responsibility
//! - Normalize names and titles before persistence.
//! - Turn raw `created_at` day filters into repository queries.
//! - Route every destroy operation through logical deletion.
//!
//! # Invariants
//! - No service API removes a blog, post or comment row physically.

use crate::db::relations::{BLOGS_TABLE, COMMENTS_TABLE, POSTS_TABLE};
use crate::filter::DateRange;
use crate::model::blog::{
    Blog, BlogId, Comment, CommentId, NewBlog, NewComment, NewPost, Post, PostId, User, UserId,
};
use crate::repo::blog_repo::{BlogListQuery, BlogRepository};
use crate::repo::deletion::DeletionReport;
use crate::repo::post_repo::{CommentListQuery, PostListQuery, PostRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::normalize_text;

/// Use-case service for owners and blogs.
pub struct BlogService<R: BlogRepository> {
    repo: R,
}

impl<R: BlogRepository> BlogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn register_user(&self, username: impl Into<String>) -> RepoResult<User> {
        self.repo.create_user(&normalize_text(username.into()))
    }

    pub fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.get_user(id)
    }

    pub fn create_blog(&self, owner_id: UserId, name: impl Into<String>) -> RepoResult<Blog> {
        self.repo
            .create_blog(&NewBlog::new(owner_id, normalize_text(name.into())))
    }

    /// Renames a visible blog.
    pub fn rename_blog(&self, id: BlogId, name: impl Into<String>) -> RepoResult<Blog> {
        let mut blog = self.repo.get_blog(id, false)?.ok_or(RepoError::NotFound {
            table: BLOGS_TABLE,
            id,
        })?;
        blog.name = normalize_text(name.into());
        self.repo.update_blog(&blog)
    }

    pub fn get_blog(&self, id: BlogId, include_deleted: bool) -> RepoResult<Option<Blog>> {
        self.repo.get_blog(id, include_deleted)
    }

    pub fn list_blogs(&self, query: &BlogListQuery) -> RepoResult<Vec<Blog>> {
        self.repo.list_blogs(query)
    }

    /// Lists blogs whose `created_at` falls within raw `YYYY-MM-DD` bounds.
    ///
    /// Blank or missing bounds are open.
    pub fn list_blogs_created_between(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        include_deleted: bool,
    ) -> RepoResult<Vec<Blog>> {
        let query = BlogListQuery {
            created_at: DateRange::parse(from, to)?,
            include_deleted,
            ..BlogListQuery::default()
        };
        self.repo.list_blogs(&query)
    }

    /// Soft-deletes one blog together with its posts and comments.
    pub fn delete_blog(&self, id: BlogId) -> RepoResult<DeletionReport> {
        self.repo.soft_delete_blog(id)
    }

    /// Soft-deletes every visible blog matching `query` as one event.
    pub fn delete_blogs_matching(&self, query: &BlogListQuery) -> RepoResult<DeletionReport> {
        self.repo.soft_delete_blogs(query)
    }
}

/// Use-case service for posts and comments.
pub struct PostService<R: PostRepository> {
    repo: R,
}

impl<R: PostRepository> PostService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_post(
        &self,
        blog_id: BlogId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> RepoResult<Post> {
        self.repo.create_post(&NewPost::new(
            blog_id,
            normalize_text(title.into()),
            content,
        ))
    }

    /// Replaces title and content of a visible post.
    pub fn edit_post(
        &self,
        id: PostId,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> RepoResult<Post> {
        let mut post = self.repo.get_post(id, false)?.ok_or(RepoError::NotFound {
            table: POSTS_TABLE,
            id,
        })?;
        post.title = normalize_text(title.into());
        post.content = content.into();
        self.repo.update_post(&post)
    }

    pub fn get_post(&self, id: PostId, include_deleted: bool) -> RepoResult<Option<Post>> {
        self.repo.get_post(id, include_deleted)
    }

    pub fn list_posts(&self, query: &PostListQuery) -> RepoResult<Vec<Post>> {
        self.repo.list_posts(query)
    }

    /// Soft-deletes a post together with its comments.
    pub fn delete_post(&self, id: PostId) -> RepoResult<DeletionReport> {
        self.repo.soft_delete_post(id)
    }

    pub fn add_comment(&self, post_id: PostId, content: impl Into<String>) -> RepoResult<Comment> {
        self.repo
            .create_comment(&NewComment::new(post_id, normalize_text(content.into())))
    }

    pub fn edit_comment(&self, id: CommentId, content: impl Into<String>) -> RepoResult<Comment> {
        let mut comment = self
            .repo
            .get_comment(id, false)?
            .ok_or(RepoError::NotFound {
                table: COMMENTS_TABLE,
                id,
            })?;
        comment.content = normalize_text(content.into());
        self.repo.update_comment(&comment)
    }

    pub fn get_comment(&self, id: CommentId, include_deleted: bool) -> RepoResult<Option<Comment>> {
        self.repo.get_comment(id, include_deleted)
    }

    pub fn list_comments(&self, query: &CommentListQuery) -> RepoResult<Vec<Comment>> {
        self.repo.list_comments(query)
    }

    pub fn delete_comment(&self, id: CommentId) -> RepoResult<DeletionReport> {
        self.repo.soft_delete_comment(id)
    }
}
