//! Core domain logic for the todo and blog backends.
//! This crate owns persistence, logical deletion and visibility rules.

pub mod config;
pub mod db;
pub mod filter;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use filter::DateRange;
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::blog::{
    Blog, BlogId, Comment, CommentId, NewBlog, NewComment, NewPost, Post, PostId, User, UserId,
};
pub use model::todo::{NewTask, NewTaskGroup, Task, TaskGroup, TaskGroupId, TaskId};
pub use model::validation::ValidationError;
pub use repo::blog_repo::{BlogListQuery, BlogRepository, SqliteBlogRepository};
pub use repo::deletion::DeletionReport;
pub use repo::post_repo::{CommentListQuery, PostListQuery, PostRepository, SqlitePostRepository};
pub use repo::todo_repo::{
    SqliteTodoRepository, TaskGroupListQuery, TaskListQuery, TodoRepository,
};
pub use repo::{table_counts, RepoError, RepoResult, TableCounts};
pub use service::blog_service::{BlogService, PostService};
pub use service::todo_service::TodoService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
