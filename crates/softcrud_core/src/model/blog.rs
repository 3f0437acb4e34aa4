//! Blog, post and comment records with logical deletion state.
//!
//! # Invariants
//! - `deleted_at = None` means visible; `Some(ts)` means logically deleted at
//!   `ts` epoch ms.
//! - Rows are never physically removed by core APIs.

use crate::model::validation::{
    require_text, ValidationError, SHORT_TEXT_MAX_CHARS, USERNAME_MAX_CHARS,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type BlogId = Uuid;
pub type PostId = Uuid;
pub type CommentId = Uuid;

/// Blog owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub created_at: i64,
}

/// Validates a username before insert.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    require_text("username", username, Some(USERNAME_MAX_CHARS))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    pub id: BlogId,
    pub name: String,
    pub owner_id: UserId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Blog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, Some(SHORT_TEXT_MAX_CHARS))
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlog {
    pub name: String,
    pub owner_id: UserId,
}

impl NewBlog {
    pub fn new(owner_id: UserId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner_id,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, Some(SHORT_TEXT_MAX_CHARS))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub blog_id: BlogId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Post {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, Some(SHORT_TEXT_MAX_CHARS))
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub blog_id: BlogId,
    pub title: String,
    /// Free text body; may be empty.
    #[serde(default)]
    pub content: String,
}

impl NewPost {
    pub fn new(blog_id: BlogId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            blog_id,
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, Some(SHORT_TEXT_MAX_CHARS))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub post_id: PostId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Comment {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content, None)
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub content: String,
}

impl NewComment {
    pub fn new(post_id: PostId, content: impl Into<String>) -> Self {
        Self {
            post_id,
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content, None)
    }
}
