//! Static parent/child relationship table for soft-deletable tables.
//!
//! Logical deletion consults this table instead of inspecting the schema at
//! runtime. Every listed table has `id TEXT` and `deleted_at INTEGER` columns.

pub const BLOGS_TABLE: &str = "blogs";
pub const POSTS_TABLE: &str = "posts";
pub const COMMENTS_TABLE: &str = "comments";

/// Every table carrying a `deleted_at` column.
pub const SOFT_DELETE_TABLES: &[&str] = &[BLOGS_TABLE, POSTS_TABLE, COMMENTS_TABLE];

/// What happens to active dependents when their parent is soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Dependents are soft-deleted with the parent, recursively.
    Cascade,
    /// The deletion is refused while any active dependent exists.
    Restrict,
}

/// One declared foreign key edge `child.foreign_key -> parent.id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub parent: &'static str,
    pub child: &'static str,
    pub foreign_key: &'static str,
    pub on_delete: OnDelete,
}

/// Relationships between the blog tables.
pub const BLOG_RELATIONS: &[Relation] = &[
    Relation {
        parent: BLOGS_TABLE,
        child: POSTS_TABLE,
        foreign_key: "blog_id",
        on_delete: OnDelete::Cascade,
    },
    Relation {
        parent: POSTS_TABLE,
        child: COMMENTS_TABLE,
        foreign_key: "post_id",
        on_delete: OnDelete::Cascade,
    },
];

/// Returns the edges whose parent is `table`, in declaration order.
pub fn dependents_of<'a>(
    relations: &'a [Relation],
    table: &'a str,
) -> impl Iterator<Item = &'a Relation> + 'a {
    relations.iter().filter(move |relation| relation.parent == table)
}
