//! Domain records for the todo and blogs backends.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Blog-side deletion is a `deleted_at` tombstone, todo-side deletion is
//!   physical.

pub mod blog;
pub mod todo;
pub mod validation;
