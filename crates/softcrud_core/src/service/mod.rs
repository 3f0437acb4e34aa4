//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the operations a transport layer maps
//!   its verbs onto.
//! - Keep callers decoupled from storage details.

pub mod blog_service;
pub mod todo_service;

/// Trims surrounding whitespace; blank results are rejected later by model
/// validation.
pub(crate) fn normalize_text(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() == value.len() {
        return value;
    }
    trimmed.to_string()
}

/// Trims optional text and maps blank values to `None`.
pub(crate) fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(normalize_text)
        .filter(|value| !value.is_empty())
}
