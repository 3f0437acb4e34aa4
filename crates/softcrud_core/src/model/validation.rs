//! Field validation shared by todo and blog models.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length for short text columns (names, titles).
pub const SHORT_TEXT_MAX_CHARS: usize = 255;
/// Maximum length for usernames.
pub const USERNAME_MAX_CHARS: usize = 150;

/// Input rejected before any SQL mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty after trim.
    Blank { field: &'static str },
    /// Text exceeds the column limit.
    TooLong {
        field: &'static str,
        max_chars: usize,
        actual_chars: usize,
    },
    /// Date filter value is not a `YYYY-MM-DD` day.
    InvalidDate { field: &'static str, value: String },
    /// Range lower bound is after its upper bound.
    InvertedRange { from: i64, to: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::TooLong {
                field,
                max_chars,
                actual_chars,
            } => write!(
                f,
                "{field} must be at most {max_chars} characters, got {actual_chars}"
            ),
            Self::InvalidDate { field, value } => {
                write!(f, "{field} must be a YYYY-MM-DD date, got `{value}`")
            }
            Self::InvertedRange { from, to } => {
                write!(f, "range start {from} is after range end {to}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks that `value` is non-blank and within `max_chars`.
pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_chars: Option<usize>,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    limit_text(field, value, max_chars)
}

/// Checks an optional text column, allowing `None` and empty values.
pub(crate) fn limit_optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => limit_text(field, value, Some(max_chars)),
        None => Ok(()),
    }
}

fn limit_text(
    field: &'static str,
    value: &str,
    max_chars: Option<usize>,
) -> Result<(), ValidationError> {
    let Some(max_chars) = max_chars else {
        return Ok(());
    };
    let actual_chars = value.chars().count();
    if actual_chars > max_chars {
        return Err(ValidationError::TooLong {
            field,
            max_chars,
            actual_chars,
        });
    }
    Ok(())
}
