//! `created_at` date-range predicate for list queries.
//!
//! # Invariants
//! - Both bounds are inclusive and optional.
//! - The predicate narrows a query; it never widens the visibility scope.

use crate::model::validation::ValidationError;
use chrono::NaiveDate;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const DAY_FORMAT: &str = "%Y-%m-%d";

/// Inclusive epoch-ms range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl DateRange {
    /// Range with both bounds set.
    pub fn between(from: i64, to: i64) -> Result<Self, ValidationError> {
        let range = Self {
            from: Some(from),
            to: Some(to),
        };
        range.validate()?;
        Ok(range)
    }

    pub fn since(from: i64) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn until(to: i64) -> Self {
        Self {
            from: None,
            to: Some(to),
        }
    }

    /// Parses `YYYY-MM-DD` day bounds as UTC days.
    ///
    /// `from` maps to the first millisecond of its day and `to` to the last,
    /// so a single day passed as both bounds matches that whole day. Blank
    /// values leave the bound open.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self, ValidationError> {
        let from = parse_day("created_at_from", from)?;
        let to = parse_day("created_at_to", to)?.map(|start| start + DAY_MS - 1);
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) if from > to => Err(ValidationError::InvertedRange { from, to }),
            _ => Ok(()),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, epoch_ms: i64) -> bool {
        self.from.map_or(true, |from| epoch_ms >= from) && self.to.map_or(true, |to| epoch_ms <= to)
    }

    /// Appends `AND column >= ? / <= ?` fragments and their bind values.
    pub(crate) fn push_sql(&self, column: &str, sql: &mut String, binds: &mut Vec<Value>) {
        if let Some(from) = self.from {
            sql.push_str(&format!(" AND {column} >= ?"));
            binds.push(Value::Integer(from));
        }
        if let Some(to) = self.to {
            sql.push_str(&format!(" AND {column} <= ?"));
            binds.push(Value::Integer(to));
        }
    }
}

fn parse_day(field: &'static str, value: Option<&str>) -> Result<Option<i64>, ValidationError> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };
    let invalid = || ValidationError::InvalidDate {
        field,
        value: raw.to_string(),
    };
    let day = NaiveDate::parse_from_str(raw, DAY_FORMAT).map_err(|_| invalid())?;
    let start = day.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(Some(start.and_utc().timestamp_millis()))
}
