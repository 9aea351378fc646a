//! Construction-time error taxonomy (spec.md §7).
//!
//! `Filter::from_text` never returns this type directly — it is carried
//! inside `Filter::Invalid { reason, .. }` so that `from_text` stays total
//! and memoizable, per spec.md's referential-transparency invariant.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("empty filter text")]
    Empty,
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(String),
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("conflicting option: {0}")]
    ConflictingOption(String),
}

impl From<regex::Error> for FilterParseError {
    fn from(e: regex::Error) -> Self {
        FilterParseError::InvalidRegex(e.to_string())
    }
}
