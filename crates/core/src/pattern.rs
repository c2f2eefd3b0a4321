//! Pattern evaluation.
//!
//! A pure function from `(input, pattern)` to a boolean decision. No state,
//! no I/O, safe to call concurrently.

use regex::Regex;
use thiserror::Error;

/// A pattern that could not be compiled as a regular expression.
///
/// Callers treat this as a terminal `Invalid` decision, not a crash.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("pattern failed to compile: {0}")]
pub struct PatternError(String);

impl PatternError {
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Check `input` against `pattern`.
///
/// The pattern's own anchoring semantics apply: a pattern without `^`/`$`
/// matches substrings. No anchors are added implicitly.
pub fn evaluate(input: &str, pattern: &str) -> Result<bool, PatternError> {
    let regex = Regex::new(pattern).map_err(|e| PatternError(e.to_string()))?;
    Ok(regex.is_match(input))
}
