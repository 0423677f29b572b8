//! Error types shared by the pointcut lexing, parsing, and designator modules.

use std::fmt;
use thiserror::Error;

/// Malformed pointcut text.
///
/// Carries the zero-based byte offset where the problem was detected along
/// with a short reason.
///
/// # Examples
/// ```
/// use weaver_pointcut::SyntaxError;
/// let err = SyntaxError::new(4, "missing ')'");
/// assert_eq!(err.offset(), 4);
/// assert_eq!(err.reason(), "missing ')'");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    offset: usize,
    reason: String,
}

impl SyntaxError {
    /// Create a syntax error at `offset`.
    #[must_use]
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }

    /// Byte offset into the pointcut text.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Human-readable reason for the failure.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid pointcut at byte {}: {}",
            self.offset, self.reason
        )
    }
}

impl std::error::Error for SyntaxError {}

/// Context for a leaf identifier that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignatorErrorInfo {
    /// What was wrong with the identifier.
    pub message: &'static str,
    /// The offending identifier text.
    pub identifier: String,
}

impl fmt::Display for DesignatorErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in `{}`", self.message, self.identifier)
    }
}

/// Errors surfaced while turning pointcut text into matchable patterns.
///
/// # Examples
/// ```
/// use weaver_pointcut::{PointcutError, SyntaxError};
/// let err = PointcutError::from(SyntaxError::new(0, "expected identifier or '('"));
/// assert!(err.is_syntax());
/// ```
#[derive(Debug, Error)]
pub enum PointcutError {
    /// The expression text was malformed.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// A leaf identifier used an unknown designator or a malformed body.
    #[error("{0}")]
    Designator(DesignatorErrorInfo),
    /// A generated pattern failed to compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl PointcutError {
    /// Returns `true` when the text itself was malformed.
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}

pub(crate) fn designator_error(message: &'static str, identifier: &str) -> PointcutError {
    PointcutError::Designator(DesignatorErrorInfo {
        message,
        identifier: identifier.to_string(),
    })
}
