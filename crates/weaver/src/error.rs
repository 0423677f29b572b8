//! Error types raised while registering advice and building tables.

use thiserror::Error;
use weaver_pointcut::PointcutError;

/// Failures surfaced by the registry and option loading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WeaveError {
    /// Pointcut text was rejected at registration.
    #[error(transparent)]
    Pointcut(#[from] PointcutError),
    /// A pre-parsed expression failed to compile while building a table.
    #[error("pointcut `{pointcut}` cannot be compiled: {source}")]
    MalformedPointcut {
        /// Printed form of the offending expression.
        pointcut: String,
        /// Underlying interpretation failure.
        #[source]
        source: PointcutError,
    },
    /// An environment option held a value that is not a boolean.
    #[error("invalid value `{value}` for {name}; expected a boolean")]
    InvalidOption {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}
