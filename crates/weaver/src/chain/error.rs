//! Errors crossing an interceptor chain.

use std::error::Error;

use thiserror::Error;

/// Failure of an intercepted call.
///
/// Errors raised by advice or by the member body travel through the chain
/// unchanged inside [`InvocationError::Raised`].
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Error raised by advice or by the member body.
    #[error("{0}")]
    Raised(Box<dyn Error + 'static>),
    /// `proceed` was called while no invocation of the chain was active.
    #[error("cannot proceed: no invocation of {member} is running")]
    NotRunning {
        /// Description of the intercepted member.
        member: String,
    },
}

impl InvocationError {
    /// Wrap an application error.
    pub fn raise(error: impl Error + 'static) -> Self {
        Self::Raised(Box::new(error))
    }

    /// Borrow the raised error as `E`, if it is one.
    #[must_use]
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Raised(error) => error.downcast_ref::<E>(),
            Self::NotRunning { .. } => None,
        }
    }
}
