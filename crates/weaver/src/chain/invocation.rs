//! Continuation handed to advice and member bodies.

use std::any::Any;
use std::rc::Rc;

use super::{InterceptorChain, InvocationError};
use crate::Value;
use crate::call_site::CallSite;

/// View of the running invocation.
///
/// Advice call [`Invocation::proceed`] to continue down the chain. Member
/// bodies reach the chain through [`Invocation::chain`] to recurse through
/// the intercepted member.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    chain: &'a InterceptorChain,
    raised: Option<&'a InvocationError>,
}

impl<'a> Invocation<'a> {
    pub(super) const fn new(chain: &'a InterceptorChain) -> Self {
        Self {
            chain,
            raised: None,
        }
    }

    pub(super) const fn with_outcome(
        chain: &'a InterceptorChain,
        raised: Option<&'a InvocationError>,
    ) -> Self {
        Self { chain, raised }
    }

    /// Run the rest of the chain and return its result.
    ///
    /// # Errors
    /// Propagates whatever the remaining advice or the member body raise.
    pub fn proceed(&self) -> Result<Value, InvocationError> {
        self.chain.proceed()
    }

    /// Chain running this invocation.
    #[must_use]
    pub const fn chain(&self) -> &'a InterceptorChain {
        self.chain
    }

    /// Static facts about the intercepted member.
    #[must_use]
    pub fn call_site(&self) -> &'a CallSite {
        self.chain.call_site()
    }

    /// Receiver of the current frame.
    #[must_use]
    pub fn instance(&self) -> Option<Value> {
        self.chain.instance()
    }

    /// Arguments of the current frame.
    #[must_use]
    pub fn arguments(&self) -> Vec<Value> {
        self.chain.arguments()
    }

    /// Argument at `position`.
    #[must_use]
    pub fn argument(&self, position: usize) -> Option<Value> {
        self.chain.arguments().get(position).cloned()
    }

    /// Argument at `position` downcast to `T`.
    #[must_use]
    pub fn argument_as<T: Any>(&self, position: usize) -> Option<Rc<T>> {
        self.argument(position)?.downcast::<T>().ok()
    }

    /// Replace the arguments seen by the rest of the chain.
    pub fn set_arguments(&self, arguments: Vec<Value>) {
        self.chain.set_arguments(arguments);
    }

    /// Error raised by the rest of the chain; set for `after` and
    /// `afterThrowing` advice.
    #[must_use]
    pub const fn raised(&self) -> Option<&'a InvocationError> {
        self.raised
    }
}
