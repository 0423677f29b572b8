//! The original member behind a chain.

use std::fmt;
use std::rc::Rc;

use super::{Invocation, InvocationError};
use crate::Value;

/// Member implementation bound to a receiver.
pub type BoundCall = Rc<dyn Fn(&Invocation<'_>) -> Result<Value, InvocationError>>;

type Binder = Box<dyn Fn(Option<&Value>) -> Result<BoundCall, InvocationError>>;

/// Produces the callable run once every advice has proceeded.
///
/// The binder receives the invocation's receiver. Chains cache the bound
/// callable and only call the binder again when the receiver changes.
pub struct MemberBody {
    binder: Binder,
}

impl MemberBody {
    /// Body that does not depend on the receiver.
    pub fn new(
        body: impl Fn(&Invocation<'_>) -> Result<Value, InvocationError> + 'static,
    ) -> Self {
        let body: BoundCall = Rc::new(body);
        Self::with_binder(move |_| Ok(Rc::clone(&body)))
    }

    /// Body resolved per receiver, e.g. by looking up a method on it.
    pub fn with_binder(
        binder: impl Fn(Option<&Value>) -> Result<BoundCall, InvocationError> + 'static,
    ) -> Self {
        Self {
            binder: Box::new(binder),
        }
    }

    pub(super) fn bind(&self, instance: Option<&Value>) -> Result<BoundCall, InvocationError> {
        (self.binder)(instance)
    }
}

impl fmt::Debug for MemberBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MemberBody(..)")
    }
}
