//! Interceptor chains.
//!
//! One [`InterceptorChain`] exists per intercepted member and serves every
//! call to it. Call progress lives in the chain: the position in the advice
//! list, the receiver, and the arguments. A call that re-enters the chain
//! while another is in flight (the member recursing through its own woven
//! entry point) saves the outer frame and restores it on the way out.
//!
//! ```text
//! Idle --invoke--> Running --advice exhausted--> ProceedingToBody
//!   ^                                                   |
//!   +---------------- return or error -----------------+
//! ```
//!
//! Chain state is held in a `RefCell` and values are `Rc` based, so a chain
//! is confined to the thread that created it.

mod error;
mod invocation;
mod member;

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use log::trace;

use crate::Value;
use crate::advice::{Advice, AdviceFn, AdviceKind, AdvicePayload, AttachedAdvice, sort_advice};
use crate::call_site::{CallSite, DynamicContext};

pub use error::InvocationError;
pub use invocation::Invocation;
pub use member::{BoundCall, MemberBody};

/// Progress of the innermost active call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainPhase {
    /// No call is active.
    Idle,
    /// Advice are being traversed.
    Running,
    /// The advice list is exhausted and the member body runs.
    ProceedingToBody,
}

struct Frame {
    phase: ChainPhase,
    index: usize,
    instance: Option<Value>,
    arguments: Vec<Value>,
}

impl Frame {
    const fn idle() -> Self {
        Self {
            phase: ChainPhase::Idle,
            index: 0,
            instance: None,
            arguments: Vec::new(),
        }
    }
}

struct ChainState {
    phase: ChainPhase,
    index: usize,
    instance: Option<Value>,
    arguments: Vec<Value>,
    saved: Vec<Frame>,
    bound: Option<(Option<Value>, BoundCall)>,
    bindings: usize,
}

impl ChainState {
    const fn idle() -> Self {
        Self {
            phase: ChainPhase::Idle,
            index: 0,
            instance: None,
            arguments: Vec::new(),
            saved: Vec::new(),
            bound: None,
            bindings: 0,
        }
    }
}

fn same_instance(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Restores the enclosing frame when a call leaves the chain.
struct FrameGuard<'a> {
    chain: &'a InterceptorChain,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.chain.leave();
    }
}

/// Executable advice chain of one member.
///
/// # Examples
/// ```
/// use std::rc::Rc;
/// use weaver::{Advice, CallSite, InterceptorChain, MemberBody, Value};
///
/// let chain = InterceptorChain::from_advice(
///     CallSite::method("app.Calc", "double"),
///     [Advice::around("Audit", "pass", |invocation| invocation.proceed())],
///     MemberBody::new(|invocation| {
///         let n = invocation.argument_as::<i64>(0).map_or(0, |n| *n);
///         Ok(Rc::new(n * 2) as Value)
///     }),
/// );
/// let result = chain
///     .invoke(None, vec![Rc::new(21_i64) as Value])
///     .expect("call succeeds");
/// assert_eq!(result.downcast_ref::<i64>(), Some(&42));
/// ```
pub struct InterceptorChain {
    call_site: CallSite,
    advice: Vec<AttachedAdvice>,
    body: MemberBody,
    state: RefCell<ChainState>,
}

impl InterceptorChain {
    /// Build a chain; the advice are sorted into execution order.
    #[must_use]
    pub fn new(call_site: CallSite, mut advice: Vec<AttachedAdvice>, body: MemberBody) -> Self {
        sort_advice(&mut advice);
        Self {
            call_site,
            advice,
            body,
            state: RefCell::new(ChainState::idle()),
        }
    }

    /// Build a chain from unguarded advice.
    #[must_use]
    pub fn from_advice(
        call_site: CallSite,
        advice: impl IntoIterator<Item = Advice>,
        body: MemberBody,
    ) -> Self {
        let advice = advice
            .into_iter()
            .map(|advice| AttachedAdvice::unguarded(advice.into()))
            .collect();
        Self::new(call_site, advice, body)
    }

    /// Static facts about the member.
    #[must_use]
    pub const fn call_site(&self) -> &CallSite {
        &self.call_site
    }

    /// Attached advice in execution order.
    #[must_use]
    pub fn advice(&self) -> &[AttachedAdvice] {
        &self.advice
    }

    /// Phase of the innermost active call.
    #[must_use]
    pub fn phase(&self) -> ChainPhase {
        self.state.borrow().phase
    }

    /// Position of the next advice in the innermost active call.
    #[must_use]
    pub fn index(&self) -> usize {
        self.state.borrow().index
    }

    /// Number of enclosing calls saved by re-entry.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.borrow().saved.len()
    }

    /// How many times the member body has been bound to a receiver.
    #[must_use]
    pub fn bindings(&self) -> usize {
        self.state.borrow().bindings
    }

    /// Receiver of the innermost active call.
    #[must_use]
    pub fn instance(&self) -> Option<Value> {
        self.state.borrow().instance.clone()
    }

    /// Arguments of the innermost active call.
    #[must_use]
    pub fn arguments(&self) -> Vec<Value> {
        self.state.borrow().arguments.clone()
    }

    pub(crate) fn set_arguments(&self, arguments: Vec<Value>) {
        self.state.borrow_mut().arguments = arguments;
    }

    /// Call the member through its advice.
    ///
    /// Re-entrant calls are allowed; the enclosing call's progress is saved
    /// and restored when the nested call returns or fails.
    ///
    /// # Errors
    /// Propagates errors raised by advice or by the member body unchanged.
    pub fn invoke(
        &self,
        instance: Option<Value>,
        arguments: Vec<Value>,
    ) -> Result<Value, InvocationError> {
        self.enter(instance, arguments);
        let _frame = FrameGuard { chain: self };
        self.proceed()
    }

    /// Continue with the next applicable advice, or the member body once the
    /// advice are exhausted.
    ///
    /// # Errors
    /// Returns [`InvocationError::NotRunning`] outside an active call, and
    /// otherwise whatever the rest of the chain raises.
    pub fn proceed(&self) -> Result<Value, InvocationError> {
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                if state.phase == ChainPhase::Idle {
                    return Err(InvocationError::NotRunning {
                        member: self.call_site.to_string(),
                    });
                }
                let next = self.advice.get(state.index);
                if next.is_some() {
                    state.index += 1;
                }
                next
            };
            let Some(attached) = next else {
                return self.call_body();
            };
            let AdvicePayload::Interceptor(callback) = attached.advice.payload() else {
                continue;
            };
            if self.guard_allows(attached) {
                return self.run_advice(attached.advice.kind(), callback);
            }
        }
    }

    fn enter(&self, instance: Option<Value>, arguments: Vec<Value>) {
        let mut state = self.state.borrow_mut();
        if state.phase != ChainPhase::Idle {
            let frame = Frame {
                phase: state.phase,
                index: state.index,
                instance: state.instance.take(),
                arguments: mem::take(&mut state.arguments),
            };
            state.saved.push(frame);
            trace!("re-entering {} at depth {}", self.call_site, state.saved.len());
        }
        state.phase = ChainPhase::Running;
        state.index = 0;
        state.instance = instance;
        state.arguments = arguments;
    }

    fn leave(&self) {
        let mut state = self.state.borrow_mut();
        let frame = state.saved.pop().unwrap_or_else(Frame::idle);
        state.phase = frame.phase;
        state.index = frame.index;
        state.instance = frame.instance;
        state.arguments = frame.arguments;
    }

    fn guard_allows(&self, attached: &AttachedAdvice) -> bool {
        let Some(guard) = &attached.guard else {
            return true;
        };
        let state = self.state.borrow();
        let context = DynamicContext {
            call_site: &self.call_site,
            instance: state.instance.as_ref(),
            arguments: &state.arguments,
        };
        let allowed = guard.matches_dynamic(&context);
        if !allowed {
            trace!(
                "skipping {} on {}: call-time check failed",
                attached.advice.id(),
                self.call_site
            );
        }
        allowed
    }

    fn run_advice(&self, kind: AdviceKind, callback: &AdviceFn) -> Result<Value, InvocationError> {
        match kind {
            AdviceKind::Before => {
                callback(&Invocation::new(self))?;
                self.proceed()
            }
            AdviceKind::Around => callback(&Invocation::new(self)),
            AdviceKind::After => {
                let outcome = self.proceed();
                callback(&Invocation::with_outcome(self, outcome.as_ref().err()))?;
                outcome
            }
            AdviceKind::AfterThrowing => self.proceed().or_else(|error| {
                callback(&Invocation::with_outcome(self, Some(&error)))?;
                Err(error)
            }),
        }
    }

    fn call_body(&self) -> Result<Value, InvocationError> {
        let (instance, cached) = {
            let mut state = self.state.borrow_mut();
            state.phase = ChainPhase::ProceedingToBody;
            let cached = state
                .bound
                .as_ref()
                .filter(|(bound_to, _)| same_instance(bound_to.as_ref(), state.instance.as_ref()))
                .map(|(_, call)| Rc::clone(call));
            (state.instance.clone(), cached)
        };
        if let Some(call) = cached {
            return call(&Invocation::new(self));
        }
        trace!("binding {}", self.call_site);
        let call = self.body.bind(instance.as_ref())?;
        {
            let mut state = self.state.borrow_mut();
            state.bound = Some((instance, Rc::clone(&call)));
            state.bindings += 1;
        }
        call(&Invocation::new(self))
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self
            .advice
            .iter()
            .map(|attached| attached.advice.id())
            .collect();
        f.debug_struct("InterceptorChain")
            .field("call_site", &self.call_site)
            .field("advice", &ids)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
