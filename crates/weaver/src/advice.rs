//! Advice descriptors and their execution order.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::Value;
use crate::chain::{Invocation, InvocationError};
use crate::filter::Filter;

/// Callback run by an interceptor chain.
///
/// `before`, `after`, and `afterThrowing` callbacks return a value that the
/// chain discards; `around` callbacks return the result of the invocation.
pub type AdviceFn =
    Arc<dyn Fn(&Invocation<'_>) -> Result<Value, InvocationError> + Send + Sync>;

/// When an advice runs relative to the intercepted member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceKind {
    /// Runs first, then the chain proceeds.
    Before,
    /// Wraps the rest of the chain and decides whether to proceed.
    Around,
    /// Runs after the rest of the chain, whether or not it failed.
    After,
    /// Runs only when the rest of the chain failed; the error still
    /// propagates.
    AfterThrowing,
}

impl AdviceKind {
    /// Name used in logs and serialised tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Around => "around",
            Self::After => "after",
            Self::AfterThrowing => "afterThrowing",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Before => 0,
            Self::Around => 1,
            Self::After | Self::AfterThrowing => 2,
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interfaces and traits an introduction adds to matching types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Introduction {
    /// Interface names.
    pub interfaces: Vec<String>,
    /// Trait names.
    pub traits: Vec<String>,
}

/// What an advice contributes once attached.
#[derive(Clone)]
pub enum AdvicePayload {
    /// Code run by the interceptor chain.
    Interceptor(AdviceFn),
    /// Structural additions to a type; skipped by the chain.
    Introduction(Introduction),
}

impl fmt::Debug for AdvicePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interceptor(_) => f.write_str("Interceptor(..)"),
            Self::Introduction(intro) => f.debug_tuple("Introduction").field(intro).finish(),
        }
    }
}

/// An advice registered by an aspect.
///
/// # Examples
/// ```
/// use weaver::{Advice, AdviceKind};
///
/// let advice = Advice::around("Caching", "cacheLookup", |invocation| invocation.proceed())
///     .with_order(-5);
/// assert_eq!(advice.kind(), AdviceKind::Around);
/// assert_eq!(advice.id(), "Caching->cacheLookup");
/// ```
#[derive(Debug, Clone)]
pub struct Advice {
    aspect: String,
    name: String,
    kind: AdviceKind,
    order: i32,
    payload: AdvicePayload,
}

impl Advice {
    /// Build an advice from its parts.
    #[must_use]
    pub fn new(
        aspect: impl Into<String>,
        name: impl Into<String>,
        kind: AdviceKind,
        payload: AdvicePayload,
    ) -> Self {
        Self {
            aspect: aspect.into(),
            name: name.into(),
            kind,
            order: 0,
            payload,
        }
    }

    fn interceptor<F>(
        aspect: impl Into<String>,
        name: impl Into<String>,
        kind: AdviceKind,
        callback: F,
    ) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self::new(
            aspect,
            name,
            kind,
            AdvicePayload::Interceptor(Arc::new(callback)),
        )
    }

    /// Advice run before the member.
    #[must_use]
    pub fn before<F>(aspect: impl Into<String>, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self::interceptor(aspect, name, AdviceKind::Before, move |invocation| {
            callback(invocation).map(|()| crate::unit())
        })
    }

    /// Advice wrapping the member.
    #[must_use]
    pub fn around<F>(aspect: impl Into<String>, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        Self::interceptor(aspect, name, AdviceKind::Around, callback)
    }

    /// Advice run after the member, on success and on failure.
    #[must_use]
    pub fn after<F>(aspect: impl Into<String>, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self::interceptor(aspect, name, AdviceKind::After, move |invocation| {
            callback(invocation).map(|()| crate::unit())
        })
    }

    /// Advice run when the member fails; [`Invocation::raised`] exposes the
    /// error.
    #[must_use]
    pub fn after_throwing<F>(
        aspect: impl Into<String>,
        name: impl Into<String>,
        callback: F,
    ) -> Self
    where
        F: Fn(&Invocation<'_>) -> Result<(), InvocationError> + Send + Sync + 'static,
    {
        Self::interceptor(aspect, name, AdviceKind::AfterThrowing, move |invocation| {
            callback(invocation).map(|()| crate::unit())
        })
    }

    /// Introduction of interfaces and traits; sorts with before advice.
    #[must_use]
    pub fn introduction(
        aspect: impl Into<String>,
        name: impl Into<String>,
        introduction: Introduction,
    ) -> Self {
        Self::new(
            aspect,
            name,
            AdviceKind::Before,
            AdvicePayload::Introduction(introduction),
        )
    }

    /// Set the explicit order; lower runs earlier among advice of the same
    /// kind.
    #[must_use]
    pub const fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Owning aspect.
    #[must_use]
    pub fn aspect(&self) -> &str {
        &self.aspect
    }

    /// Advice name within its aspect.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Aspect->name`, unique per registered advice.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}->{}", self.aspect, self.name)
    }

    /// Execution kind.
    #[must_use]
    pub const fn kind(&self) -> AdviceKind {
        self.kind
    }

    /// Explicit order.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }

    /// Attached payload.
    #[must_use]
    pub const fn payload(&self) -> &AdvicePayload {
        &self.payload
    }

    /// Whether the advice is an introduction.
    #[must_use]
    pub const fn is_introduction(&self) -> bool {
        matches!(self.payload, AdvicePayload::Introduction(_))
    }
}

impl AsRef<Self> for Advice {
    fn as_ref(&self) -> &Self {
        self
    }
}

/// An advice attached to one join point.
///
/// `guard` holds the pointcut filter when it has call-time leaves; the chain
/// re-checks it on every invocation.
#[derive(Debug, Clone)]
pub struct AttachedAdvice {
    /// Shared descriptor.
    pub advice: Arc<Advice>,
    /// Dynamic residue to re-check at call time.
    pub guard: Option<Arc<Filter>>,
}

impl AttachedAdvice {
    /// Attach without a dynamic guard.
    #[must_use]
    pub const fn unguarded(advice: Arc<Advice>) -> Self {
        Self {
            advice,
            guard: None,
        }
    }
}

impl AsRef<Advice> for AttachedAdvice {
    fn as_ref(&self) -> &Advice {
        &self.advice
    }
}

/// Compare two advice by execution order.
///
/// Before advice come first, then around, then after and afterThrowing.
/// Within a group a lower explicit order runs earlier.
#[must_use]
pub fn compare_advice(a: &Advice, b: &Advice) -> Ordering {
    a.kind
        .rank()
        .cmp(&b.kind.rank())
        .then_with(|| a.order.cmp(&b.order))
}

/// Sort advice into execution order, keeping registration order for ties.
pub fn sort_advice<T: AsRef<Advice>>(advice: &mut [T]) {
    advice.sort_by(|a, b| compare_advice(a.as_ref(), b.as_ref()));
}
