//! Aspect weaving runtime.
//!
//! Aspects register advice against pointcut expressions. For every
//! compilation unit the [`AspectRegistry`] matches the registered pointcuts
//! against the unit's call sites and produces a [`JoinPointTable`] mapping
//! each intercepted member to its ordered advice. At call time an
//! [`InterceptorChain`] runs those advice around the member body, with
//! `proceed` handing control to the next advice or to the body itself.
//!
//! Pointcut text is parsed by the companion `weaver-pointcut` crate; its
//! expression and error types are re-exported here.
//!
//! # Examples
//! ```
//! use std::rc::Rc;
//! use weaver::{Advice, AspectRegistry, CallSite, CompilationUnit, MemberBody, MemberKey, Value};
//!
//! let mut registry = AspectRegistry::new();
//! registry
//!     .register_advice(
//!         "execution:app.Calc->add",
//!         Advice::around("Doubler", "twice", |invocation| {
//!             let sum = invocation.proceed()?;
//!             let sum = sum.downcast_ref::<i64>().copied().unwrap_or_default();
//!             Ok(Rc::new(sum * 2) as Value)
//!         }),
//!     )
//!     .expect("valid pointcut");
//!
//! let site = CallSite::method("app.Calc", "add");
//! let unit = CompilationUnit::new("src/Calc.php", [site.clone()]);
//! let table = registry.build_table(&unit).expect("table builds");
//!
//! let chain = table
//!     .chain(
//!         &MemberKey::of(&site),
//!         MemberBody::new(|invocation| {
//!             let a = invocation.argument_as::<i64>(0).map_or(0, |n| *n);
//!             let b = invocation.argument_as::<i64>(1).map_or(0, |n| *n);
//!             Ok(Rc::new(a + b) as Value)
//!         }),
//!     )
//!     .expect("member is woven");
//! let result = chain
//!     .invoke(None, vec![weaver::value(2_i64), weaver::value(3_i64)])
//!     .expect("call succeeds");
//! assert_eq!(result.downcast_ref::<i64>(), Some(&10));
//! ```

use std::any::Any;
use std::rc::Rc;

mod advice;
mod call_site;
mod chain;
mod config;
mod error;
mod filter;
mod registry;
mod table;

pub use advice::{
    Advice, AdviceFn, AdviceKind, AdvicePayload, AttachedAdvice, Introduction, compare_advice,
    sort_advice,
};
pub use call_site::{CallSite, CompilationUnit, DynamicContext, JoinPointKind, KindMask, Visibility};
pub use chain::{
    BoundCall, ChainPhase, InterceptorChain, Invocation, InvocationError, MemberBody,
};
pub use config::{
    MEMOIZE_TABLES_VAR, WARN_UNMATCHED_VAR, WeaverOptions, clear_warn_unmatched_override,
    set_warn_unmatched,
};
pub use error::WeaveError;
pub use filter::{Filter, PatternCache, TypeMatcher, Verdict, compile_designator, compile_expr};
pub use registry::AspectRegistry;
pub use table::{JoinPointTable, MemberKey, TableEntry};
pub use weaver_pointcut::{Expr, PointcutError, SyntaxError, parse, parse_pointcut};

/// Dynamically typed value passed through chains: receivers, arguments, and
/// results.
pub type Value = Rc<dyn Any>;

/// The value returned by members and advice that produce nothing.
#[must_use]
pub fn unit() -> Value {
    Rc::new(())
}

/// Wrap `value` for passing through a chain.
#[must_use]
pub fn value<T: Any>(value: T) -> Value {
    Rc::new(value)
}
