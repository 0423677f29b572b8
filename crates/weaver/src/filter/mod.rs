//! Composable join-point filters.
//!
//! A [`Filter`] is a closed tree of predicates over a [`CallSite`]. Each node
//! reports the set of join-point kinds it can select through
//! [`Filter::kind`]; evaluating a call site whose kind falls outside that set
//! yields "no match" rather than an error.
//!
//! Evaluation is three-valued. Leaves that need call-time facts (argument
//! counts) answer [`Verdict::Maybe`] during static matching, so a pointcut
//! that *could* select a join point keeps it in the table and the decision
//! is finished by [`Filter::matches_dynamic`] when the chain runs.

mod compile;

use std::fmt;
use std::sync::{Arc, LazyLock};

use log::trace;
use regex::Regex;
use weaver_pointcut::{ArgumentCount, Visibility};

use crate::call_site::{CallSite, DynamicContext, KindMask};

pub use compile::{PatternCache, compile_designator, compile_expr};

static ALWAYS: LazyLock<Arc<Filter>> = LazyLock::new(|| Arc::new(Filter::True));

/// Outcome of evaluating a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    /// The join point is rejected.
    No,
    /// Only call-time context can decide.
    Maybe,
    /// The join point is selected.
    Yes,
}

impl Verdict {
    const fn from_bool(value: bool) -> Self {
        if value { Self::Yes } else { Self::No }
    }

    const fn negate(self) -> Self {
        match self {
            Self::No => Self::Yes,
            Self::Maybe => Self::Maybe,
            Self::Yes => Self::No,
        }
    }
}

/// Type-name predicate compiled from a type glob.
#[derive(Debug, Clone)]
pub struct TypeMatcher {
    regex: Arc<Regex>,
    include_subtypes: bool,
}

impl TypeMatcher {
    /// Wrap a compiled regex; `include_subtypes` also tests interfaces and
    /// traits.
    #[must_use]
    pub fn new(regex: Arc<Regex>, include_subtypes: bool) -> Self {
        Self {
            regex,
            include_subtypes,
        }
    }

    fn matches(&self, call_site: &CallSite) -> bool {
        self.regex.is_match(&call_site.owning_type)
            || (self.include_subtypes
                && call_site
                    .supertypes()
                    .any(|name| self.regex.is_match(name)))
    }
}

/// A predicate over join points.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Accepts every join point.
    True,
    /// Inverts its operand; the kind set is the operand's.
    Not(Box<Filter>),
    /// Both operands must accept.
    And(Box<Filter>, Box<Filter>),
    /// Either operand must accept.
    Or(Box<Filter>, Box<Filter>),
    /// Restricts the join-point kind.
    Kind(KindMask),
    /// Owning type (or, with subtypes, a supertype) matches.
    Within(TypeMatcher),
    /// Member name matches; `qualified` tests the dotted
    /// `namespace.name` form used by functions.
    Name {
        /// Compiled pattern.
        regex: Arc<Regex>,
        /// Whether to test the qualified name.
        qualified: bool,
    },
    /// Declared visibility is one of the listed values.
    Visibility(Vec<Visibility>),
    /// Member is static (`true`) or per-instance (`false`).
    Static(bool),
    /// Member carries a metadata tag.
    Metadata {
        /// Kinds the tag designator applies to.
        kinds: KindMask,
        /// Tag name.
        tag: String,
    },
    /// Number of call arguments; decided only with call-time context.
    Arguments(ArgumentCount),
}

impl Filter {
    /// Shared instance of the always-true filter.
    #[must_use]
    pub fn always() -> Arc<Self> {
        Arc::clone(&ALWAYS)
    }

    /// Negate a filter.
    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Conjunction of two filters.
    #[must_use]
    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    /// Disjunction of two filters.
    #[must_use]
    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Conjunction of every filter in `filters`; empty input yields
    /// [`Filter::True`].
    #[must_use]
    pub fn all(filters: impl IntoIterator<Item = Self>) -> Self {
        filters
            .into_iter()
            .reduce(Self::and)
            .unwrap_or(Self::True)
    }

    /// Kinds of join point this filter can select.
    #[must_use]
    pub fn kind(&self) -> KindMask {
        match self {
            Self::True | Self::Within(_) => KindMask::ALL,
            Self::Not(inner) => inner.kind(),
            Self::And(lhs, rhs) => lhs.kind() & rhs.kind(),
            Self::Or(lhs, rhs) => lhs.kind() | rhs.kind(),
            Self::Kind(mask) => *mask,
            Self::Name { .. } => KindMask::METHOD | KindMask::PROPERTY | KindMask::FUNCTION,
            Self::Visibility(_) | Self::Static(_) => KindMask::METHOD | KindMask::PROPERTY,
            Self::Metadata { kinds, .. } => *kinds,
            Self::Arguments(_) => {
                KindMask::METHOD | KindMask::FUNCTION | KindMask::INSTANCE_INIT
            }
        }
    }

    /// Whether any leaf needs call-time context.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::Arguments(_) => true,
            Self::Not(inner) => inner.is_dynamic(),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => lhs.is_dynamic() || rhs.is_dynamic(),
            _ => false,
        }
    }

    /// Static match: true unless the filter definitely rejects the join
    /// point.
    ///
    /// Dynamic leaves count as satisfiable here; a filter with no call-time
    /// context to consult therefore behaves as its static part alone.
    #[must_use]
    pub fn matches(&self, call_site: &CallSite) -> bool {
        self.evaluate(call_site, None) != Verdict::No
    }

    /// Full match with call-time context.
    ///
    /// Callers consult this only for join points that already passed
    /// [`Filter::matches`].
    #[must_use]
    pub fn matches_dynamic(&self, context: &DynamicContext<'_>) -> bool {
        self.evaluate(context.call_site, Some(context)) == Verdict::Yes
    }

    /// Evaluate the filter, resolving dynamic leaves when `context` is given.
    #[must_use]
    pub fn evaluate(&self, call_site: &CallSite, context: Option<&DynamicContext<'_>>) -> Verdict {
        self.eval(call_site, context).0
    }

    /// Single pass over the tree.
    ///
    /// Also reports whether the call site's kind lies inside [`Filter::kind`]
    /// of this node; a node outside its kind set answers [`Verdict::No`], even
    /// under a negation.
    fn eval(&self, call_site: &CallSite, context: Option<&DynamicContext<'_>>) -> (Verdict, bool) {
        match self {
            Self::Not(inner) => match inner.eval(call_site, context) {
                (verdict, true) => (verdict.negate(), true),
                outside => outside,
            },
            Self::And(lhs, rhs) => match lhs.eval(call_site, context) {
                (Verdict::No, in_kind) => (
                    Verdict::No,
                    in_kind && rhs.kind().contains(call_site.kind),
                ),
                (left, _) => {
                    let (right, in_kind) = rhs.eval(call_site, context);
                    (left.min(right), in_kind)
                }
            },
            Self::Or(lhs, rhs) => match lhs.eval(call_site, context) {
                (Verdict::Yes, _) => (Verdict::Yes, true),
                (left, left_in_kind) => {
                    let (right, right_in_kind) = rhs.eval(call_site, context);
                    (left.max(right), left_in_kind || right_in_kind)
                }
            },
            leaf => {
                let mask = leaf.kind();
                if mask.contains(call_site.kind) {
                    (leaf.eval_leaf(call_site, context), true)
                } else {
                    trace!("{leaf} skips {call_site}: kind outside {mask:?}");
                    (Verdict::No, false)
                }
            }
        }
    }

    fn eval_leaf(&self, call_site: &CallSite, context: Option<&DynamicContext<'_>>) -> Verdict {
        match self {
            Self::True | Self::Kind(_) => Verdict::Yes,
            // composites are resolved by `eval`
            Self::Not(_) | Self::And(..) | Self::Or(..) => Verdict::No,
            Self::Within(matcher) => Verdict::from_bool(matcher.matches(call_site)),
            Self::Name { regex, qualified } => Verdict::from_bool(if *qualified {
                regex.is_match(&call_site.qualified_name())
            } else {
                regex.is_match(&call_site.member_name)
            }),
            Self::Visibility(accepted) => {
                Verdict::from_bool(accepted.contains(&call_site.visibility))
            }
            Self::Static(is_static) => Verdict::from_bool(call_site.is_static == *is_static),
            Self::Metadata { tag, .. } => {
                Verdict::from_bool(call_site.metadata_tags.contains(tag))
            }
            Self::Arguments(bound) => context.map_or(Verdict::Maybe, |ctx| {
                Verdict::from_bool(bound.accepts(ctx.arguments.len()))
            }),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("true"),
            Self::Not(inner) => write!(f, "!({inner})"),
            Self::And(lhs, rhs) => write!(f, "({lhs} & {rhs})"),
            Self::Or(lhs, rhs) => write!(f, "({lhs} | {rhs})"),
            Self::Kind(mask) => write!(f, "kind{mask:?}"),
            Self::Within(matcher) => {
                let plus = if matcher.include_subtypes { "+" } else { "" };
                write!(f, "within/{}/{plus}", matcher.regex.as_str())
            }
            Self::Name { regex, .. } => write!(f, "name/{}/", regex.as_str()),
            Self::Visibility(accepted) => write!(f, "visibility{accepted:?}"),
            Self::Static(is_static) => write!(f, "static({is_static})"),
            Self::Metadata { tag, .. } => write!(f, "@{tag}"),
            Self::Arguments(bound) => write!(f, "args{bound:?}"),
        }
    }
}

#[cfg(test)]
mod tests;
