//! Translation of designators into filters.

use std::sync::{Arc, Mutex, PoisonError};

use hashbrown::HashMap;
use log::trace;
use regex::Regex;
use weaver_pointcut::{
    Designator, Expr, MemberPattern, PointcutError, TypePattern, build_name_regex,
    build_type_regex, parse_designator,
};

use super::{Filter, TypeMatcher};
use crate::call_site::KindMask;

/// Regex cache shared by every filter a registry compiles.
///
/// Entries are keyed by regex source, so the same glob used in many
/// pointcuts compiles once.
#[derive(Debug, Default)]
pub struct PatternCache {
    entries: Mutex<HashMap<String, Arc<Regex>>>,
}

impl PatternCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the compiled regex for `source`, compiling it on first use.
    ///
    /// # Errors
    /// Returns the [`regex::Error`] raised by compilation; failures are not
    /// cached.
    pub fn get_or_compile(&self, source: &str) -> Result<Arc<Regex>, regex::Error> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(regex) = entries.get(source) {
            return Ok(Arc::clone(regex));
        }
        trace!("compiling pattern {source}");
        let regex = Arc::new(Regex::new(source)?);
        entries.insert(source.to_string(), Arc::clone(&regex));
        Ok(regex)
    }

    /// Number of distinct patterns compiled so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been compiled yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn type_matcher(pattern: &TypePattern, cache: &PatternCache) -> Result<TypeMatcher, PointcutError> {
    let regex = cache.get_or_compile(&pattern.regex_source()?)?;
    Ok(TypeMatcher::new(regex, pattern.include_subtypes))
}

fn member_filter(
    kind: KindMask,
    member: &MemberPattern,
    cache: &PatternCache,
) -> Result<Filter, PointcutError> {
    let mut parts = vec![
        Filter::Kind(kind),
        Filter::Static(member.is_static),
        Filter::Within(type_matcher(&member.owner, cache)?),
        Filter::Name {
            regex: cache.get_or_compile(&build_name_regex(&member.name)?)?,
            qualified: false,
        },
    ];
    if !member.visibility.is_empty() {
        parts.push(Filter::Visibility(member.visibility.clone()));
    }
    Ok(Filter::all(parts))
}

/// Build the filter selecting the join points of one designator.
///
/// # Errors
/// Returns [`PointcutError`] when a glob cannot be turned into a regex.
pub fn compile_designator(
    designator: &Designator,
    cache: &PatternCache,
) -> Result<Filter, PointcutError> {
    Ok(match designator {
        Designator::Execution(member) => member_filter(KindMask::METHOD, member, cache)?,
        Designator::Access(member) => member_filter(KindMask::PROPERTY, member, cache)?,
        Designator::Function(glob) => Filter::and(
            Filter::Kind(KindMask::FUNCTION),
            Filter::Name {
                regex: cache.get_or_compile(&build_type_regex(glob)?)?,
                qualified: true,
            },
        ),
        Designator::Initialization(owner) => Filter::and(
            Filter::Kind(KindMask::INSTANCE_INIT),
            Filter::Within(type_matcher(owner, cache)?),
        ),
        Designator::StaticInitialization(owner) => Filter::and(
            Filter::Kind(KindMask::STATIC_INIT),
            Filter::Within(type_matcher(owner, cache)?),
        ),
        Designator::Within(owner) => Filter::Within(type_matcher(owner, cache)?),
        Designator::ExecutionTag(tag) => Filter::Metadata {
            kinds: KindMask::METHOD,
            tag: tag.clone(),
        },
        Designator::AccessTag(tag) => Filter::Metadata {
            kinds: KindMask::PROPERTY,
            tag: tag.clone(),
        },
        Designator::Arguments(bound) => Filter::Arguments(*bound),
    })
}

/// Build the filter tree mirroring an expression.
///
/// # Errors
/// Returns [`PointcutError`] when a leaf cannot be interpreted or compiled.
pub fn compile_expr(expr: &Expr, cache: &PatternCache) -> Result<Filter, PointcutError> {
    match expr {
        Expr::Identifier(text) => compile_designator(&parse_designator(text)?, cache),
        Expr::And(lhs, rhs) => Ok(Filter::and(
            compile_expr(lhs, cache)?,
            compile_expr(rhs, cache)?,
        )),
        Expr::Or(lhs, rhs) => Ok(Filter::or(
            compile_expr(lhs, cache)?,
            compile_expr(rhs, cache)?,
        )),
    }
}
