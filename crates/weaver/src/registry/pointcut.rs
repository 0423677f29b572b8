//! Pointcuts compiled for matching.

use std::sync::Arc;

use hashbrown::HashMap;
use weaver_pointcut::{Expr, PointcutError, parse_designator};

use crate::call_site::{CallSite, CompilationUnit, KindMask};
use crate::filter::{Filter, PatternCache, compile_designator, compile_expr};

/// One intersection of a pointcut, split by what its leaves inspect.
#[derive(Debug)]
struct Clause {
    type_level: Filter,
    member_level: Filter,
}

/// A pointcut ready to be matched against call sites.
///
/// `filter` mirrors the expression tree and serves as the call-time guard.
/// `clauses` hold the same predicate in disjunctive normal form so that
/// type-level leaves are evaluated once per owning type.
#[derive(Debug)]
pub(crate) struct CompiledPointcut {
    filter: Arc<Filter>,
    clauses: Vec<Clause>,
}

impl CompiledPointcut {
    pub(crate) fn compile(expr: &Expr, patterns: &PatternCache) -> Result<Self, PointcutError> {
        let filter = Arc::new(compile_expr(expr, patterns)?);
        let clauses = expr
            .clauses()
            .into_iter()
            .map(|identifiers| {
                let mut type_level = Vec::new();
                let mut member_level = Vec::new();
                for identifier in identifiers {
                    let designator = parse_designator(identifier)?;
                    let leaf = compile_designator(&designator, patterns)?;
                    if designator.is_type_level() {
                        type_level.push(leaf);
                    } else {
                        member_level.push(leaf);
                    }
                }
                Ok(Clause {
                    type_level: Filter::all(type_level),
                    member_level: Filter::all(member_level),
                })
            })
            .collect::<Result<Vec<_>, PointcutError>>()?;
        Ok(Self { filter, clauses })
    }

    pub(crate) fn kind(&self) -> KindMask {
        self.filter.kind()
    }

    /// Guard to attach when the pointcut has call-time leaves.
    pub(crate) fn guard(&self) -> Option<Arc<Filter>> {
        self.filter.is_dynamic().then(|| Arc::clone(&self.filter))
    }

    /// Call sites of `unit` the pointcut statically selects, paired with
    /// their enumeration position.
    ///
    /// Type-level verdicts are cached per owning type; every call site of a
    /// type is expected to report the same interfaces and traits.
    pub(crate) fn select<'u>(&self, unit: &'u CompilationUnit) -> Vec<(usize, &'u CallSite)> {
        let mask = self.kind();
        let mut type_verdicts: HashMap<&'u str, Vec<bool>> = HashMap::new();
        unit.call_sites()
            .iter()
            .enumerate()
            .filter(|(_, site)| mask.contains(site.kind))
            .filter(|&(_, site)| {
                let verdicts = type_verdicts
                    .entry(site.owning_type.as_str())
                    .or_insert_with(|| {
                        self.clauses
                            .iter()
                            .map(|clause| clause.type_level.matches(site))
                            .collect()
                    });
                self.clauses
                    .iter()
                    .zip(verdicts.iter())
                    .any(|(clause, &type_matches)| {
                        type_matches && clause.member_level.matches(site)
                    })
            })
            .collect()
    }
}
