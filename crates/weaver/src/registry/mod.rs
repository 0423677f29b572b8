//! Advice registration and join-point table construction.
//!
//! An [`AspectRegistry`] collects `(pointcut, advice)` pairs during a
//! start-up pass and turns each compilation unit's call sites into a
//! [`JoinPointTable`]. Tables are memoised per unit until more advice is
//! registered.

mod pointcut;

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use hashbrown::HashMap;
use log::{debug, warn};
use weaver_pointcut::{Expr, PointcutError, SyntaxError, parse};

use crate::advice::{Advice, AttachedAdvice};
use crate::call_site::CompilationUnit;
use crate::config::WeaverOptions;
use crate::error::WeaveError;
use crate::filter::PatternCache;
use crate::table::{JoinPointTable, TableBuilder};

use pointcut::CompiledPointcut;

struct RegisteredAdvice {
    expr: Expr,
    advice: Arc<Advice>,
    compiled: OnceLock<CompiledPointcut>,
}

impl RegisteredAdvice {
    fn compiled(&self, patterns: &PatternCache) -> Result<&CompiledPointcut, WeaveError> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }
        let malformed = |source| WeaveError::MalformedPointcut {
            pointcut: self.expr.to_string(),
            source,
        };
        if !self.expr.is_well_grouped() {
            // the printed form fails to parse and carries the precise offset
            let source = parse(&self.expr.to_string()).err().unwrap_or_else(|| {
                SyntaxError::new(0, "only intersections allowed in the group")
            });
            return Err(malformed(PointcutError::Syntax(source)));
        }
        let compiled = CompiledPointcut::compile(&self.expr, patterns).map_err(malformed)?;
        Ok(self.compiled.get_or_init(|| compiled))
    }
}

/// Registered advice and the tables built from them.
///
/// # Examples
/// ```
/// use weaver::{Advice, AspectRegistry, CallSite, CompilationUnit};
///
/// let mut registry = AspectRegistry::new();
/// registry
///     .register_advice(
///         "execution:app.Repo->find*",
///         Advice::before("Audit", "log", |_| Ok(())),
///     )
///     .expect("valid pointcut");
///
/// let unit = CompilationUnit::new(
///     "src/Repo.php",
///     [
///         CallSite::method("app.Repo", "findAll"),
///         CallSite::method("app.Repo", "save"),
///     ],
/// );
/// let table = registry.build_table(&unit).expect("table builds");
/// assert_eq!(table.len(), 1);
/// ```
pub struct AspectRegistry {
    options: WeaverOptions,
    patterns: PatternCache,
    entries: Vec<RegisteredAdvice>,
    tables: Mutex<HashMap<String, Arc<JoinPointTable>>>,
}

impl Default for AspectRegistry {
    fn default() -> Self {
        Self::with_options(WeaverOptions::default())
    }
}

impl AspectRegistry {
    /// Registry with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with explicit options.
    #[must_use]
    pub fn with_options(options: WeaverOptions) -> Self {
        Self {
            options,
            patterns: PatternCache::new(),
            entries: Vec::new(),
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Registry configured from `WEAVER_*` environment variables.
    ///
    /// # Errors
    /// Returns [`WeaveError::InvalidOption`] for unparsable values.
    pub fn from_env() -> Result<Self, WeaveError> {
        WeaverOptions::from_env().map(Self::with_options)
    }

    /// Active options.
    #[must_use]
    pub const fn options(&self) -> WeaverOptions {
        self.options
    }

    /// Regexes compiled for registered pointcuts.
    #[must_use]
    pub const fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Number of registered advice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `advice` for the join points selected by `pointcut`.
    ///
    /// The text is parsed and compiled immediately.
    ///
    /// # Errors
    /// Returns [`WeaveError::Pointcut`] for malformed text or leaves that
    /// cannot be interpreted; nothing is registered in that case.
    pub fn register_advice(
        &mut self,
        pointcut: &str,
        advice: impl Into<Arc<Advice>>,
    ) -> Result<(), WeaveError> {
        let expr = parse(pointcut).map_err(PointcutError::from)?;
        let compiled = CompiledPointcut::compile(&expr, &self.patterns)?;
        self.push(expr, advice.into(), OnceLock::from(compiled));
        Ok(())
    }

    /// Register `advice` for an already-parsed expression.
    ///
    /// Compilation is deferred to [`AspectRegistry::build_table`], which
    /// fails with [`WeaveError::MalformedPointcut`] if a leaf cannot be
    /// interpreted or the tree places a union where text could not (see
    /// [`Expr::is_well_grouped`]).
    pub fn register_expr(&mut self, expr: Expr, advice: impl Into<Arc<Advice>>) {
        self.push(expr, advice.into(), OnceLock::new());
    }

    fn push(&mut self, expr: Expr, advice: Arc<Advice>, compiled: OnceLock<CompiledPointcut>) {
        debug!("registered {} for `{expr}`", advice.id());
        self.entries.push(RegisteredAdvice {
            expr,
            advice,
            compiled,
        });
        self.tables
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Build, or fetch the memoised, join-point table for `unit`.
    ///
    /// Members without advice are left out of the table.
    ///
    /// # Errors
    /// Returns [`WeaveError::MalformedPointcut`] when a pointcut registered
    /// through [`AspectRegistry::register_expr`] is ill-grouped or cannot be
    /// compiled.
    pub fn build_table(&self, unit: &CompilationUnit) -> Result<Arc<JoinPointTable>, WeaveError> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        if self.options.memoize_tables {
            if let Some(table) = tables.get(unit.id()) {
                debug!("reusing join-point table for {}", unit.id());
                return Ok(Arc::clone(table));
            }
        }
        let table = Arc::new(self.match_unit(unit)?);
        debug!(
            "built join-point table for {}: {} of {} call sites woven",
            unit.id(),
            table.len(),
            unit.call_sites().len()
        );
        if self.options.memoize_tables {
            tables.insert(unit.id().to_string(), Arc::clone(&table));
        }
        Ok(table)
    }

    fn match_unit(&self, unit: &CompilationUnit) -> Result<JoinPointTable, WeaveError> {
        let mut builder = TableBuilder::new(unit.id());
        for entry in &self.entries {
            let pointcut = entry.compiled(&self.patterns)?;
            let selected = pointcut.select(unit);
            if selected.is_empty() {
                self.report_unmatched(entry, unit);
                continue;
            }
            let guard = pointcut.guard();
            for (position, call_site) in selected {
                builder.attach(
                    position,
                    call_site,
                    AttachedAdvice {
                        advice: Arc::clone(&entry.advice),
                        guard: guard.clone(),
                    },
                );
            }
        }
        Ok(builder.finish())
    }

    fn report_unmatched(&self, entry: &RegisteredAdvice, unit: &CompilationUnit) {
        if self.options.warn_unmatched {
            warn!(
                "pointcut `{}` of {} matched nothing in {}",
                entry.expr,
                entry.advice.id(),
                unit.id()
            );
        } else {
            debug!(
                "pointcut `{}` of {} matched nothing in {}",
                entry.expr,
                entry.advice.id(),
                unit.id()
            );
        }
    }
}
