//! Pointcut expression utilities for weaver.
//!
//! The crate turns pointcut text into an expression tree, interprets leaf
//! identifiers as designators, and builds the anchored regular expressions
//! used by the runtime crate's filters. It carries no runtime state so the
//! same code can serve both registration-time validation and tooling.

mod designator;
mod errors;
mod expr;

pub use designator::{
    ArgumentCount, Designator, MemberPattern, TypePattern, Visibility, build_name_regex,
    build_type_regex, parse_designator,
};
pub use errors::{DesignatorErrorInfo, PointcutError, SyntaxError};
pub use expr::{Expr, Lexer, Token, TokenKind, parse};

/// Parse pointcut text and interpret every leaf identifier.
///
/// Returns the expression tree together with the designators of its leaves
/// in source order.
///
/// # Errors
/// Returns [`PointcutError::Syntax`] for malformed text and
/// [`PointcutError::Designator`] for leaves that cannot be interpreted.
///
/// # Examples
/// ```
/// use weaver_pointcut::parse_pointcut;
///
/// let (expr, leaves) = parse_pointcut("execution:app.Repo->find* & args:1")
///     .expect("valid pointcut");
/// assert_eq!(leaves.len(), 2);
/// assert_eq!(expr.identifiers().count(), 2);
/// ```
pub fn parse_pointcut(text: &str) -> Result<(Expr, Vec<Designator>), PointcutError> {
    let expr = parse(text)?;
    let leaves = expr
        .identifiers()
        .map(parse_designator)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((expr, leaves))
}
