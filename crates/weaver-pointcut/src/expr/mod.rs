//! Pointcut expression lexing, parsing, and printing.
//!
//! Grammar:
//!
//! ```text
//! expr := term (('&' | '|') term)*
//! term := IDENTIFIER | '(' expr ')'
//! ```
//!
//! `&` binds tighter than `|` and both associate to the left. A parenthesised
//! group that opens an expression or is followed by `&` may only hold an
//! intersection, and so may every group nested inside it. A union group is
//! therefore only accepted as the last operand of an intersection.

mod ast;
mod lexer;
mod parser;

pub use ast::Expr;
pub use lexer::{Lexer, Token, TokenKind};

use crate::errors::SyntaxError;
use parser::Parser;

/// Parse pointcut text into an expression tree.
///
/// # Errors
/// Returns [`SyntaxError`] when the text contains a disallowed literal, an
/// operator where an operand is expected, a union inside a leading group or
/// a group followed by `&`, a missing `)`, or trailing tokens.
///
/// # Examples
/// ```
/// use weaver_pointcut::{Expr, parse};
///
/// let expr = parse("A & (B | C)").expect("valid pointcut");
/// assert_eq!(
///     expr,
///     Expr::and(
///         Expr::identifier("A"),
///         Expr::or(Expr::identifier("B"), Expr::identifier("C")),
///     )
/// );
/// assert!(parse("(A | B) & C").is_err());
/// assert!(parse("x | (A | B) & C").is_err());
/// ```
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let mut parser = Parser::new(input)?;
    let root = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(root)
}
