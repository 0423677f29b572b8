//! Abstract syntax tree for pointcut expressions.
//!
//! A pointcut is a binary tree of `&` (intersection) and `|` (union) nodes
//! over identifier leaves. The tree is immutable once parsed and is freely
//! shared between threads.
//!
//! The canonical printer emits the minimal parenthesisation needed to parse
//! back to the same tree, and [`Expr::clauses`] flattens the tree into the
//! list of intersections the matcher evaluates.

use std::fmt;

/// Parsed pointcut expression.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A leaf identifier; interpreted later by the designator module.
    Identifier(String),
    /// Both operands must match.
    And(Box<Expr>, Box<Expr>),
    /// Either operand may match.
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Build a leaf node.
    #[must_use]
    pub fn identifier(text: impl Into<String>) -> Self {
        Self::Identifier(text.into())
    }

    /// Build an intersection node.
    #[must_use]
    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::And(Box::new(lhs), Box::new(rhs))
    }

    /// Build a union node.
    #[must_use]
    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Decompose the expression into a union of intersections.
    ///
    /// Each inner vector lists the identifiers of one intersection in source
    /// order. Intersections over a union are distributed, so `a & (b | c)`
    /// yields `[[a, b], [a, c]]`.
    ///
    /// # Examples
    /// ```
    /// use weaver_pointcut::parse;
    ///
    /// let expr = parse("a & b | c").expect("valid pointcut");
    /// assert_eq!(expr.clauses(), vec![vec!["a", "b"], vec!["c"]]);
    /// ```
    #[must_use]
    pub fn clauses(&self) -> Vec<Vec<&str>> {
        match self {
            Self::Identifier(text) => vec![vec![text.as_str()]],
            Self::Or(lhs, rhs) => {
                let mut clauses = lhs.clauses();
                clauses.extend(rhs.clauses());
                clauses
            }
            Self::And(lhs, rhs) => {
                let left = lhs.clauses();
                let right = rhs.clauses();
                let mut clauses = Vec::with_capacity(left.len().saturating_mul(right.len()));
                for l in &left {
                    for r in &right {
                        let mut clause = l.clone();
                        clause.extend(r.iter().copied());
                        clauses.push(clause);
                    }
                }
                clauses
            }
        }
    }

    /// Iterate over leaf identifiers in source order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                match node {
                    Self::Identifier(text) => return Some(text.as_str()),
                    Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                        stack.push(rhs);
                        stack.push(lhs);
                    }
                }
            }
            None
        })
    }

    /// Whether the canonical print of this tree satisfies the grouping rule
    /// of [`parse`](crate::parse).
    ///
    /// Trees built by hand may place a union where the parser only allows
    /// intersections, as the left operand of `&`. Such trees print as text
    /// that does not parse back.
    ///
    /// # Examples
    /// ```
    /// use weaver_pointcut::Expr;
    ///
    /// let a = || Expr::identifier("a");
    /// assert!(Expr::and(a(), Expr::or(a(), a())).is_well_grouped());
    /// assert!(!Expr::and(Expr::or(a(), a()), a()).is_well_grouped());
    /// ```
    #[must_use]
    pub fn is_well_grouped(&self) -> bool {
        match self {
            Self::Identifier(_) => true,
            Self::Or(lhs, rhs) => lhs.is_well_grouped() && rhs.is_well_grouped(),
            Self::And(lhs, rhs) => lhs.is_intersection() && rhs.is_well_grouped(),
        }
    }

    fn is_intersection(&self) -> bool {
        match self {
            Self::Identifier(_) => true,
            Self::And(lhs, rhs) => lhs.is_intersection() && rhs.is_intersection(),
            Self::Or(..) => false,
        }
    }

    const fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            Self::Identifier(_) => 3,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr, grouped: bool) -> fmt::Result {
    if grouped {
        write!(f, "({operand})")
    } else {
        write!(f, "{operand}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(text) => f.write_str(text),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                let own = self.precedence();
                // Left-associative: the left operand only needs a group when it
                // binds weaker, the right one also when it binds equally.
                write_operand(f, lhs, lhs.precedence() < own)?;
                f.write_str(if matches!(self, Self::And(..)) {
                    " & "
                } else {
                    " | "
                })?;
                write_operand(f, rhs, rhs.precedence() <= own)
            }
        }
    }
}
