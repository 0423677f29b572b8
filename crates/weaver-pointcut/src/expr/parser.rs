use super::ast::Expr;
use super::lexer::{Lexer, Token, TokenKind};
use crate::errors::SyntaxError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Operator {
    And,
    Or,
}

impl Operator {
    fn from_token(kind: &TokenKind) -> Option<Self> {
        match kind {
            TokenKind::And => Some(Self::And),
            TokenKind::Or => Some(Self::Or),
            _ => None,
        }
    }

    /// Left and right binding powers; `|` binds weaker than `&`.
    const fn binding_power(self) -> (u8, u8) {
        match self {
            Self::Or => (1, 2),
            Self::And => (3, 4),
        }
    }

    fn build(self, lhs: Expr, rhs: Expr) -> Expr {
        match self {
            Self::And => Expr::and(lhs, rhs),
            Self::Or => Expr::or(lhs, rhs),
        }
    }
}

pub(super) struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    pub(super) fn new(input: &'a str) -> Result<Self, SyntaxError> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    pub(super) fn parse_expression(&mut self) -> Result<Expr, SyntaxError> {
        self.parse_binary(0, false)
    }

    pub(super) fn expect_end(&self) -> Result<(), SyntaxError> {
        if matches!(self.current.kind, TokenKind::End) {
            Ok(())
        } else {
            Err(SyntaxError::new(
                self.current.start,
                format!("unexpected token {}", self.current.describe()),
            ))
        }
    }

    fn advance(&mut self) -> Result<(), SyntaxError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// Precedence climbing over `&` and `|`.
    ///
    /// `min_bp == 0` means the operand about to be read opens an expression;
    /// a group in that position, or one followed by `&`, is restricted to
    /// intersections.
    fn parse_binary(&mut self, min_bp: u8, inside_parenthesis: bool) -> Result<Expr, SyntaxError> {
        let mut lhs = self.parse_operand(min_bp == 0, inside_parenthesis)?;
        while let Some(op) = Operator::from_token(&self.current.kind) {
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            if op == Operator::Or && inside_parenthesis {
                return Err(SyntaxError::new(
                    self.current.start,
                    "only intersections allowed in the group",
                ));
            }
            self.advance()?;
            let rhs = self.parse_binary(r_bp, inside_parenthesis)?;
            lhs = op.build(lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_operand(
        &mut self,
        leading: bool,
        inside_parenthesis: bool,
    ) -> Result<Expr, SyntaxError> {
        match self.current.clone() {
            Token {
                kind: TokenKind::Identifier(text),
                ..
            } => {
                self.advance()?;
                Ok(Expr::Identifier(text))
            }
            Token {
                kind: TokenKind::LParen,
                start,
            } => {
                let restricted = leading || inside_parenthesis || self.group_precedes_and();
                self.advance()?;
                let expr = self.parse_binary(0, restricted)?;
                if matches!(self.current.kind, TokenKind::RParen) {
                    self.advance()?;
                    Ok(expr)
                } else {
                    Err(SyntaxError::new(start, "missing ')'"))
                }
            }
            Token {
                kind: TokenKind::End,
                start,
            } => Err(SyntaxError::new(start, "expected identifier or '('")),
            token => Err(SyntaxError::new(
                token.start,
                format!("expected identifier or '(' but found {}", token.describe()),
            )),
        }
    }

    /// Whether the group opened by the current `(` is followed by `&`.
    ///
    /// Scans a copy of the lexer; lexing errors are left for the real pass
    /// to report.
    fn group_precedes_and(&self) -> bool {
        let mut lookahead = self.lexer.clone();
        let mut depth = 1_usize;
        while let Ok(token) = lookahead.next_token() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return lookahead
                            .next_token()
                            .is_ok_and(|next| next.kind == TokenKind::And);
                    }
                }
                TokenKind::End => return false,
                _ => {}
            }
        }
        false
    }
}
