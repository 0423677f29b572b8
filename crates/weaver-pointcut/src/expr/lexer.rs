//! Tokenises pointcut text into identifiers, parentheses, and the `&`/`|`
//! operators.
//!
//! Identifiers are raw spans running up to the next reserved character, so
//! designator bodies such as `execution:public app.Repo->find*` survive as a
//! single token; interpreting them is left to the designator module. Literal
//! values (strings, numbers, booleans, `null`, arrays) are rejected here so the
//! parser never sees them.

use crate::errors::SyntaxError;

/// A token together with the byte offset where it starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// What was recognised.
    pub kind: TokenKind,
    /// Zero-based byte offset into the source text.
    pub start: usize,
}

impl Token {
    pub(super) fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Identifier(text) => format!("identifier `{text}`"),
            TokenKind::And => "'&'".to_string(),
            TokenKind::Or => "'|'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::End => "<end>".to_string(),
        }
    }
}

/// Token categories understood by the pointcut grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Raw identifier text, trimmed of surrounding whitespace.
    Identifier(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `&`
    And,
    /// `|`
    Or,
    /// End of input.
    End,
}

/// Lazy tokenizer over pointcut text.
///
/// # Examples
/// ```
/// use weaver_pointcut::{Lexer, TokenKind};
///
/// let mut lexer = Lexer::new("a & (b)");
/// let mut kinds = Vec::new();
/// loop {
///     let token = lexer.next_token().expect("valid pointcut text");
///     let done = token.kind == TokenKind::End;
///     kinds.push(token.kind);
///     if done {
///         break;
///     }
/// }
/// assert_eq!(kinds.len(), 6);
/// ```
#[derive(Clone, Debug)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Start tokenising `input` from its first byte.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Produce the next token.
    ///
    /// Once the input is exhausted every further call returns
    /// [`TokenKind::End`].
    ///
    /// # Errors
    /// Returns [`SyntaxError`] when a literal value appears where an
    /// identifier is expected.
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(ch) = self.peek_char() else {
            return Ok(Token {
                kind: TokenKind::End,
                start: self.input.len(),
            });
        };
        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '&' => TokenKind::And,
            '|' => TokenKind::Or,
            '"' | '\'' => {
                return Err(SyntaxError::new(start, "string literals are not allowed"));
            }
            '[' | ']' => {
                return Err(SyntaxError::new(start, "array literals are not allowed"));
            }
            _ => return self.lex_identifier(start),
        };
        self.pos += ch.len_utf8();
        Ok(Token { kind, start })
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos..).and_then(|s| s.chars().next())
    }

    fn lex_identifier(&mut self, start: usize) -> Result<Token, SyntaxError> {
        while let Some(ch) = self.peek_char() {
            if is_reserved(ch) {
                break;
            }
            self.pos += ch.len_utf8();
        }
        let text = self
            .input
            .get(start..self.pos)
            .ok_or_else(|| SyntaxError::new(start, "invalid identifier boundaries"))?
            .trim_end();
        if let Some(reason) = literal_kind(text) {
            return Err(SyntaxError::new(start, reason));
        }
        Ok(Token {
            kind: TokenKind::Identifier(text.to_string()),
            start,
        })
    }
}

fn is_reserved(ch: char) -> bool {
    matches!(ch, '(' | ')' | '&' | '|')
}

fn literal_kind(text: &str) -> Option<&'static str> {
    if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
        return Some("boolean literals are not allowed");
    }
    if text.eq_ignore_ascii_case("null") {
        return Some("null literals are not allowed");
    }
    if text.bytes().any(|b| b.is_ascii_digit()) && text.parse::<f64>().is_ok() {
        return Some("numeric literals are not allowed");
    }
    if text.contains(['"', '\'', '[', ']']) {
        return Some("literal values are not allowed inside identifiers");
    }
    None
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests exercise lexing fallibility")]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token().unwrap();
            if token.kind == TokenKind::End {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    fn ident(text: &str) -> TokenKind {
        TokenKind::Identifier(text.to_string())
    }

    #[test]
    fn tokenises_operators_and_groups() {
        assert_eq!(
            kinds("a&(b|c)"),
            vec![
                ident("a"),
                TokenKind::And,
                TokenKind::LParen,
                ident("b"),
                TokenKind::Or,
                ident("c"),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn keeps_interior_whitespace_in_identifiers() {
        assert_eq!(
            kinds("  execution:public app.Repo->find*  & within:app..*"),
            vec![
                ident("execution:public app.Repo->find*"),
                TokenKind::And,
                ident("within:app..*"),
            ]
        );
    }

    #[test]
    fn records_token_offsets() {
        let mut lexer = Lexer::new("ab | cd");
        assert_eq!(lexer.next_token().unwrap().start, 0);
        assert_eq!(lexer.next_token().unwrap().start, 3);
        assert_eq!(lexer.next_token().unwrap().start, 5);
        assert_eq!(lexer.next_token().unwrap().start, 7);
    }

    #[test]
    fn keeps_returning_end_after_exhaustion() {
        let mut lexer = Lexer::new("a");
        let _ = lexer.next_token().unwrap();
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn allows_digits_inside_identifiers() {
        assert_eq!(kinds("args:2"), vec![ident("args:2")]);
        assert_eq!(kinds("Http2Client"), vec![ident("Http2Client")]);
    }

    #[rstest]
    #[case::double_quoted("\"text\"", "string literals")]
    #[case::single_quoted("'text'", "string literals")]
    #[case::integer("42", "numeric literals")]
    #[case::float("3.5", "numeric literals")]
    #[case::boolean_true("true", "boolean literals")]
    #[case::boolean_false("FALSE", "boolean literals")]
    #[case::null("null", "null literals")]
    #[case::array("[a]", "array literals")]
    #[case::embedded_quote("a\"b", "literal values")]
    fn rejects_literal_tokens(#[case] input: &str, #[case] expected: &str) {
        let mut lexer = Lexer::new(input);
        let Err(err) = lexer.next_token() else {
            panic!("expected `{input}` to be rejected");
        };
        assert!(
            err.reason().contains(expected),
            "unexpected reason for `{input}`: {err}"
        );
    }
}
