//! Convert type and member-name globs into anchored regular-expression
//! sources.

use crate::errors::{PointcutError, designator_error};

/// Build an anchored regex source for a dotted type pattern.
///
/// `*` matches within one segment, `..` matches any number of whole
/// segments, and every other character is literal.
///
/// # Errors
/// Returns [`PointcutError::Designator`] when the pattern is empty, contains a
/// run of three or more dots, or uses characters outside identifiers, `.`,
/// and `*`.
///
/// # Examples
/// ```
/// use weaver_pointcut::build_type_regex;
///
/// let source = build_type_regex("app..*Service").expect("valid type pattern");
/// let regex = regex::Regex::new(&source).expect("valid regex");
/// assert!(regex.is_match("app.billing.InvoiceService"));
/// assert!(regex.is_match("app.Service"));
/// assert!(!regex.is_match("other.Service"));
/// ```
pub fn build_type_regex(pattern: &str) -> Result<String, PointcutError> {
    if pattern.is_empty() {
        return Err(designator_error("empty type pattern", pattern));
    }
    if pattern.contains("...") {
        return Err(designator_error(
            "more than two consecutive dots in type pattern",
            pattern,
        ));
    }
    if !pattern.chars().all(is_type_pattern_char) {
        return Err(designator_error("invalid character in type pattern", pattern));
    }

    let mut regex = String::with_capacity(pattern.len().saturating_mul(2) + 2);
    regex.push('^');
    let mut rest = pattern;
    let mut at_start = true;
    while let Some(ch) = rest.chars().next() {
        if let Some(tail) = rest.strip_prefix("..") {
            regex.push_str(match (at_start, tail.is_empty()) {
                (true, true) => ".*",
                (true, false) => r"(?:[^.]+\.)*",
                (false, true) => r"(?:\.[^.]+)*",
                (false, false) => r"\.(?:[^.]+\.)*",
            });
            rest = tail;
        } else {
            match ch {
                '.' => regex.push_str(r"\."),
                '*' => regex.push_str("[^.]*"),
                other => regex.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
            rest = rest.get(ch.len_utf8()..).unwrap_or_default();
        }
        at_start = false;
    }
    regex.push('$');
    Ok(regex)
}

/// Build an anchored regex source for a member-name pattern where `*`
/// matches any run of characters.
///
/// # Errors
/// Returns [`PointcutError::Designator`] when the pattern is empty or
/// contains characters other than identifier characters and `*`.
pub fn build_name_regex(pattern: &str) -> Result<String, PointcutError> {
    if pattern.is_empty() {
        return Err(designator_error("empty member-name pattern", pattern));
    }
    if !pattern.chars().all(|c| c == '*' || is_identifier_char(c)) {
        return Err(designator_error(
            "invalid character in member-name pattern",
            pattern,
        ));
    }
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for (index, literal) in pattern.split('*').enumerate() {
        if index > 0 {
            regex.push_str(".*");
        }
        regex.push_str(&regex::escape(literal));
    }
    regex.push('$');
    Ok(regex)
}

pub(crate) fn is_identifier_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '$')
}

fn is_type_pattern_char(ch: char) -> bool {
    is_identifier_char(ch) || matches!(ch, '.' | '*')
}
