//! Interpretation of leaf identifiers.
//!
//! Every identifier in a pointcut has the shape `designator:body`. The
//! designator picks which join points the leaf can select and the body
//! narrows them down by type, member name, visibility, metadata tag, or (for
//! the dynamic `args:` designator) the number of call arguments.
//!
//! | Designator              | Body                                          |
//! |-------------------------|-----------------------------------------------|
//! | `execution:`            | `[visibility..] Type->method` / `Type::method` |
//! | `access:`               | `[visibility..] Type->property` / `Type::property` |
//! | `function:`             | dotted function-name pattern                  |
//! | `initialization:`       | type pattern                                  |
//! | `staticinitialization:` | type pattern                                  |
//! | `within:`               | type pattern                                  |
//! | `@execution:`           | metadata tag                                  |
//! | `@access:`              | metadata tag                                  |
//! | `args:`                 | `N` or `N..`                                  |
//!
//! A trailing `+` on a type pattern also accepts declared interfaces and
//! traits.

mod glob;

use std::fmt;
use std::str::FromStr;

use crate::errors::{PointcutError, designator_error};

pub use glob::{build_name_regex, build_type_regex};

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    /// Visible everywhere.
    Public,
    /// Visible to the declaring type and its subtypes.
    Protected,
    /// Visible to the declaring type only.
    Private,
}

impl Visibility {
    /// Keyword used in pointcut text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = PointcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            "private" => Ok(Self::Private),
            other => Err(designator_error("unknown visibility modifier", other)),
        }
    }
}

/// Type-name pattern with an optional subtype marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePattern {
    /// Glob text without the trailing `+`.
    pub glob: String,
    /// Whether declared interfaces and traits also match.
    pub include_subtypes: bool,
}

impl TypePattern {
    fn parse(text: &str, identifier: &str) -> Result<Self, PointcutError> {
        let (glob, include_subtypes) = text
            .strip_suffix('+')
            .map_or((text, false), |glob| (glob, true));
        if glob.is_empty() {
            return Err(designator_error("missing type pattern", identifier));
        }
        // Validate eagerly so malformed globs fail at registration.
        build_type_regex(glob)?;
        Ok(Self {
            glob: glob.to_string(),
            include_subtypes,
        })
    }

    /// Anchored regex source for the glob.
    ///
    /// # Errors
    /// Returns [`PointcutError`] when the glob is malformed.
    pub fn regex_source(&self) -> Result<String, PointcutError> {
        build_type_regex(&self.glob)
    }
}

/// Pattern selecting members of matching types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberPattern {
    /// Accepted visibilities; empty accepts any.
    pub visibility: Vec<Visibility>,
    /// `::` selects static members, `->` instance members.
    pub is_static: bool,
    /// Owning type.
    pub owner: TypePattern,
    /// Member-name glob.
    pub name: String,
}

impl MemberPattern {
    fn parse(body: &str, identifier: &str) -> Result<Self, PointcutError> {
        let mut words: Vec<&str> = body.split_whitespace().collect();
        let Some(signature) = words.pop() else {
            return Err(designator_error("missing member pattern", identifier));
        };
        let visibility = words
            .into_iter()
            .map(str::parse)
            .collect::<Result<Vec<Visibility>, _>>()?;
        let (owner, name, is_static) = signature
            .split_once("->")
            .map(|(owner, name)| (owner, name, false))
            .or_else(|| {
                signature
                    .split_once("::")
                    .map(|(owner, name)| (owner, name, true))
            })
            .ok_or_else(|| {
                designator_error("expected `->` or `::` between type and member", identifier)
            })?;
        build_name_regex(name)?;
        Ok(Self {
            visibility,
            is_static,
            owner: TypePattern::parse(owner, identifier)?,
            name: name.to_string(),
        })
    }
}

/// Bounds on the number of call arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentCount {
    /// Exactly this many arguments.
    Exactly(usize),
    /// At least this many arguments.
    AtLeast(usize),
}

impl ArgumentCount {
    /// Check a concrete argument count against the bound.
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

/// A parsed leaf identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Designator {
    /// Method execution.
    Execution(MemberPattern),
    /// Property access.
    Access(MemberPattern),
    /// Free function call; the pattern covers namespace and name.
    Function(String),
    /// Object construction.
    Initialization(TypePattern),
    /// Static initialisation of a type.
    StaticInitialization(TypePattern),
    /// Any join point declared by a matching type.
    Within(TypePattern),
    /// Methods carrying a metadata tag.
    ExecutionTag(String),
    /// Properties carrying a metadata tag.
    AccessTag(String),
    /// Calls receiving a number of arguments; decided at call time.
    Arguments(ArgumentCount),
}

impl Designator {
    /// Whether the leaf depends only on facts about the owning type.
    #[must_use]
    pub const fn is_type_level(&self) -> bool {
        matches!(self, Self::Within(_))
    }

    /// Whether the leaf can only be decided with call-time context.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        matches!(self, Self::Arguments(_))
    }
}

impl FromStr for Designator {
    type Err = PointcutError;

    fn from_str(identifier: &str) -> Result<Self, Self::Err> {
        parse_designator(identifier)
    }
}

/// Interpret a leaf identifier.
///
/// # Errors
/// Returns [`PointcutError::Designator`] for unknown designators, empty or
/// malformed bodies, and invalid glob characters.
///
/// # Examples
/// ```
/// use weaver_pointcut::{Designator, Visibility, parse_designator};
///
/// let Designator::Execution(member) =
///     parse_designator("execution:public app.Repo->find*").expect("valid designator")
/// else {
///     panic!("expected an execution designator");
/// };
/// assert_eq!(member.visibility, vec![Visibility::Public]);
/// assert_eq!(member.name, "find*");
/// assert!(!member.is_static);
/// ```
pub fn parse_designator(identifier: &str) -> Result<Designator, PointcutError> {
    let Some((designator, body)) = identifier.split_once(':') else {
        return Err(designator_error("expected `designator:body`", identifier));
    };
    let body = body.trim();
    if body.is_empty() {
        return Err(designator_error("empty designator body", identifier));
    }
    match designator.trim() {
        "execution" => MemberPattern::parse(body, identifier).map(Designator::Execution),
        "access" => MemberPattern::parse(body, identifier).map(Designator::Access),
        "function" => {
            build_type_regex(body)?;
            Ok(Designator::Function(body.to_string()))
        }
        "initialization" => TypePattern::parse(body, identifier).map(Designator::Initialization),
        "staticinitialization" => {
            TypePattern::parse(body, identifier).map(Designator::StaticInitialization)
        }
        "within" => TypePattern::parse(body, identifier).map(Designator::Within),
        "@execution" => parse_tag(body, identifier).map(Designator::ExecutionTag),
        "@access" => parse_tag(body, identifier).map(Designator::AccessTag),
        "args" => parse_argument_count(body, identifier).map(Designator::Arguments),
        _ => Err(designator_error("unknown designator", identifier)),
    }
}

fn parse_tag(body: &str, identifier: &str) -> Result<String, PointcutError> {
    if body
        .chars()
        .all(|c| glob::is_identifier_char(c) || matches!(c, '.' | '-'))
    {
        Ok(body.to_string())
    } else {
        Err(designator_error("invalid metadata tag", identifier))
    }
}

fn parse_argument_count(body: &str, identifier: &str) -> Result<ArgumentCount, PointcutError> {
    let (digits, at_least) = body
        .strip_suffix("..")
        .map_or((body, false), |digits| (digits, true));
    let count = digits
        .parse::<usize>()
        .map_err(|_| designator_error("expected an argument count", identifier))?;
    Ok(if at_least {
        ArgumentCount::AtLeast(count)
    } else {
        ArgumentCount::Exactly(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn designator(text: &str) -> Designator {
        parse_designator(text).unwrap_or_else(|err| panic!("`{text}` should parse: {err}"))
    }

    #[test]
    fn parses_static_member_with_several_modifiers() {
        let Designator::Access(member) = designator("access:public protected app.Config::DEFAULT*")
        else {
            panic!("expected access designator");
        };
        assert_eq!(
            member.visibility,
            vec![Visibility::Public, Visibility::Protected]
        );
        assert!(member.is_static);
        assert_eq!(member.owner.glob, "app.Config");
        assert_eq!(member.name, "DEFAULT*");
    }

    #[test]
    fn parses_subtype_marker() {
        let Designator::Within(owner) = designator("within:app.Repository+") else {
            panic!("expected within designator");
        };
        assert!(owner.include_subtypes);
        assert_eq!(owner.glob, "app.Repository");
    }

    #[rstest]
    #[case("args:2", ArgumentCount::Exactly(2))]
    #[case("args:1..", ArgumentCount::AtLeast(1))]
    fn parses_argument_counts(#[case] text: &str, #[case] expected: ArgumentCount) {
        assert_eq!(designator(text), Designator::Arguments(expected));
        assert!(designator(text).is_dynamic());
    }

    #[test]
    fn argument_bounds_accept_counts() {
        assert!(ArgumentCount::Exactly(2).accepts(2));
        assert!(!ArgumentCount::Exactly(2).accepts(3));
        assert!(ArgumentCount::AtLeast(1).accepts(3));
        assert!(!ArgumentCount::AtLeast(1).accepts(0));
    }

    #[test]
    fn parses_tags_and_type_level_leaves() {
        assert_eq!(
            designator("@execution:Cacheable"),
            Designator::ExecutionTag("Cacheable".into())
        );
        assert!(designator("within:app..*").is_type_level());
        assert!(!designator("initialization:app.Repo").is_type_level());
    }

    #[rstest]
    #[case::no_colon("app.Repo", "expected `designator:body`")]
    #[case::unknown("call:app.Repo->x", "unknown designator")]
    #[case::empty_body("within:", "empty designator body")]
    #[case::no_marker("execution:app.Repo.find", "expected `->` or `::`")]
    #[case::bad_visibility("execution:internal app.Repo->find", "unknown visibility modifier")]
    #[case::bad_count("args:two", "expected an argument count")]
    #[case::bad_tag("@execution:Cache able", "invalid metadata tag")]
    #[case::bare_plus("within:+", "missing type pattern")]
    fn rejects_malformed_identifiers(#[case] text: &str, #[case] expected: &str) {
        let Err(err) = parse_designator(text) else {
            panic!("`{text}` should be rejected");
        };
        assert!(
            err.to_string().contains(expected),
            "unexpected error for `{text}`: {err}"
        );
    }
}
