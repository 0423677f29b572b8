//! Call-site descriptors fed to the matcher.
//!
//! A [`CallSite`] holds the static facts about one candidate join point as
//! reported by the source enumerator. [`DynamicContext`] adds the receiver
//! and arguments of a concrete call and only exists while a chain runs.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{BitAnd, BitOr};

use crate::Value;
pub use weaver_pointcut::Visibility;

/// Category of a join point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinPointKind {
    /// Method execution.
    Method,
    /// Property access.
    Property,
    /// Free function call.
    Function,
    /// Object construction.
    InstanceInit,
    /// Static initialisation of a type.
    StaticInit,
}

impl JoinPointKind {
    /// Stable name used in logs and serialised tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Property => "property",
            Self::Function => "function",
            Self::InstanceInit => "instanceInit",
            Self::StaticInit => "staticInit",
        }
    }

    /// Single-kind mask.
    #[must_use]
    pub const fn mask(self) -> KindMask {
        KindMask(match self {
            Self::Method => 1,
            Self::Property => 1 << 1,
            Self::Function => 1 << 2,
            Self::InstanceInit => 1 << 3,
            Self::StaticInit => 1 << 4,
        })
    }
}

impl fmt::Display for JoinPointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitset of join-point kinds a filter can select.
///
/// # Examples
/// ```
/// use weaver::{JoinPointKind, KindMask};
///
/// let members = KindMask::METHOD | KindMask::PROPERTY;
/// assert!(members.contains(JoinPointKind::Property));
/// assert!(!members.contains(JoinPointKind::Function));
/// assert_eq!(members & KindMask::METHOD, KindMask::METHOD);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindMask(u8);

impl KindMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Methods only.
    pub const METHOD: Self = JoinPointKind::Method.mask();
    /// Properties only.
    pub const PROPERTY: Self = JoinPointKind::Property.mask();
    /// Functions only.
    pub const FUNCTION: Self = JoinPointKind::Function.mask();
    /// Instance initialisation only.
    pub const INSTANCE_INIT: Self = JoinPointKind::InstanceInit.mask();
    /// Static initialisation only.
    pub const STATIC_INIT: Self = JoinPointKind::StaticInit.mask();
    /// Every kind.
    pub const ALL: Self = Self(0b1_1111);

    /// Whether `kind` is in the set.
    #[must_use]
    pub const fn contains(self, kind: JoinPointKind) -> bool {
        self.0 & kind.mask().0 != 0
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitAnd for KindMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitOr for KindMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Static description of a candidate join point.
///
/// Built with the kind-specific constructors and refined with the `with_*`
/// helpers:
///
/// ```
/// use weaver::{CallSite, JoinPointKind, Visibility};
///
/// let site = CallSite::method("app.UserRepo", "findById")
///     .with_visibility(Visibility::Protected)
///     .with_interface("app.Repository")
///     .with_tag("Cacheable");
/// assert_eq!(site.kind, JoinPointKind::Method);
/// assert!(site.metadata_tags.contains("Cacheable"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSite {
    /// Join-point category.
    pub kind: JoinPointKind,
    /// Declaring type; for functions, the dotted namespace.
    pub owning_type: String,
    /// Member name; initialisers use `<init>` and `<clinit>`.
    pub member_name: String,
    /// Declared visibility.
    pub visibility: Visibility,
    /// Whether the member belongs to the type rather than an instance.
    pub is_static: bool,
    /// Interfaces implemented by the owning type.
    pub declared_interfaces: BTreeSet<String>,
    /// Traits used by the owning type.
    pub declared_traits: BTreeSet<String>,
    /// Metadata markers attached to the member.
    pub metadata_tags: BTreeSet<String>,
}

impl CallSite {
    /// Member name reported for instance initialisers.
    pub const INSTANCE_INIT_NAME: &'static str = "<init>";
    /// Member name reported for static initialisers.
    pub const STATIC_INIT_NAME: &'static str = "<clinit>";

    /// Describe a join point of any kind.
    #[must_use]
    pub fn new(
        kind: JoinPointKind,
        owning_type: impl Into<String>,
        member_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            owning_type: owning_type.into(),
            member_name: member_name.into(),
            visibility: Visibility::Public,
            is_static: matches!(kind, JoinPointKind::Function | JoinPointKind::StaticInit),
            declared_interfaces: BTreeSet::new(),
            declared_traits: BTreeSet::new(),
            metadata_tags: BTreeSet::new(),
        }
    }

    /// Public instance method.
    #[must_use]
    pub fn method(owning_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(JoinPointKind::Method, owning_type, name)
    }

    /// Public instance property.
    #[must_use]
    pub fn property(owning_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(JoinPointKind::Property, owning_type, name)
    }

    /// Free function in `namespace`.
    #[must_use]
    pub fn function(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(JoinPointKind::Function, namespace, name)
    }

    /// Construction of `owning_type`.
    #[must_use]
    pub fn instance_init(owning_type: impl Into<String>) -> Self {
        Self::new(
            JoinPointKind::InstanceInit,
            owning_type,
            Self::INSTANCE_INIT_NAME,
        )
    }

    /// Static initialisation of `owning_type`.
    #[must_use]
    pub fn static_init(owning_type: impl Into<String>) -> Self {
        Self::new(JoinPointKind::StaticInit, owning_type, Self::STATIC_INIT_NAME)
    }

    /// Set the declared visibility.
    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark the member as static.
    #[must_use]
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Add an implemented interface.
    #[must_use]
    pub fn with_interface(mut self, name: impl Into<String>) -> Self {
        self.declared_interfaces.insert(name.into());
        self
    }

    /// Add a used trait.
    #[must_use]
    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.declared_traits.insert(name.into());
        self
    }

    /// Add a metadata tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.metadata_tags.insert(tag.into());
        self
    }

    /// Dotted name of the member, e.g. `app.util.slugify` for functions.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.owning_type.is_empty() {
            self.member_name.clone()
        } else {
            format!("{}.{}", self.owning_type, self.member_name)
        }
    }

    /// Interfaces and traits, in that order.
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.declared_interfaces
            .iter()
            .chain(&self.declared_traits)
            .map(String::as_str)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = if self.is_static { "::" } else { "->" };
        match self.kind {
            JoinPointKind::Function => write!(f, "function {}", self.qualified_name()),
            kind => write!(
                f,
                "{kind} {}{separator}{}",
                self.owning_type, self.member_name
            ),
        }
    }
}

/// Candidate join points of one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    id: String,
    call_sites: Vec<CallSite>,
}

impl CompilationUnit {
    /// Create a unit identified by `id` (typically its source path).
    #[must_use]
    pub fn new(id: impl Into<String>, call_sites: impl IntoIterator<Item = CallSite>) -> Self {
        Self {
            id: id.into(),
            call_sites: call_sites.into_iter().collect(),
        }
    }

    /// Identity used to memoise the unit's table.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Candidate join points in enumeration order.
    #[must_use]
    pub fn call_sites(&self) -> &[CallSite] {
        &self.call_sites
    }
}

/// Call-time view of a join point used by dynamic filters.
#[derive(Clone, Copy)]
pub struct DynamicContext<'a> {
    /// Static facts.
    pub call_site: &'a CallSite,
    /// Receiver, absent for static members and functions.
    pub instance: Option<&'a Value>,
    /// Call arguments in declaration order.
    pub arguments: &'a [Value],
}

impl fmt::Debug for DynamicContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContext")
            .field("call_site", self.call_site)
            .field("has_instance", &self.instance.is_some())
            .field("arguments", &self.arguments.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_masks_combine() {
        let mask = KindMask::METHOD | KindMask::FUNCTION;
        assert!(mask.contains(JoinPointKind::Method));
        assert!(mask.contains(JoinPointKind::Function));
        assert!(!mask.contains(JoinPointKind::StaticInit));
        assert!((mask & KindMask::PROPERTY).is_empty());
        assert_eq!(KindMask::ALL & mask, mask);
    }

    #[test]
    fn every_kind_is_in_all() {
        for kind in [
            JoinPointKind::Method,
            JoinPointKind::Property,
            JoinPointKind::Function,
            JoinPointKind::InstanceInit,
            JoinPointKind::StaticInit,
        ] {
            assert!(KindMask::ALL.contains(kind), "{kind} missing from ALL");
        }
    }

    #[test]
    fn functions_and_static_initialisers_are_static() {
        assert!(CallSite::function("app.util", "slugify").is_static);
        assert!(CallSite::static_init("app.Repo").is_static);
        assert!(!CallSite::instance_init("app.Repo").is_static);
    }

    #[test]
    fn displays_member_separator() {
        assert_eq!(
            CallSite::method("app.Repo", "find").to_string(),
            "method app.Repo->find"
        );
        assert_eq!(
            CallSite::property("app.Config", "DEFAULT")
                .as_static()
                .to_string(),
            "property app.Config::DEFAULT"
        );
        assert_eq!(
            CallSite::function("app.util", "slugify").to_string(),
            "function app.util.slugify"
        );
    }

    #[test]
    fn lists_supertypes() {
        let site = CallSite::method("app.Repo", "find")
            .with_interface("app.Finder")
            .with_trait("app.Logs");
        assert_eq!(
            site.supertypes().collect::<Vec<_>>(),
            vec!["app.Finder", "app.Logs"]
        );
    }
}
