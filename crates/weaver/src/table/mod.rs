//! Per-unit join-point tables.
//!
//! A [`JoinPointTable`] maps each intercepted member of a compilation unit to
//! its ordered advice list. Entries keep the enumeration order of the unit's
//! call sites so serialised tables are stable across builds.

use std::fmt;

use hashbrown::HashMap;

use crate::advice::{AdvicePayload, AttachedAdvice, Introduction, sort_advice};
use crate::call_site::{CallSite, JoinPointKind};
use crate::chain::{InterceptorChain, MemberBody};

#[cfg(feature = "diagnostics")]
mod diagnostics;

/// Identifies one member within a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberKey {
    /// Join-point category.
    pub kind: JoinPointKind,
    /// Declaring type or function namespace.
    pub owner: String,
    /// Member name.
    pub name: String,
}

impl MemberKey {
    /// Key for `call_site`.
    #[must_use]
    pub fn of(call_site: &CallSite) -> Self {
        Self {
            kind: call_site.kind,
            owner: call_site.owning_type.clone(),
            name: call_site.member_name.clone(),
        }
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}->{}", self.kind, self.owner, self.name)
    }
}

/// One intercepted member.
#[derive(Debug, Clone)]
pub struct TableEntry {
    /// Static facts about the member.
    pub call_site: CallSite,
    /// Attached advice in execution order.
    pub advice: Vec<AttachedAdvice>,
}

/// Intercepted members of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct JoinPointTable {
    unit: String,
    entries: Vec<TableEntry>,
    index: HashMap<MemberKey, usize>,
}

impl JoinPointTable {
    /// Identity of the unit the table describes.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Number of intercepted members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no member is intercepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in enumeration order.
    pub fn entries(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter()
    }

    /// Look up a member.
    #[must_use]
    pub fn get(&self, key: &MemberKey) -> Option<&TableEntry> {
        self.index.get(key).and_then(|&slot| self.entries.get(slot))
    }

    /// Advice attached to `call_site`, empty when none applies.
    #[must_use]
    pub fn advice_for(&self, call_site: &CallSite) -> &[AttachedAdvice] {
        self.get(&MemberKey::of(call_site))
            .map(|entry| entry.advice.as_slice())
            .unwrap_or_default()
    }

    /// Introductions attached to any join point of `owner`.
    pub fn introductions<'a>(&'a self, owner: &'a str) -> impl Iterator<Item = &'a Introduction> {
        self.entries
            .iter()
            .filter(move |entry| entry.call_site.owning_type == owner)
            .flat_map(|entry| &entry.advice)
            .filter_map(|attached| match attached.advice.payload() {
                AdvicePayload::Introduction(introduction) => Some(introduction),
                AdvicePayload::Interceptor(_) => None,
            })
    }

    /// Materialise the interceptor chain for a member.
    ///
    /// Returns `None` when nothing is attached to `key`, in which case the
    /// member runs unwoven.
    #[must_use]
    pub fn chain(&self, key: &MemberKey, body: MemberBody) -> Option<InterceptorChain> {
        let entry = self.get(key)?;
        Some(InterceptorChain::new(
            entry.call_site.clone(),
            entry.advice.clone(),
            body,
        ))
    }

    /// Serialise the table as JSON.
    ///
    /// Members appear in enumeration order and each lists its advice ids in
    /// execution order.
    ///
    /// # Errors
    /// Returns any serialisation error from `serde_json`.
    #[cfg(feature = "diagnostics")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        diagnostics::dump_table(self)
    }
}

/// Accumulates matches for one unit.
///
/// Matches arrive grouped by pointcut; `finish` restores the unit's
/// enumeration order.
pub(crate) struct TableBuilder {
    table: JoinPointTable,
    positions: Vec<usize>,
}

impl TableBuilder {
    pub(crate) fn new(unit: &str) -> Self {
        Self {
            table: JoinPointTable {
                unit: unit.to_string(),
                ..JoinPointTable::default()
            },
            positions: Vec::new(),
        }
    }

    /// Attach advice to the call site enumerated at `position` in the unit.
    pub(crate) fn attach(
        &mut self,
        position: usize,
        call_site: &CallSite,
        attached: AttachedAdvice,
    ) {
        let table = &mut self.table;
        let positions = &mut self.positions;
        let key = MemberKey::of(call_site);
        let slot = *table.index.entry(key).or_insert_with(|| {
            table.entries.push(TableEntry {
                call_site: call_site.clone(),
                advice: Vec::new(),
            });
            positions.push(position);
            table.entries.len() - 1
        });
        if let Some(entry) = table.entries.get_mut(slot) {
            entry.advice.push(attached);
        }
    }

    pub(crate) fn finish(self) -> JoinPointTable {
        let Self { table, positions } = self;
        let mut ordered: Vec<(usize, TableEntry)> =
            positions.into_iter().zip(table.entries).collect();
        ordered.sort_by_key(|(position, _)| *position);

        let mut entries = Vec::with_capacity(ordered.len());
        let mut index = HashMap::with_capacity(ordered.len());
        for (slot, (_, mut entry)) in ordered.into_iter().enumerate() {
            sort_advice(&mut entry.advice);
            index.insert(MemberKey::of(&entry.call_site), slot);
            entries.push(entry);
        }
        JoinPointTable {
            unit: table.unit,
            entries,
            index,
        }
    }
}
