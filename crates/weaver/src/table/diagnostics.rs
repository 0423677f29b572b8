//! JSON export of join-point tables for external tooling.

use serde::Serialize;

use super::JoinPointTable;

#[derive(Serialize)]
struct DumpedAdvice {
    id: String,
    kind: &'static str,
    order: i32,
    introduction: bool,
    dynamic: bool,
}

#[derive(Serialize)]
struct DumpedMember<'a> {
    kind: &'static str,
    owner: &'a str,
    name: &'a str,
    advice: Vec<DumpedAdvice>,
}

#[derive(Serialize)]
struct TableDump<'a> {
    unit: &'a str,
    members: Vec<DumpedMember<'a>>,
}

pub(super) fn dump_table(table: &JoinPointTable) -> serde_json::Result<String> {
    let members = table
        .entries()
        .map(|entry| DumpedMember {
            kind: entry.call_site.kind.as_str(),
            owner: &entry.call_site.owning_type,
            name: &entry.call_site.member_name,
            advice: entry
                .advice
                .iter()
                .map(|attached| DumpedAdvice {
                    id: attached.advice.id(),
                    kind: attached.advice.kind().as_str(),
                    order: attached.advice.order(),
                    introduction: attached.advice.is_introduction(),
                    dynamic: attached.guard.is_some(),
                })
                .collect(),
        })
        .collect();
    serde_json::to_string_pretty(&TableDump {
        unit: table.unit(),
        members,
    })
}
