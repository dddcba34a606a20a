// # Merge
//
// Folds a sequence of pending entries into six deduplicated groups.
//
// - Each (primary, secondary) pair is kept once per group
// - For groups with a TTL, the last entry seen for a pair wins, including
//   an entry without TTL overriding an earlier one with TTL
// - Groups are independent: a login and a logout of the same pair both survive
//
// Ordered maps keep the canonical payload and the emitted event order
// deterministic inside each group.

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::PendingEntry;
use crate::payload::{
    DagEntry, DagSection, DugEntry, DugSection, LogEntry, LogSection, TagList, TagMember,
    UidPayload,
};
use crate::traits::{ChangeLog, Operation};

/// primary → secondary → ttl
type TtlGroups = BTreeMap<String, BTreeMap<String, Option<u32>>>;

/// primary → secondaries
type PairGroups = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Default)]
pub(crate) struct Merged {
    register: TtlGroups,
    unregister: PairGroups,
    login: TtlGroups,
    logout: PairGroups,
    group: TtlGroups,
    ungroup: PairGroups,
}

impl Merged {
    pub(crate) fn from_entries(entries: &[PendingEntry]) -> Self {
        let mut merged = Merged::default();
        for entry in entries {
            match entry {
                PendingEntry::Register { ip, tag, ttl } => {
                    put_ttl(&mut merged.register, ip, tag, *ttl);
                }
                PendingEntry::Unregister { ip, tag } => {
                    put_pair(&mut merged.unregister, ip, tag);
                }
                PendingEntry::Login { user, ip, ttl } => {
                    put_ttl(&mut merged.login, user, ip, *ttl);
                }
                PendingEntry::Logout { user, ip } => {
                    put_pair(&mut merged.logout, user, ip);
                }
                PendingEntry::Group { user, group, ttl } => {
                    put_ttl(&mut merged.group, user, group, *ttl);
                }
                PendingEntry::Ungroup { user, group } => {
                    put_pair(&mut merged.ungroup, user, group);
                }
            }
        }
        merged
    }

    /// Emit one event per merged pair
    ///
    /// Group order: Unregister > Ungroup > Logout > Login > Group > Register
    pub(crate) fn emit(&self, sink: &mut dyn ChangeLog) -> usize {
        emit_pairs(Operation::Unregister, &self.unregister, sink)
            + emit_pairs(Operation::Ungroup, &self.ungroup, sink)
            + emit_pairs(Operation::Logout, &self.logout, sink)
            + emit_timed(Operation::Login, &self.login, sink)
            + emit_timed(Operation::Group, &self.group, sink)
            + emit_timed(Operation::Register, &self.register, sink)
    }

    pub(crate) fn into_payload(self) -> UidPayload {
        UidPayload {
            register: dag_section(ttl_members(self.register)),
            unregister: dag_section(plain_members(self.unregister)),
            register_user: dug_section(ttl_members(self.group)),
            unregister_user: dug_section(plain_members(self.ungroup)),
            login: log_section(self.login),
            logout: log_section(
                self.logout
                    .into_iter()
                    .map(|(user, ips)| (user, ips.into_iter().map(|ip| (ip, None)).collect()))
                    .collect(),
            ),
        }
    }
}

fn emit_pairs(op: Operation, groups: &PairGroups, sink: &mut dyn ChangeLog) -> usize {
    let mut emitted = 0;
    for (primary, secondaries) in groups {
        for secondary in secondaries {
            sink.log(op, primary, secondary, None);
            emitted += 1;
        }
    }
    emitted
}

fn emit_timed(op: Operation, groups: &TtlGroups, sink: &mut dyn ChangeLog) -> usize {
    let mut emitted = 0;
    for (primary, secondaries) in groups {
        for (secondary, ttl) in secondaries {
            sink.log(op, primary, secondary, *ttl);
            emitted += 1;
        }
    }
    emitted
}

fn put_ttl(groups: &mut TtlGroups, primary: &str, secondary: &str, ttl: Option<u32>) {
    groups
        .entry(primary.to_string())
        .or_default()
        .insert(secondary.to_string(), ttl);
}

fn put_pair(groups: &mut PairGroups, primary: &str, secondary: &str) {
    groups
        .entry(primary.to_string())
        .or_default()
        .insert(secondary.to_string());
}

fn member(name: String, ttl: Option<u32>) -> TagMember {
    TagMember {
        timeout: ttl.map(|minutes| minutes.to_string()),
        name,
    }
}

fn ttl_members(groups: TtlGroups) -> Vec<(String, TagList)> {
    groups
        .into_iter()
        .map(|(primary, secondaries)| {
            let member = secondaries
                .into_iter()
                .map(|(name, ttl)| member(name, ttl))
                .collect();
            (primary, TagList { member })
        })
        .collect()
}

fn plain_members(groups: PairGroups) -> Vec<(String, TagList)> {
    groups
        .into_iter()
        .map(|(primary, secondaries)| {
            let member = secondaries
                .into_iter()
                .map(|name| member(name, None))
                .collect();
            (primary, TagList { member })
        })
        .collect()
}

fn dag_section(entries: Vec<(String, TagList)>) -> Option<DagSection> {
    if entries.is_empty() {
        return None;
    }
    Some(DagSection {
        entry: entries
            .into_iter()
            .map(|(ip, tag)| DagEntry {
                ip,
                persistent: None,
                tag,
            })
            .collect(),
    })
}

fn dug_section(entries: Vec<(String, TagList)>) -> Option<DugSection> {
    if entries.is_empty() {
        return None;
    }
    Some(DugSection {
        entry: entries
            .into_iter()
            .map(|(user, tag)| DugEntry { user, tag })
            .collect(),
    })
}

fn log_section(groups: TtlGroups) -> Option<LogSection> {
    if groups.is_empty() {
        return None;
    }
    let entry = groups
        .into_iter()
        .flat_map(|(user, ips)| {
            ips.into_iter().map(move |(ip, ttl)| LogEntry {
                name: user.clone(),
                ip,
                timeout: ttl.map(|minutes| minutes.to_string()),
            })
        })
        .collect();
    Some(LogSection { entry })
}
