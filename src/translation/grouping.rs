/*!
 * Grouping of key-value leaves into translation units.
 *
 * Leaves nested under a first-level key form one unit per key. Top-level
 * leaves are grouped by the prefix before the first `.` of their key, joining
 * the unit of a nested key with the same name, and everything else falls
 * into a catch-all unit.
 */

use crate::translation::unit::{TranslationUnit, UnitMember};

/// Catch-all unit key for JSON trees
pub const JSON_CATCH_ALL: &str = "_ungrouped";

/// Catch-all unit key for script objects
pub const SCRIPT_CATCH_ALL: &str = "_root";

/// A translatable string leaf of a key-value tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedLeaf {
    /// Key path from the root of the tree
    pub address: Vec<String>,
    pub identity: String,
    pub value: String,
}

impl KeyedLeaf {
    fn into_member(self) -> UnitMember {
        UnitMember::new(self.address, self.identity, self.value)
    }
}

#[derive(Default)]
struct Groups {
    order: Vec<(String, Vec<UnitMember>)>,
}

impl Groups {
    fn push(&mut self, key: &str, member: UnitMember) {
        match self.order.iter_mut().find(|(k, _)| k == key) {
            Some((_, members)) => members.push(member),
            None => self.order.push((key.to_string(), vec![member])),
        }
    }
}

/// Group leaves into key-value units, in order of first appearance
pub fn group_leaves(leaves: Vec<KeyedLeaf>, catch_all: &str) -> Vec<TranslationUnit> {
    let mut groups = Groups::default();
    let mut pending = Vec::new();

    for leaf in leaves {
        if leaf.address.len() > 1 {
            let key = leaf.address[0].clone();
            groups.push(&key, leaf.into_member());
        } else {
            pending.push(leaf);
        }
    }

    let mut ungrouped = Vec::new();
    for leaf in pending {
        let key = leaf.address.first().and_then(|k| dotted_prefix(k)).map(str::to_string);
        match key {
            Some(key) => groups.push(&key, leaf.into_member()),
            None => ungrouped.push(leaf.into_member()),
        }
    }
    for member in ungrouped {
        groups.push(catch_all, member);
    }

    groups
        .order
        .into_iter()
        .map(|(key, members)| TranslationUnit::key_value(key, members))
        .collect()
}

fn dotted_prefix(key: &str) -> Option<&str> {
    key.split_once('.')
        .map(|(prefix, _)| prefix)
        .filter(|prefix| !prefix.is_empty())
}
