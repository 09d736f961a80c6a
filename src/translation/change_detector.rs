/*!
 * Change detection against an existing translation.
 *
 * Units are matched by key. A unit is reused when the existing translation
 * has a unit with the same key, the same number of members and every member
 * identity of the source unit. Edited source values alone do not make a unit
 * changed; `retranslate` is the escape hatch for that.
 */

use std::collections::{HashMap, HashSet};

use crate::translation::unit::TranslationUnit;

/// Partition of source units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub changed: Vec<TranslationUnit>,
    pub unchanged: Vec<TranslationUnit>,
}

impl Classification {
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Classify source units against the units of the existing translation
///
/// Source order is preserved in both halves of the partition.
pub fn classify(source: &[TranslationUnit], existing: &[TranslationUnit]) -> Classification {
    let existing_by_key: HashMap<&str, &TranslationUnit> = existing.iter().map(|u| (u.key.as_str(), u)).collect();

    let mut classification = Classification::default();
    for unit in source {
        let reusable = existing_by_key
            .get(unit.key.as_str())
            .is_some_and(|previous| is_same_shape(unit, previous));
        if reusable {
            classification.unchanged.push(unit.clone());
        } else {
            classification.changed.push(unit.clone());
        }
    }
    classification
}

/// Treat every unit as changed
pub fn classify_all_changed(source: &[TranslationUnit]) -> Classification {
    Classification {
        changed: source.to_vec(),
        unchanged: Vec::new(),
    }
}

fn is_same_shape(unit: &TranslationUnit, previous: &TranslationUnit) -> bool {
    if unit.members.len() != previous.members.len() {
        return false;
    }
    let known: HashSet<&str> = previous.members.iter().map(|m| m.identity.as_str()).collect();
    unit.members.iter().all(|m| known.contains(m.identity.as_str()))
}
