/*!
 * Size limits for key-value units.
 *
 * Oversized units are split along the next nesting level below their key
 * when that yields several sub-sections, and sliced into fixed-size parts
 * labelled `(i/N)` otherwise. Markdown chunks are never split.
 */

use crate::translation::unit::{TranslationUnit, UnitKind, UnitMember};

/// A unit ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum SplitUnit {
    /// The unit fits and is sent as is
    Whole(TranslationUnit),
    /// The unit was divided; every member appears in exactly one part
    Split {
        original: TranslationUnit,
        parts: Vec<TranslationUnit>,
    },
}

impl SplitUnit {
    pub fn original(&self) -> &TranslationUnit {
        match self {
            Self::Whole(unit) => unit,
            Self::Split { original, .. } => original,
        }
    }

    /// Units actually sent to the model
    pub fn dispatch_units(&self) -> Vec<&TranslationUnit> {
        match self {
            Self::Whole(unit) => vec![unit],
            Self::Split { parts, .. } => parts.iter().collect(),
        }
    }
}

/// Apply the size limit to every unit; `max_size` below one is treated as one
pub fn split(units: Vec<TranslationUnit>, max_size: usize) -> Vec<SplitUnit> {
    let max_size = max_size.max(1);
    units.into_iter().map(|unit| split_unit(unit, max_size)).collect()
}

fn split_unit(unit: TranslationUnit, max_size: usize) -> SplitUnit {
    if unit.len() <= max_size || matches!(unit.kind, UnitKind::Markdown(_)) {
        return SplitUnit::Whole(unit);
    }

    let buckets = structural_buckets(&unit.members);
    let parts = if buckets.len() >= 2 {
        buckets
            .into_iter()
            .flat_map(|(segment, members)| {
                let key = if segment.is_empty() {
                    unit.key.clone()
                } else {
                    format!("{}.{}", unit.key, segment)
                };
                slice_members(&key, members, max_size)
            })
            .collect()
    } else {
        slice_members(&unit.key, unit.members.clone(), max_size)
    };

    SplitUnit::Split { original: unit, parts }
}

/// Group members by their second key segment, keeping first-appearance order
fn structural_buckets(members: &[UnitMember]) -> Vec<(String, Vec<UnitMember>)> {
    let mut buckets: Vec<(String, Vec<UnitMember>)> = Vec::new();
    for member in members {
        let segments: Vec<&str> = member.identity.split('.').collect();
        // direct children of the unit key stay together
        let bucket = if segments.len() > 2 { segments[1] } else { "" };
        match buckets.iter_mut().find(|(b, _)| b == bucket) {
            Some((_, bucket_members)) => bucket_members.push(member.clone()),
            None => buckets.push((bucket.to_string(), vec![member.clone()])),
        }
    }
    buckets
}

fn slice_members(key: &str, members: Vec<UnitMember>, max_size: usize) -> Vec<TranslationUnit> {
    if members.len() <= max_size {
        return vec![TranslationUnit::key_value(key, members)];
    }

    let total = members.len().div_ceil(max_size);
    members
        .chunks(max_size)
        .enumerate()
        .map(|(i, slice)| TranslationUnit::key_value(format!("{} ({}/{})", key, i + 1, total), slice.to_vec()))
        .collect()
}
