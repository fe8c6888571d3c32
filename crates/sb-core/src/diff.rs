//! Legacy (v1) diff: target list versus what the sheet shows as prepared.

use std::collections::{HashMap, HashSet};

use crate::normalize::spell_key;

/// A spell to act on, keyed for lookup and named for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffItem {
    pub key: String,
    pub name: String,
}

/// Work needed to make the sheet match the target list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpellDiff {
    pub to_add: Vec<DiffItem>,
    pub to_remove: Vec<DiffItem>,
}

impl SpellDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    pub fn action_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Set difference keyed by [`spell_key`].
///
/// Additions carry the payload's spelling, removals the spelling observed
/// on the page (`name_by_key`, falling back to the key). Additions keep
/// target order; removals are sorted by key so repeated runs click in the
/// same order.
pub fn compute_diff<S: AsRef<str>>(
    target: &[S],
    prepared_keys: &HashSet<String>,
    name_by_key: &HashMap<String, String>,
) -> SpellDiff {
    let mut target_keys = HashSet::with_capacity(target.len());
    let mut to_add = Vec::new();

    for name in target {
        let name = name.as_ref().trim();
        let key = spell_key(name);
        if key.is_empty() || !target_keys.insert(key.clone()) {
            continue;
        }
        if !prepared_keys.contains(&key) {
            to_add.push(DiffItem {
                key,
                name: name.to_string(),
            });
        }
    }

    let mut to_remove: Vec<DiffItem> = prepared_keys
        .iter()
        .filter(|key| !target_keys.contains(*key))
        .map(|key| DiffItem {
            key: key.clone(),
            name: name_by_key.get(key).cloned().unwrap_or_else(|| key.clone()),
        })
        .collect();
    to_remove.sort_by(|a, b| a.key.cmp(&b.key));

    SpellDiff { to_add, to_remove }
}
