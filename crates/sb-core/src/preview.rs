//! `PREVIEW_EXECUTE` results.
//!
//! An ops preview never touches the page: it is a summary of the payload.
//! A legacy preview needs the page to know what is prepared, so the engine
//! fills [`LegacyPreview`] from a plan pass that stops before clicking.

use serde::{Deserialize, Serialize};

use crate::types::{OpsPayload, SpellOp, UnresolvedEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SyncPreview {
    Legacy(LegacyPreview),
    Ops(OpsPreview),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct LegacyPreview {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
    pub currently_prepared: Vec<String>,
    pub already_correct: bool,
    pub debug_log: Vec<String>,
}

/// Planned work for one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ListPreview {
    pub list: String,
    pub replace: u32,
    pub prepare: u32,
    pub unprepare: u32,
    /// Spells entering the list, in payload order.
    pub adding: Vec<String>,
    /// Spells leaving the list, in payload order.
    pub removing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PreviewTotals {
    pub operations: u32,
    pub replace: u32,
    pub prepare: u32,
    pub unprepare: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OpsPreview {
    pub per_list: Vec<ListPreview>,
    pub totals: PreviewTotals,
    pub skipped_from_payload: Vec<UnresolvedEntry>,
    pub skipped_count: u32,
    pub already_correct: bool,
}

/// Summarize a v2 payload. Lists appear in order of first mention.
pub fn summarize_ops(payload: &OpsPayload) -> OpsPreview {
    let mut per_list: Vec<ListPreview> = Vec::new();
    let mut totals = PreviewTotals::default();

    for op in &payload.operations {
        let idx = match per_list.iter().position(|l| l.list == op.list()) {
            Some(idx) => idx,
            None => {
                per_list.push(ListPreview {
                    list: op.list().to_string(),
                    ..ListPreview::default()
                });
                per_list.len() - 1
            }
        };
        let bucket = &mut per_list[idx];

        totals.operations += 1;
        match op {
            SpellOp::Replace { remove, add, .. } => {
                bucket.replace += 1;
                totals.replace += 1;
                bucket.removing.push(remove.clone());
                bucket.adding.push(add.clone());
            }
            SpellOp::Prepare { spell, .. } => {
                bucket.prepare += 1;
                totals.prepare += 1;
                bucket.adding.push(spell.clone());
            }
            SpellOp::Unprepare { spell, .. } => {
                bucket.unprepare += 1;
                totals.unprepare += 1;
                bucket.removing.push(spell.clone());
            }
        }
    }

    OpsPreview {
        per_list,
        totals,
        skipped_from_payload: payload.unresolved.clone(),
        skipped_count: payload.unresolved.len() as u32,
        already_correct: payload.operations.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnresolvedCode;

    #[test]
    fn test_summarize_groups_by_list() {
        let payload = OpsPayload {
            version: 2,
            source: "spellbook".into(),
            timestamp: 1.0,
            operations: vec![
                SpellOp::Prepare { list: "WIZARD".into(), spell: "Mage Armor".into() },
                SpellOp::Replace { list: "CLERIC".into(), remove: "Bane".into(), add: "Bless".into() },
                SpellOp::Unprepare { list: "WIZARD".into(), spell: "Sleep".into() },
            ],
            unresolved: vec![UnresolvedEntry {
                code: UnresolvedCode::MissingSpell,
                detail: "x".into(),
                change_index: 3,
            }],
        };

        let preview = summarize_ops(&payload);
        assert_eq!(preview.per_list.len(), 2);
        assert_eq!(preview.per_list[0].list, "WIZARD");
        assert_eq!(preview.per_list[0].prepare, 1);
        assert_eq!(preview.per_list[0].unprepare, 1);
        assert_eq!(preview.per_list[0].removing, vec!["Sleep"]);
        assert_eq!(preview.per_list[1].adding, vec!["Bless"]);
        assert_eq!(preview.totals.operations, 3);
        assert_eq!(preview.skipped_count, 1);
        assert!(!preview.already_correct);
    }

    #[test]
    fn test_summarize_empty_is_already_correct() {
        let payload = OpsPayload {
            version: 2,
            source: "spellbook".into(),
            timestamp: 1.0,
            operations: vec![],
            unresolved: vec![],
        };
        let preview = summarize_ops(&payload);
        assert!(preview.already_correct);
        assert!(preview.per_list.is_empty());
    }
}
