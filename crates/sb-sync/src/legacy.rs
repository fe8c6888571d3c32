//! Legacy (v1) pipeline: make the prepared set equal a target list.
//!
//! The page is read once into entries, diffed against the target, then
//! adds run before removes. A spell that cannot be found lands in
//! `not_found`; it never stops the batch.

use std::collections::{HashMap, HashSet};

use serde_json::json;

use sb_core::preview::LegacyPreview;
use sb_core::{compute_diff, DiffItem, LegacyPayload, LegacyResult, SpellDiff};

use crate::dom::Dom;
use crate::error::SyncError;
use crate::host::Host;
use crate::interact::click_element;
use crate::locate::{collect_entries, find_action_button, find_spell_row, SpellAction, SpellEntry};
use crate::precondition::{apply_legacy_core_filter, prepare_manager};
use crate::session::SyncSession;

/// What the page shows and what would change, before any row is clicked.
pub struct LegacyPlan<N> {
    pub root: N,
    pub entries: Vec<SpellEntry<N>>,
    pub diff: SpellDiff,
}

impl<N> LegacyPlan<N> {
    /// Display names of the spells prepared now, in page order.
    pub fn currently_prepared(&self) -> Vec<String> {
        self.entries.iter().filter(|e| e.prepared).map(|e| e.name.clone()).collect()
    }
}

pub async fn build_plan<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    payload: &LegacyPayload,
) -> Result<LegacyPlan<D::Node>, SyncError> {
    let root = prepare_manager(s).await?;
    apply_legacy_core_filter(s, &root, s.options.require_2014).await?;

    let entries = collect_entries(s.dom, &root, true);
    let mut prepared_keys = HashSet::new();
    let mut name_by_key = HashMap::new();
    for entry in entries.iter().filter(|e| e.prepared) {
        prepared_keys.insert(entry.key.clone());
        name_by_key.entry(entry.key.clone()).or_insert_with(|| entry.name.clone());
    }

    let diff = compute_diff(&payload.prepared_spells, &prepared_keys, &name_by_key);
    s.trace(
        "legacy plan",
        Some(json!({
            "entries": entries.len(),
            "prepared": prepared_keys.len(),
            "toAdd": diff.to_add.iter().map(|i| &i.name).collect::<Vec<_>>(),
            "toRemove": diff.to_remove.iter().map(|i| &i.name).collect::<Vec<_>>(),
        })),
    );
    Ok(LegacyPlan { root, entries, diff })
}

/// Locate the row for `item` offering `action`: exact key among the
/// current entries, then the ranked row lookup, then a substring match.
pub async fn find_entry_by_key_for_action<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    root: &D::Node,
    item: &DiffItem,
    action: SpellAction,
) -> Option<D::Node> {
    let label = format!("{} {}", action.as_str(), item.name);
    s.retry(&label, s.options.lookup_retries, s.backoff(), |_| async move {
        let entries = collect_entries(s.dom, root, false);
        let offers = |e: &&SpellEntry<D::Node>| e.action() == action;

        let exact = entries
            .iter()
            .filter(offers)
            .filter(|e| e.key == item.key)
            .max_by_key(|e| e.visible);
        if let Some(entry) = exact {
            return Ok(entry.button.clone());
        }

        if let Some(found) = find_spell_row(s.dom, root, &item.name) {
            if let Some(button) = find_action_button(s.dom, &found.row, action) {
                s.trace(&format!("{} matched row {:?}", item.name, found.name), None);
                return Ok(button);
            }
        }

        let fuzzy = entries
            .iter()
            .filter(offers)
            .find(|e| e.key.contains(&item.key) || item.key.contains(&e.key));
        if let Some(entry) = fuzzy {
            s.trace(&format!("{} fuzzy-matched {:?}", item.name, entry.name), None);
            return Ok(entry.button.clone());
        }

        Err(SyncError::Lookup(item.name.clone()))
    })
    .await
    .ok()
}

async fn apply_batch<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    root: &D::Node,
    items: &[DiffItem],
    action: SpellAction,
    done: &mut Vec<String>,
    not_found: &mut Vec<String>,
) {
    let verb = match action {
        SpellAction::Prepare => "Prepared",
        SpellAction::Unprepare => "Unprepared",
    };
    for item in items {
        match find_entry_by_key_for_action(s, root, item, action).await {
            Some(button) => {
                click_element(s, &button, &format!("{verb} {}", item.name), s.options.emit_progress).await;
                done.push(item.name.clone());
            }
            None => {
                log::warn!("{} not found for {}", item.name, action.as_str());
                not_found.push(item.name.clone());
            }
        }
    }
}

pub async fn sync_legacy<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, payload: &LegacyPayload) -> Result<LegacyResult, SyncError> {
    s.trace("legacy sync started", Some(json!({ "spells": payload.prepared_spells.len() })));
    let plan = build_plan(s, payload).await?;

    let count = plan.diff.action_count();
    if count > s.options.max_actions {
        return Err(SyncError::TooManyActions {
            count,
            limit: s.options.max_actions,
        });
    }

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut not_found = Vec::new();
    apply_batch(s, &plan.root, &plan.diff.to_add, SpellAction::Prepare, &mut added, &mut not_found).await;
    apply_batch(s, &plan.root, &plan.diff.to_remove, SpellAction::Unprepare, &mut removed, &mut not_found).await;

    s.trace(
        "legacy sync finished",
        Some(json!({ "added": added.len(), "removed": removed.len(), "notFound": not_found })),
    );
    Ok(LegacyResult {
        added,
        removed,
        not_found,
        already_correct: plan.diff.is_empty(),
        duration_ms: s.elapsed_ms(),
        debug_log: s.debug_snapshot(),
    })
}

/// The plan pass only; nothing beyond preconditions is clicked.
pub async fn preview_legacy<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, payload: &LegacyPayload) -> Result<LegacyPreview, SyncError> {
    let plan = build_plan(s, payload).await?;
    Ok(LegacyPreview {
        to_add: plan.diff.to_add.iter().map(|i| i.name.clone()).collect(),
        to_remove: plan.diff.to_remove.iter().map(|i| i.name.clone()).collect(),
        currently_prepared: plan.currently_prepared(),
        already_correct: plan.diff.is_empty(),
        debug_log: s.debug_snapshot(),
    })
}
