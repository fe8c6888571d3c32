//! Turning the web app's pending changes into payloads.
//!
//! The app records each edit to a preparation plan as a change: which list
//! it belongs to (or the lists it could belong to), the spell leaving and
//! the spell entering. The planner resolves those into v2 operations and
//! reports what it could not resolve, index-aligned with the input.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::normalize::{normalize_list_name, normalize_prepared_spells};
use crate::payload::{validate_payload, PayloadError};
use crate::types::{
    LegacyPayload, OpsPayload, SpellOp, SyncPayload, UnresolvedCode, UnresolvedEntry, PAYLOAD_SOURCE,
};

/// One pending edit from the preparation UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct PendingChange {
    pub list: Option<String>,
    pub candidate_lists: Vec<String>,
    pub remove: Option<String>,
    pub add: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannedOps {
    pub operations: Vec<SpellOp>,
    pub unresolved: Vec<UnresolvedEntry>,
}

/// Resolve pending changes into operations, in input order.
pub fn plan_operations(changes: &[PendingChange]) -> PlannedOps {
    let mut planned = PlannedOps::default();

    for (index, change) in changes.iter().enumerate() {
        match resolve_change(change) {
            Ok(op) => planned.operations.push(op),
            Err((code, detail)) => planned.unresolved.push(UnresolvedEntry {
                code,
                detail,
                change_index: index as u32,
            }),
        }
    }

    planned
}

fn resolve_change(change: &PendingChange) -> Result<SpellOp, (UnresolvedCode, String)> {
    let candidates: Vec<String> = change
        .candidate_lists
        .iter()
        .map(|l| normalize_list_name(l))
        .filter(|l| !l.is_empty())
        .collect();

    let list = match change.list.as_deref().map(normalize_list_name).filter(|l| !l.is_empty()) {
        Some(list) if !candidates.is_empty() && !candidates.contains(&list) => {
            return Err((
                UnresolvedCode::ListMismatch,
                format!("{list} is not one of {}", candidates.join(", ")),
            ));
        }
        Some(list) => list,
        None => match candidates.as_slice() {
            [only] => only.clone(),
            [] => {
                return Err((UnresolvedCode::ListMismatch, "No spell list matches this change".to_string()));
            }
            many => {
                return Err((
                    UnresolvedCode::AmbiguousList,
                    format!("Change could belong to {}", many.join(", ")),
                ));
            }
        },
    };

    let remove = spell_name(change.remove.as_deref())?;
    let add = spell_name(change.add.as_deref())?;

    match (remove, add) {
        (Some(remove), Some(add)) => Ok(SpellOp::Replace { list, remove, add }),
        (None, Some(spell)) => Ok(SpellOp::Prepare { list, spell }),
        (Some(spell), None) => Ok(SpellOp::Unprepare { list, spell }),
        (None, None) => Err((UnresolvedCode::MissingSpell, format!("{list}: change has no spell"))),
    }
}

/// `None` when absent; an error when present but blank.
fn spell_name(name: Option<&str>) -> Result<Option<String>, (UnresolvedCode, String)> {
    match name.map(str::trim) {
        None => Ok(None),
        Some("") => Err((UnresolvedCode::MissingName, "Spell name is blank".to_string())),
        Some(name) => Ok(Some(name.to_string())),
    }
}

/// Build and validate a v1 payload.
pub fn build_legacy_payload<S: AsRef<str>>(
    prepared: &[S],
    character_id: Option<&str>,
    timestamp: f64,
) -> Result<LegacyPayload, PayloadError> {
    let mut raw = json!({
        "version": 1,
        "source": PAYLOAD_SOURCE,
        "timestamp": timestamp,
        "preparedSpells": normalize_prepared_spells(prepared),
    });
    if let Some(id) = character_id {
        raw["characterId"] = Value::String(id.to_string());
    }

    match validate_payload(&raw)? {
        SyncPayload::Legacy(p) => Ok(p),
        SyncPayload::Ops(_) => Err(PayloadError::UnsupportedVersion("2".to_string())),
    }
}

/// Build and validate a v2 payload from pending changes.
pub fn build_ops_payload(changes: &[PendingChange], timestamp: f64) -> Result<OpsPayload, PayloadError> {
    let planned = plan_operations(changes);
    let raw = json!({
        "version": 2,
        "source": PAYLOAD_SOURCE,
        "timestamp": timestamp,
        "operations": planned.operations,
        "unresolved": planned.unresolved,
    });

    match validate_payload(&raw)? {
        SyncPayload::Ops(p) => Ok(p),
        SyncPayload::Legacy(_) => Err(PayloadError::UnsupportedVersion("1".to_string())),
    }
}
