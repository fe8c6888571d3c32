//! Payload validation.
//!
//! Both ingress points (page `postMessage` and runtime messaging) run the
//! raw JSON through [`validate_payload`]; nothing else constructs payloads
//! from untrusted input.

use serde_json::{Map, Value};

use crate::normalize::{normalize_list_name, normalize_prepared_spells};
use crate::types::{
    LegacyPayload, OpKind, OpsPayload, SpellOp, SyncPayload, UnresolvedCode, UnresolvedEntry,
    PAYLOAD_SOURCE,
};

/// Error type for payload validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    #[error("Payload must be an object")]
    NotAnObject,
    #[error("Payload source must be \"spellbook\"")]
    InvalidSource,
    #[error("Payload timestamp must be a positive number")]
    InvalidTimestamp,
    #[error("Unsupported payload version: {0}")]
    UnsupportedVersion(String),
    #[error("preparedSpells must be an array of strings")]
    InvalidPreparedSpells,
    #[error("operations must be an array")]
    MissingOperations,
    #[error("operations[{index}]: {reason}")]
    InvalidOperation { index: usize, reason: String },
}

/// Validate and normalize a raw payload.
pub fn validate_payload(raw: &Value) -> Result<SyncPayload, PayloadError> {
    let obj = raw.as_object().ok_or(PayloadError::NotAnObject)?;

    if obj.get("source").and_then(Value::as_str) != Some(PAYLOAD_SOURCE) {
        return Err(PayloadError::InvalidSource);
    }

    let timestamp = obj
        .get("timestamp")
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite() && *t > 0.0)
        .ok_or(PayloadError::InvalidTimestamp)?;

    let version = obj.get("version").and_then(Value::as_f64);
    match version {
        Some(v) if v == 1.0 => validate_legacy(obj, timestamp).map(SyncPayload::Legacy),
        Some(v) if v == 2.0 => validate_ops(obj, timestamp).map(SyncPayload::Ops),
        _ => Err(PayloadError::UnsupportedVersion(
            obj.get("version").map(Value::to_string).unwrap_or_else(|| "missing".to_string()),
        )),
    }
}

/// Parse a JSON document and validate it.
pub fn validate_payload_str(text: &str) -> Result<SyncPayload, PayloadError> {
    let raw: Value = serde_json::from_str(text).map_err(|_| PayloadError::NotAnObject)?;
    validate_payload(&raw)
}

fn validate_legacy(obj: &Map<String, Value>, timestamp: f64) -> Result<LegacyPayload, PayloadError> {
    let spells = obj
        .get("preparedSpells")
        .and_then(Value::as_array)
        .ok_or(PayloadError::InvalidPreparedSpells)?;

    let names = spells
        .iter()
        .map(|v| v.as_str().ok_or(PayloadError::InvalidPreparedSpells))
        .collect::<Result<Vec<_>, _>>()?;

    let character_id = match obj.get("characterId") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    Ok(LegacyPayload {
        version: 1,
        source: PAYLOAD_SOURCE.to_string(),
        timestamp,
        prepared_spells: normalize_prepared_spells(&names),
        character_id,
    })
}

fn validate_ops(obj: &Map<String, Value>, timestamp: f64) -> Result<OpsPayload, PayloadError> {
    let raw_ops = obj
        .get("operations")
        .and_then(Value::as_array)
        .ok_or(PayloadError::MissingOperations)?;

    let operations = raw_ops
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            validate_operation(raw).map_err(|reason| PayloadError::InvalidOperation { index, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let unresolved = obj
        .get("unresolved")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(validate_unresolved).collect())
        .unwrap_or_default();

    Ok(OpsPayload {
        version: 2,
        source: PAYLOAD_SOURCE.to_string(),
        timestamp,
        operations,
        unresolved,
    })
}

/// Validate a single operation, returning the reason it was rejected.
pub fn validate_operation(raw: &Value) -> Result<SpellOp, String> {
    let obj = raw.as_object().ok_or_else(|| "operation must be an object".to_string())?;

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(OpKind::parse)
        .ok_or_else(|| "type must be one of replace, prepare, unprepare".to_string())?;

    let list = obj.get("list").and_then(Value::as_str).map(normalize_list_name).unwrap_or_default();
    if list.is_empty() {
        return Err("list is required".to_string());
    }

    let field = |name: &str| -> Option<String> {
        obj.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match kind {
        OpKind::Replace => {
            let remove = field("remove").ok_or_else(|| "remove is required for replace".to_string())?;
            let add = field("add").ok_or_else(|| "add is required for replace".to_string())?;
            Ok(SpellOp::Replace { list, remove, add })
        }
        OpKind::Prepare => {
            let spell = field("spell").ok_or_else(|| "spell is required for prepare".to_string())?;
            Ok(SpellOp::Prepare { list, spell })
        }
        OpKind::Unprepare => {
            let spell = field("spell").ok_or_else(|| "spell is required for unprepare".to_string())?;
            Ok(SpellOp::Unprepare { list, spell })
        }
    }
}

/// Keep an unresolved entry only if every field checks out.
fn validate_unresolved(raw: &Value) -> Option<UnresolvedEntry> {
    let obj = raw.as_object()?;
    let code = obj.get("code").and_then(Value::as_str).and_then(UnresolvedCode::parse)?;
    let detail = obj.get("detail").and_then(Value::as_str).filter(|d| !d.trim().is_empty())?;
    let change_index = obj
        .get("changeIndex")
        .and_then(Value::as_u64)
        .and_then(|i| u32::try_from(i).ok())?;

    Some(UnresolvedEntry {
        code,
        detail: detail.to_string(),
        change_index,
    })
}
