//! Message envelopes crossing the extension's contexts.
//!
//! ```text
//! page ──postMessage──► content script        SPELLBOOK_SYNC_PAYLOAD_SET / _ACK
//! popup ──runtime────► background             POPUP_INIT, SYNC_REQUEST, PREVIEW_REQUEST
//! background ─runtime─► content script        SYNC_EXECUTE, PREVIEW_EXECUTE
//! content script ─────► background ─► popup   SYNC_PROGRESS, SYNC_RESULT
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::limits::SyncOptions;
use crate::payload::validate_payload;
use crate::types::{SyncPayload, SyncResult};
use crate::url::{is_sync_target, tab_character_id};

/// Extension storage key holding the most recent valid payload.
pub const STORAGE_KEY: &str = "spellbook.syncPayload.v1";

/// Returned when a second sync starts while one is running.
pub const BUSY_MESSAGE: &str = "Another operation is already in progress.";

// =============================================================================
// Page <-> content script
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "type")]
pub enum PageMessage {
    #[serde(rename = "SPELLBOOK_SYNC_PAYLOAD_SET")]
    PayloadSet {
        #[cfg_attr(feature = "ts", ts(type = "unknown"))]
        payload: Value,
    },
    #[serde(rename = "SPELLBOOK_SYNC_PAYLOAD_ACK")]
    PayloadAck {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp: f64,
    },
}

impl PageMessage {
    /// Acknowledge a payload-set attempt.
    pub fn ack(result: &Result<SyncPayload, String>, now_ms: f64) -> Self {
        match result {
            Ok(_) => Self::PayloadAck {
                ok: true,
                error: None,
                timestamp: now_ms,
            },
            Err(error) => Self::PayloadAck {
                ok: false,
                error: Some(error.clone()),
                timestamp: now_ms,
            },
        }
    }
}

// =============================================================================
// Runtime messages
// =============================================================================

/// Where the request came from, as the background saw it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SyncContext {
    #[serde(default)]
    pub tab_url: Option<String>,
    #[serde(default)]
    pub tab_character_id: Option<String>,
}

/// Body of `SYNC_EXECUTE` / `PREVIEW_EXECUTE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[cfg_attr(feature = "ts", ts(type = "unknown"))]
    pub payload: Value,
    #[serde(default)]
    pub context: SyncContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub options: Option<SyncOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeMessage {
    PopupInit,
    #[serde(rename_all = "camelCase")]
    SyncRequest {
        #[serde(default)]
        tab_id: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    PreviewRequest {
        #[serde(default)]
        tab_id: Option<u32>,
    },
    SyncExecute(ExecuteRequest),
    PreviewExecute(ExecuteRequest),
    SyncProgress { label: String },
    #[serde(rename = "SYNC_RESULT")]
    Finished(SyncResponse<SyncResult>),
}

impl RuntimeMessage {
    /// Decode a message bound for the content script.
    ///
    /// `None` when `raw` is not a `SYNC_EXECUTE` or `PREVIEW_EXECUTE`;
    /// `Some(Err)` when it claims to be one but does not decode, so the
    /// sender can still be answered.
    pub fn decode_execute(raw: &Value) -> Option<Result<Self, String>> {
        let kind = raw.get("type").and_then(Value::as_str)?;
        if kind != "SYNC_EXECUTE" && kind != "PREVIEW_EXECUTE" {
            return None;
        }
        Some(serde_json::from_value(raw.clone()).map_err(|err| format!("Malformed {kind} message: {err}")))
    }
}

/// Final answer to any execute request. Never an exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<Vec<String>>,
}

impl<T> SyncResponse<T> {
    pub fn success(result: T) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
            debug_log: None,
        }
    }

    pub fn failure(error: impl Into<String>, debug_log: Option<Vec<String>>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
            debug_log,
        }
    }
}

// =============================================================================
// Context checks
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("This tab is not a D&D Beyond character sheet: {0}")]
    NotCharacterPage(String),
    #[error("Payload is for character {payload}, but this tab shows character {tab}")]
    CharacterMismatch { payload: String, tab: String },
}

/// Reject execute requests aimed at the wrong tab.
pub fn check_context(payload: &SyncPayload, ctx: &SyncContext) -> Result<(), ContextError> {
    let mut tab_id = ctx.tab_character_id.clone();

    if let Some(url) = ctx.tab_url.as_deref() {
        if !is_sync_target(url) {
            return Err(ContextError::NotCharacterPage(url.to_string()));
        }
        tab_id = tab_id.or_else(|| tab_character_id(url));
    }

    match (payload.character_id(), tab_id) {
        (Some(expected), Some(tab)) if expected != tab => Err(ContextError::CharacterMismatch {
            payload: expected.to_string(),
            tab,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Popup status
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PayloadSummary {
    pub version: u8,
    pub timestamp: f64,
    pub spell_count: Option<u32>,
    pub operation_count: Option<u32>,
    pub unresolved_count: u32,
    pub character_id: Option<String>,
}

impl PayloadSummary {
    pub fn of(payload: &SyncPayload) -> Self {
        match payload {
            SyncPayload::Legacy(p) => Self {
                version: 1,
                timestamp: p.timestamp,
                spell_count: Some(p.prepared_spells.len() as u32),
                operation_count: None,
                unresolved_count: 0,
                character_id: p.character_id.clone(),
            },
            SyncPayload::Ops(p) => Self {
                version: 2,
                timestamp: p.timestamp,
                spell_count: None,
                operation_count: Some(p.operations.len() as u32),
                unresolved_count: p.unresolved.len() as u32,
                character_id: None,
            },
        }
    }
}

/// What the popup shows on open (`POPUP_INIT`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PopupStatus {
    pub is_target: bool,
    pub tab_character_id: Option<String>,
    pub payload: Option<PayloadSummary>,
    pub payload_error: Option<String>,
    /// `None` when either side has no character id.
    pub character_matches: Option<bool>,
}

pub fn popup_status(tab_url: Option<&str>, stored: Option<&Value>) -> PopupStatus {
    let is_target = tab_url.is_some_and(is_sync_target);
    let tab_id = tab_url.and_then(tab_character_id);

    let (payload, payload_error) = match stored.map(validate_payload) {
        Some(Ok(p)) => (Some(p), None),
        Some(Err(e)) => (None, Some(e.to_string())),
        None => (None, None),
    };

    let character_matches = match (payload.as_ref().and_then(SyncPayload::character_id), tab_id.as_deref()) {
        (Some(expected), Some(tab)) => Some(expected == tab),
        _ => None,
    };

    PopupStatus {
        is_target,
        tab_character_id: tab_id,
        payload: payload.as_ref().map(PayloadSummary::of),
        payload_error,
        character_matches,
    }
}
