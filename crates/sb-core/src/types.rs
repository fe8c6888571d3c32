//! Wire types shared by the web app, the popup and the content script.
//!
//! Field names follow the JSON the extension exchanges (camelCase, `type`
//! tags on operations). Payloads are only ever constructed through
//! [`crate::payload::validate_payload`] or the planner, so the invariants
//! documented here hold for every value in circulation.

use serde::{Deserialize, Serialize};

/// Literal `source` every payload must carry.
pub const PAYLOAD_SOURCE: &str = "spellbook";

// =============================================================================
// Payloads
// =============================================================================

/// A validated sync payload, either version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(untagged)]
pub enum SyncPayload {
    Legacy(LegacyPayload),
    Ops(OpsPayload),
}

impl SyncPayload {
    pub fn version(&self) -> u8 {
        match self {
            Self::Legacy(_) => 1,
            Self::Ops(_) => 2,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            Self::Legacy(p) => p.timestamp,
            Self::Ops(p) => p.timestamp,
        }
    }

    /// Character the payload was built for, when the producer knew it.
    pub fn character_id(&self) -> Option<&str> {
        match self {
            Self::Legacy(p) => p.character_id.as_deref(),
            Self::Ops(_) => None,
        }
    }
}

/// Version 1: the whole target list of prepared spells.
///
/// `prepared_spells` holds unique normalized keys, first occurrence wins,
/// original casing kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct LegacyPayload {
    pub version: u8,
    pub source: String,
    pub timestamp: f64,
    pub prepared_spells: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<String>,
}

/// Version 2: an ordered list of operations plus what the app could not resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OpsPayload {
    pub version: u8,
    pub source: String,
    pub timestamp: f64,
    pub operations: Vec<SpellOp>,
    #[serde(default)]
    pub unresolved: Vec<UnresolvedEntry>,
}

// =============================================================================
// Operations
// =============================================================================

/// One independent step of a v2 payload. `list` is always upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpellOp {
    /// Unprepare `remove` then prepare `add`, within the same section.
    Replace { list: String, remove: String, add: String },
    Prepare { list: String, spell: String },
    Unprepare { list: String, spell: String },
}

/// Discriminant of a [`SpellOp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Replace,
    Prepare,
    Unprepare,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Prepare => "prepare",
            Self::Unprepare => "unprepare",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "replace" => Some(Self::Replace),
            "prepare" => Some(Self::Prepare),
            "unprepare" => Some(Self::Unprepare),
            _ => None,
        }
    }
}

impl SpellOp {
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Replace { .. } => OpKind::Replace,
            Self::Prepare { .. } => OpKind::Prepare,
            Self::Unprepare { .. } => OpKind::Unprepare,
        }
    }

    pub fn list(&self) -> &str {
        match self {
            Self::Replace { list, .. } | Self::Prepare { list, .. } | Self::Unprepare { list, .. } => list,
        }
    }

    /// The spell reported as not found when the operation fails.
    ///
    /// For `replace` that is the spell being added: a missing `remove` and a
    /// failed `add` both leave the replacement absent from the sheet.
    pub fn target_spell(&self) -> &str {
        match self {
            Self::Replace { add, .. } => add,
            Self::Prepare { spell, .. } | Self::Unprepare { spell, .. } => spell,
        }
    }
}

// =============================================================================
// Unresolved entries
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnresolvedCode {
    AmbiguousList,
    MissingSpell,
    MissingName,
    ListMismatch,
}

impl UnresolvedCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AmbiguousList => "AMBIGUOUS_LIST",
            Self::MissingSpell => "MISSING_SPELL",
            Self::MissingName => "MISSING_NAME",
            Self::ListMismatch => "LIST_MISMATCH",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AMBIGUOUS_LIST" => Some(Self::AmbiguousList),
            "MISSING_SPELL" => Some(Self::MissingSpell),
            "MISSING_NAME" => Some(Self::MissingName),
            "LIST_MISMATCH" => Some(Self::ListMismatch),
            _ => None,
        }
    }
}

/// A change the producing app could not turn into an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedEntry {
    pub code: UnresolvedCode,
    pub detail: String,
    pub change_index: u32,
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of a completed sync, tagged by pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SyncResult {
    Legacy(LegacyResult),
    Ops(OpsResult),
}

impl SyncResult {
    pub fn debug_log(&self) -> &[String] {
        match self {
            Self::Legacy(r) => &r.debug_log,
            Self::Ops(r) => &r.debug_log,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct LegacyResult {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub not_found: Vec<String>,
    pub already_correct: bool,
    pub duration_ms: f64,
    pub debug_log: Vec<String>,
}

/// Per-`list` bucket of an ops run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ListOutcome {
    pub list: String,
    pub replaced: u32,
    pub prepared: u32,
    pub unprepared: u32,
    pub failed: u32,
    pub not_found: Vec<String>,
    /// A replace unprepared its spell but could not prepare the replacement.
    pub aborted: bool,
    pub error: Option<String>,
}

impl ListOutcome {
    pub fn new(list: impl Into<String>) -> Self {
        Self {
            list: list.into(),
            ..Self::default()
        }
    }

    /// Operations accounted for in this bucket.
    pub fn settled(&self) -> u32 {
        self.replaced + self.prepared + self.unprepared + self.failed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OpsTotals {
    pub operations: u32,
    pub replaced: u32,
    pub prepared: u32,
    pub unprepared: u32,
    pub failed: u32,
    pub not_found: u32,
    pub aborted_lists: u32,
}

impl OpsTotals {
    /// Aggregate list buckets. `operations` counts settled operations.
    pub fn from_lists(lists: &[ListOutcome]) -> Self {
        let mut totals = Self::default();
        for bucket in lists {
            totals.operations += bucket.settled();
            totals.replaced += bucket.replaced;
            totals.prepared += bucket.prepared;
            totals.unprepared += bucket.unprepared;
            totals.failed += bucket.failed;
            totals.not_found += bucket.not_found.len() as u32;
            if bucket.aborted {
                totals.aborted_lists += 1;
            }
        }
        totals
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OpsResult {
    pub per_list: Vec<ListOutcome>,
    pub totals: OpsTotals,
    pub skipped_from_payload: Vec<UnresolvedEntry>,
    pub skipped_count: u32,
    pub already_correct: bool,
    pub duration_ms: f64,
    pub debug_log: Vec<String>,
}
