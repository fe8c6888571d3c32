//! Spellbook Sync Core Library
//!
//! DOM-free half of the Spellbook sync extension: everything the web app,
//! the popup and the content script agree on before a single click lands
//! on the character sheet.
//!
//! # Modules
//!
//! - `types`: payload, operation and result wire types
//! - `payload`: validation shared by every ingress point
//! - `normalize`: spell-key and list-name normalization
//! - `url`: character-sheet URL allow-list
//! - `diff`: legacy (v1) add/remove computation
//! - `planner`: pending changes to v2 operations
//! - `preview`: `PREVIEW_EXECUTE` summaries
//! - `debug`: bounded trace of one sync attempt
//! - `messages`: envelopes exchanged between extension contexts
//! - `limits`: hard limits and per-run options

pub mod debug;
pub mod diff;
pub mod limits;
pub mod messages;
pub mod normalize;
pub mod payload;
pub mod planner;
pub mod preview;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use debug::DebugRun;
pub use diff::{compute_diff, DiffItem, SpellDiff};
pub use limits::SyncOptions;
pub use normalize::{normalize_list_name, normalize_prepared_spells, spell_key};
pub use payload::{validate_payload, PayloadError};
pub use types::{
    LegacyPayload, LegacyResult, ListOutcome, OpKind, OpsPayload, OpsResult, OpsTotals, SpellOp, SyncPayload,
    SyncResult, UnresolvedCode, UnresolvedEntry,
};
pub use url::{extract_dndbeyond_character_id, is_sync_target};
