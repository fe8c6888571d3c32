//! Hard limits and tunables for a sync run.
//!
//! The constants are the values the extension ships with. [`SyncOptions`]
//! carries them through a sync session so tests (and the odd power user)
//! can shrink delays without touching module state.

use serde::{Deserialize, Serialize};

/// Maximum number of page mutations a single sync may plan.
pub const MAX_ACTIONS: usize = 200;

/// Attempts for every bounded lookup (tabs, sections, rows, toggles).
pub const MAX_LOOKUP_RETRIES: u32 = 3;

/// Linear backoff step between lookup attempts (`step * attempt`).
pub const LOOKUP_BACKOFF_STEP_MS: u64 = 150;

/// Jitter window applied after every click.
pub const CLICK_DELAY_MIN_MS: u64 = 100;
pub const CLICK_DELAY_MAX_MS: u64 = 250;

/// Ring buffer capacity of a debug run.
pub const DEBUG_LOG_MAX_LINES: usize = 2000;

/// How far locators walk up from a button looking for its row.
pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// Action-button count at which an ancestor is taken as the Manage Spells root.
pub const ROOT_ACTION_THRESHOLD: usize = 8;

/// Truncation applied to element descriptions in debug details.
pub const DESCRIBE_MAX_CHARS: usize = 80;

/// Tunables for one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncOptions {
    pub max_actions: usize,
    pub lookup_retries: u32,
    pub backoff_step_ms: u64,
    pub click_delay_min_ms: u64,
    pub click_delay_max_ms: u64,
    /// Send `SYNC_PROGRESS` messages while clicking.
    pub emit_progress: bool,
    /// Fail the legacy flow when the "2014 Core Rules" filter is missing.
    #[serde(rename = "require2014")]
    pub require_2014: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_actions: MAX_ACTIONS,
            lookup_retries: MAX_LOOKUP_RETRIES,
            backoff_step_ms: LOOKUP_BACKOFF_STEP_MS,
            click_delay_min_ms: CLICK_DELAY_MIN_MS,
            click_delay_max_ms: CLICK_DELAY_MAX_MS,
            emit_progress: true,
            require_2014: true,
        }
    }
}

impl SyncOptions {
    /// Options for a preview pass: no progress noise, filters optional.
    pub fn preview() -> Self {
        Self {
            emit_progress: false,
            require_2014: false,
            ..Self::default()
        }
    }

    /// Zero-delay options for tests and offline tooling.
    pub fn instant() -> Self {
        Self {
            backoff_step_ms: 0,
            click_delay_min_ms: 0,
            click_delay_max_ms: 0,
            ..Self::default()
        }
    }
}
