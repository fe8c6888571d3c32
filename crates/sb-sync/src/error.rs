//! Error type for the sync engine.

use sb_core::messages::{ContextError, BUSY_MESSAGE};
use sb_core::payload::PayloadError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    WrongTab(#[from] ContextError),
    #[error("{}", BUSY_MESSAGE)]
    Busy,
    /// A precondition nothing else can proceed without.
    #[error("Could not find {what}{}", diagnostics_suffix(.diagnostics))]
    Structural { what: String, diagnostics: Vec<String> },
    #[error("Sync needs {count} actions, more than the limit of {limit}")]
    TooManyActions { count: usize, limit: usize },
    #[error("Toggle \"{0}\" is in an unknown state")]
    IndeterminateToggle(String),
    #[error("Toggle \"{0}\" not found")]
    ToggleNotFound(String),
    #[error("Toggle \"{0}\" did not switch on")]
    ToggleStuck(String),
    #[error("Section \"{0}\" did not expand")]
    SectionNotExpanded(String),
    #[error("{0} not found")]
    Lookup(String),
}

impl SyncError {
    pub fn structural(what: impl Into<String>) -> Self {
        Self::Structural {
            what: what.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Failures that stop the whole sync rather than one operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Payload(_) | Self::WrongTab(_) | Self::Busy | Self::Structural { .. } | Self::TooManyActions { .. }
        )
    }
}

fn diagnostics_suffix(diagnostics: &[String]) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!(" (candidates: {})", diagnostics.join(" | "))
    }
}
