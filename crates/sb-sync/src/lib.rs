//! Spellbook Sync Engine
//!
//! Mirrors a validated Spellbook payload onto a D&D Beyond character sheet
//! by driving the page the way a user would: open the spell manager, turn
//! on the 2014 rule sets, find each spell's row and press its button.
//!
//! The engine is generic over two capabilities:
//!
//! - [`Dom`]: synchronous queries and clicks against the page
//! - [`Host`]: clock, randomness, sleeping and progress delivery
//!
//! so the same code runs in the content script (see `sb-wasm`) and against
//! the in-memory page used by the tests.
//!
//! # Example
//!
//! ```ignore
//! let router = Router::default();
//! let response = router.sync_execute(&dom, &host, &request).await;
//! ```

pub mod dom;
pub mod error;
pub mod host;
pub mod interact;
pub mod legacy;
pub mod locate;
pub mod ops;
pub mod precondition;
pub mod retry;
pub mod router;
pub mod session;
pub mod toggle;

#[cfg(test)]
pub(crate) mod testing;

pub use dom::{ComputedStyle, Dom};
pub use error::SyncError;
pub use host::Host;
pub use router::{FlightGuard, Router};
pub use session::SyncSession;
pub use toggle::{AriaToggle, ClassFragmentToggle, FallbackToggle, ToggleReader, ToggleState};
