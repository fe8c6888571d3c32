//! Test doubles: an in-memory page, a host that never waits, and a
//! builder for character-sheet fixtures.

mod dom;
mod fixtures;
mod selector;

use std::cell::{Cell, RefCell};
use std::future::Future;

pub use dom::{Behavior, FakeDom, NodeId};
pub use fixtures::{Ruleset, Sheet, SheetBuilder};

use crate::host::Host;

/// Host whose sleeps resolve immediately and only advance a fake clock.
#[derive(Debug, Default)]
pub struct InstantHost {
    random: Cell<f64>,
    clock: Cell<f64>,
    progress: RefCell<Vec<String>>,
}

impl InstantHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_random(value: f64) -> Self {
        let host = Self::default();
        host.random.set(value);
        host
    }

    pub fn progress_labels(&self) -> Vec<String> {
        self.progress.borrow().clone()
    }
}

impl Host for InstantHost {
    fn now_ms(&self) -> f64 {
        self.clock.get()
    }

    fn random(&self) -> f64 {
        self.random.get()
    }

    fn sleep(&self, ms: u64) -> impl Future<Output = ()> {
        self.clock.set(self.clock.get() + ms as f64);
        std::future::ready(())
    }

    fn progress(&self, label: &str) {
        self.progress.borrow_mut().push(label.to_string());
    }
}
