//! One sync attempt's state, threaded through every engine call.
//!
//! A session owns the debug run, the options, the toggle reader and a
//! mutation counter. Nothing in the engine is global: two sessions over two
//! pages never see each other's trace.

use std::cell::{Cell, RefCell};
use std::fmt::Display;
use std::future::Future;

use serde_json::Value;

use sb_core::{DebugRun, SyncOptions};

use crate::dom::{describe, Dom};
use crate::host::Host;
use crate::retry::{with_retries, Backoff};
use crate::toggle::{FallbackToggle, ToggleReader, ToggleState};

pub struct SyncSession<'a, D: Dom, H: Host> {
    pub dom: &'a D,
    pub host: &'a H,
    pub options: SyncOptions,
    toggles: Box<dyn ToggleReader<D> + 'a>,
    run: RefCell<DebugRun>,
    mutations: Cell<usize>,
}

impl<'a, D: Dom + 'static, H: Host> SyncSession<'a, D, H> {
    /// Session with the default toggle reader.
    pub fn new(dom: &'a D, host: &'a H, options: SyncOptions) -> Self {
        Self::with_toggles(dom, host, options, Box::new(FallbackToggle::default()))
    }
}

impl<'a, D: Dom, H: Host> SyncSession<'a, D, H> {
    pub fn with_toggles(dom: &'a D, host: &'a H, options: SyncOptions, toggles: Box<dyn ToggleReader<D> + 'a>) -> Self {
        let run = DebugRun::start(host.now_ms());
        Self {
            dom,
            host,
            options,
            toggles,
            run: RefCell::new(run),
            mutations: Cell::new(0),
        }
    }

    pub fn trace(&self, message: &str, detail: Option<Value>) {
        self.run.borrow_mut().log(self.host.now_ms(), message, detail.as_ref());
    }

    pub fn trace_node(&self, message: &str, node: &D::Node) {
        self.trace(message, Some(describe(self.dom, node)));
    }

    /// Progress label for the popup, when enabled, always traced.
    pub fn progress(&self, label: &str) {
        self.trace(&format!("progress: {label}"), None);
        if self.options.emit_progress {
            self.host.progress(label);
        }
    }

    pub fn record_mutation(&self) {
        self.mutations.set(self.mutations.get() + 1);
    }

    /// Clicks and value assignments made so far.
    pub fn mutations(&self) -> usize {
        self.mutations.get()
    }

    pub fn toggle_state(&self, control: &D::Node) -> ToggleState {
        self.toggles.read(self.dom, control)
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.run.borrow().elapsed_ms(self.host.now_ms())
    }

    pub fn debug_snapshot(&self) -> Vec<String> {
        self.run.borrow().snapshot()
    }

    /// Linear backoff from the session options.
    pub fn backoff(&self) -> Backoff {
        Backoff::Linear(self.options.backoff_step_ms)
    }

    /// [`with_retries`] on this session's host, tracing failed attempts.
    pub async fn retry<T, E, F, Fut>(&self, label: &str, attempts: u32, backoff: Backoff, mut factory: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        with_retries(self.host, label, attempts, backoff, |attempt| {
            let fut = factory(attempt);
            async move {
                let result = fut.await;
                if let Err(err) = &result {
                    self.trace(&format!("{label}: attempt {attempt} failed"), Some(Value::String(err.to_string())));
                }
                result
            }
        })
        .await
    }
}
