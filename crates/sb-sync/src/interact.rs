//! Interaction primitives: the only place the engine mutates the page.

use crate::dom::Dom;
use crate::host::{jitter, Host};
use crate::session::SyncSession;

pub async fn wait<H: Host>(host: &H, ms: u64) {
    if ms > 0 {
        host.sleep(ms).await;
    }
}

/// Sleep for a uniformly random `[min, max]` ms; returns the delay used.
pub async fn random_delay<H: Host>(host: &H, min: u64, max: u64) -> u64 {
    let ms = jitter(host, min, max);
    wait(host, ms).await;
    ms
}

/// Scroll `node` into view, click it, optionally report progress, then
/// give the page a jittered pause to re-render.
pub async fn click_element<D: Dom, H: Host>(session: &SyncSession<'_, D, H>, node: &D::Node, label: &str, emit_progress: bool) {
    session.dom.scroll_into_view(node);
    session.dom.click(node);
    session.record_mutation();
    session.trace_node(&format!("click: {label}"), node);
    if emit_progress {
        session.progress(label);
    }
    let opts = &session.options;
    random_delay(session.host, opts.click_delay_min_ms, opts.click_delay_max_ms).await;
}

/// Assign an input's value the way a user would, so a reactive page sees
/// it: native setter, then bubbling `input` and `change`.
pub fn set_input_value<D: Dom, H: Host>(session: &SyncSession<'_, D, H>, input: &D::Node, value: &str) -> bool {
    if !session.dom.set_value_native(input, value) {
        session.trace_node("set value: not an input", input);
        return false;
    }
    session.record_mutation();
    session.dom.dispatch_event(input, "input");
    session.dom.dispatch_event(input, "change");
    session.trace(&format!("set value: {value:?}"), None);
    true
}
