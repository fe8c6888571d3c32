//! The page, as the engine sees it.
//!
//! [`Dom`] is deliberately small: CSS queries, tree navigation, a handful
//! of reads and three mutations. Everything the locators infer is built on
//! top of it, so the same heuristics run against the live character sheet
//! (web-sys) and against the in-memory page used in tests.
//!
//! Calls are synchronous; in a content script DOM access is. Waiting
//! between interactions lives in [`crate::host::Host`].

use std::fmt;

use serde_json::{json, Value};

use sb_core::limits::DESCRIBE_MAX_CHARS;
use sb_core::normalize::collapse_whitespace;

/// Resolved style properties relevant to visibility.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
    pub opacity: f64,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: "block".to_string(),
            visibility: "visible".to_string(),
            opacity: 1.0,
        }
    }
}

impl ComputedStyle {
    pub fn is_hidden(&self) -> bool {
        self.display == "none" || self.visibility == "hidden" || self.opacity <= 0.0
    }
}

pub trait Dom {
    /// Element handle. Handles may go stale when the page re-renders, so
    /// callers re-query instead of holding on to them across clicks.
    type Node: Clone + PartialEq + fmt::Debug;

    fn body(&self) -> Self::Node;

    fn get_by_id(&self, id: &str) -> Option<Self::Node>;

    /// Descendants of `scope` matching `selector`, in document order.
    /// An unparsable selector matches nothing.
    fn query_all(&self, scope: &Self::Node, selector: &str) -> Vec<Self::Node>;

    fn matches(&self, node: &Self::Node, selector: &str) -> bool;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Element children only.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Next element sibling.
    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool;

    /// Lower-case tag name.
    fn tag_name(&self, node: &Self::Node) -> String;

    fn attr(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn text_content(&self, node: &Self::Node) -> String;

    /// Rendered text with line breaks between blocks.
    fn inner_text(&self, node: &Self::Node) -> String;

    fn computed_style(&self, node: &Self::Node) -> ComputedStyle;

    /// Whether the element produces any layout boxes.
    fn has_layout(&self, node: &Self::Node) -> bool;

    fn scroll_into_view(&self, node: &Self::Node);

    fn click(&self, node: &Self::Node);

    /// Assign `value` through the native setter, bypassing framework
    /// interception. Returns `false` if the node is not an input.
    fn set_value_native(&self, node: &Self::Node, value: &str) -> bool;

    /// Dispatch a bubbling event of the given type.
    fn dispatch_event(&self, node: &Self::Node, event_type: &str);

    // -------------------------------------------------------------------------
    // Provided
    // -------------------------------------------------------------------------

    fn class_name(&self, node: &Self::Node) -> String {
        self.attr(node, "class").unwrap_or_default()
    }

    fn query_first(&self, scope: &Self::Node, selector: &str) -> Option<Self::Node> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Nearest ancestor-or-self matching `selector`.
    fn closest(&self, node: &Self::Node, selector: &str) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(n) = current {
            if self.matches(&n, selector) {
                return Some(n);
            }
            current = self.parent(&n);
        }
        None
    }

    /// Parents of `node`, nearest first, at most `depth` of them.
    fn ancestors(&self, node: &Self::Node, depth: usize) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(n) = current {
            if out.len() >= depth {
                break;
            }
            current = self.parent(&n);
            out.push(n);
        }
        out
    }
}

/// Visible to a user: laid out, not hidden by style, not `aria-hidden`.
pub fn is_visible<D: Dom>(dom: &D, node: &D::Node) -> bool {
    if !dom.has_layout(node) {
        return false;
    }
    if dom.attr(node, "aria-hidden").as_deref() == Some("true") {
        return false;
    }
    !dom.computed_style(node).is_hidden()
}

/// Short human description of an element for debug details.
pub fn describe<D: Dom>(dom: &D, node: &D::Node) -> Value {
    let mut out = serde_json::Map::new();
    out.insert("tag".into(), Value::String(dom.tag_name(node)));
    if let Some(id) = dom.attr(node, "id").filter(|s| !s.is_empty()) {
        out.insert("id".into(), Value::String(truncate(&id)));
    }
    let class = dom.class_name(node);
    if !class.is_empty() {
        out.insert("class".into(), Value::String(truncate(&class)));
    }
    let text = collapse_whitespace(&dom.text_content(node));
    if !text.is_empty() {
        out.insert("text".into(), Value::String(truncate(&text)));
    }
    Value::Object(out)
}

/// Description list for a handful of nodes.
pub fn describe_all<D: Dom>(dom: &D, nodes: &[D::Node]) -> Value {
    json!(nodes.iter().map(|n| describe(dom, n)).collect::<Vec<_>>())
}

pub(crate) fn truncate(text: &str) -> String {
    if text.chars().count() <= DESCRIBE_MAX_CHARS {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(DESCRIBE_MAX_CHARS).collect();
        out.push('…');
        out
    }
}
