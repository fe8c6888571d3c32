//! Locator toolkit: fuzzy intent to concrete elements.
//!
//! Locators never fail loudly. They return `None` or an empty list and
//! leave retries and fallback scopes to the caller. Multi-strategy lookups
//! are ranked [`Strategy`] lists tried in order by [`first_match`].

pub mod root;
pub mod rows;
pub mod sections;

use sb_core::normalize::label_key;

use crate::dom::{is_visible, Dom};

pub use root::locate_manage_spells_root;
pub use rows::{collect_entries, find_action_button, find_spell_row, row_from_button, RowMatch, SpellAction, SpellEntry};
pub use sections::{collect_known_spells_sections, is_section_expanded, SectionDescriptor};

// =============================================================================
// Selectors
// =============================================================================

pub const CLICKABLE: &str = r#"button, [role="button"], a"#;

/// Where prepare/unprepare labels show up: buttons or spans inside them.
pub const ACTION_CANDIDATES: &str = r#"button, [role="button"], span"#;

pub const SPELLS_TAB_SELECTORS: &[&str] = &[r#"[data-testid="SPELLS"]"#, "#SPELLS", r#"[data-testid="spells-tab"]"#];

pub const TAB_LIKE: &str = r#"[role="tab"], button"#;

pub const COLLAPSED_SPELL_HEADERS: &str =
    r#".ct-spells [aria-expanded="false"], .ddbc-collapsible__header[aria-expanded="false"]"#;

pub const SEARCH_INPUT: &str = r#"input[type="search"], input[placeholder*="Search"]"#;

pub const TOGGLE_CONTROL: &str = r#"[role="switch"], .ddbc-toggle-field, input[type="checkbox"], button"#;

/// Elements that may carry a toggle's or panel's visible label.
pub const LABEL_CANDIDATES: &str = r#"span, label, p, div, button, [role="button"], h2, h3, h4, h5"#;

pub const FILTER_PANEL_TEXT: &str = "filter by source category";

pub const RULE_FILTERS: [&str; 2] = ["2014 Core Rules", "2014 Expanded Rules"];

pub const CORE_RULES: &str = "2014 Core Rules";

// =============================================================================
// Strategies
// =============================================================================

/// One named way of finding an element.
pub struct Strategy<'a, D: Dom> {
    pub name: &'static str,
    pub find: Box<dyn Fn(&D) -> Option<D::Node> + 'a>,
}

impl<'a, D: Dom> Strategy<'a, D> {
    pub fn new(name: &'static str, find: impl Fn(&D) -> Option<D::Node> + 'a) -> Self {
        Self {
            name,
            find: Box::new(find),
        }
    }
}

/// First strategy that finds something, with its name.
pub fn first_match<D: Dom>(dom: &D, strategies: &[Strategy<'_, D>]) -> Option<(&'static str, D::Node)> {
    strategies.iter().find_map(|s| (s.find)(dom).map(|node| (s.name, node)))
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Loose label: `aria-label` if set, else the text content.
pub fn label_of<D: Dom>(dom: &D, node: &D::Node) -> String {
    match dom.attr(node, "aria-label").filter(|s| !s.trim().is_empty()) {
        Some(label) => label_key(&label),
        None => label_key(&dom.text_content(node)),
    }
}

/// Nearest clickable ancestor-or-self, else the node itself.
pub fn resolve_clickable<D: Dom>(dom: &D, node: &D::Node) -> D::Node {
    dom.closest(node, CLICKABLE).unwrap_or_else(|| node.clone())
}

/// Clickables under `scope` whose label satisfies `pred`.
pub fn find_clickables<D: Dom>(dom: &D, scope: &D::Node, visible_only: bool, pred: impl Fn(&str) -> bool) -> Vec<D::Node> {
    dom.query_all(scope, CLICKABLE)
        .into_iter()
        .filter(|n| !visible_only || is_visible(dom, n))
        .filter(|n| pred(&label_of(dom, n)))
        .collect()
}

/// First element matching `selector` whose label equals `text` loosely.
pub fn find_by_exact_text<D: Dom>(dom: &D, scope: &D::Node, selector: &str, text: &str) -> Option<D::Node> {
    let wanted = label_key(text);
    dom.query_all(scope, selector).into_iter().find(|n| label_of(dom, n) == wanted)
}

/// Distinct clickable prepare/unprepare controls under `scope`.
pub fn action_buttons<D: Dom>(dom: &D, scope: &D::Node) -> Vec<(D::Node, SpellAction)> {
    let mut out: Vec<(D::Node, SpellAction)> = Vec::new();
    for node in dom.query_all(scope, ACTION_CANDIDATES) {
        let Some(action) = SpellAction::from_label(&label_of(dom, &node)) else {
            continue;
        };
        let button = resolve_clickable(dom, &node);
        if !out.iter().any(|(b, _)| *b == button) {
            out.push((button, action));
        }
    }
    out
}

pub fn has_visible_actions<D: Dom>(dom: &D, scope: &D::Node) -> bool {
    action_buttons(dom, scope).iter().any(|(b, _)| is_visible(dom, b))
}

/// Toggle control for a labelled filter: the element itself, a control
/// inside it, or one in the nearest ancestor holding one.
pub fn find_toggle_control<D: Dom>(dom: &D, scope: &D::Node, label: &str) -> Option<D::Node> {
    let wanted = label_key(label);
    for candidate in dom.query_all(scope, LABEL_CANDIDATES) {
        if label_of(dom, &candidate) != wanted {
            continue;
        }
        if dom.matches(&candidate, TOGGLE_CONTROL) {
            return Some(candidate);
        }
        if let Some(control) = dom.query_first(&candidate, TOGGLE_CONTROL) {
            return Some(control);
        }
        for ancestor in dom.ancestors(&candidate, 3) {
            if let Some(control) = dom.query_first(&ancestor, TOGGLE_CONTROL) {
                return Some(control);
            }
        }
    }
    None
}

/// Short labels of visible clickables, for error diagnostics.
pub fn visible_button_texts<D: Dom>(dom: &D, scope: &D::Node, limit: usize) -> Vec<String> {
    dom.query_all(scope, CLICKABLE)
        .into_iter()
        .filter(|n| is_visible(dom, n))
        .map(|n| crate::dom::truncate(&sb_core::normalize::collapse_whitespace(&dom.text_content(&n))))
        .filter(|t| !t.is_empty())
        .take(limit)
        .collect()
}
