//! "Known Spells" blocks: a character may have several, one per class or
//! rule set, and operations are tried against each in turn.

use super::{
    find_by_exact_text, find_toggle_control, first_match, has_visible_actions, label_of, Strategy, CLICKABLE,
    FILTER_PANEL_TEXT, LABEL_CANDIDATES, RULE_FILTERS, SEARCH_INPUT,
};
use crate::dom::{is_visible, Dom};

pub const SECTION_HEADERS: &str = r#"[aria-expanded], .ddbc-collapsible__header, .ct-content-group__header, button, [role="button"], h2, h3, h4"#;

const SECTION_LABEL: &str = "known spells";
const COLLAPSIBLE: &str = ".ddbc-collapsible";
const COLLAPSIBLE_CONTENT: &str = ".ddbc-collapsible__content";

#[derive(Debug, Clone, PartialEq)]
pub struct SectionDescriptor<N> {
    pub label: String,
    /// What to click to expand or collapse the section.
    pub toggle: N,
    /// Smallest element holding both the toggle and the content.
    pub container: N,
    pub content: Option<N>,
    /// Where rows and filters are searched: the content region when it
    /// sits outside `container`, otherwise `container`.
    pub scope: N,
}

fn section_toggle<D: Dom>(dom: &D, header: &D::Node) -> D::Node {
    if dom.matches(header, r#"[aria-expanded], button, [role="button"]"#) {
        return header.clone();
    }
    dom.closest(header, r#"[aria-expanded], button, [role="button"]"#)
        .or_else(|| dom.query_first(header, CLICKABLE))
        .unwrap_or_else(|| header.clone())
}

fn content_region<D: Dom>(dom: &D, toggle: &D::Node, container: &D::Node) -> Option<(&'static str, D::Node)> {
    let strategies = [
        Strategy::new("aria-controls", |d: &D| {
            d.attr(toggle, "aria-controls")
                .and_then(|ids| ids.split_whitespace().find_map(|id| d.get_by_id(id)))
        }),
        Strategy::new("collapsible content", |d: &D| d.query_first(container, COLLAPSIBLE_CONTENT)),
        Strategy::new("next sibling", |d: &D| d.next_sibling(toggle)),
    ];
    first_match(dom, &strategies)
}

/// Every Known Spells section under `root`, collapsed ones first.
pub fn collect_known_spells_sections<D: Dom>(dom: &D, root: &D::Node) -> Vec<SectionDescriptor<D::Node>> {
    let mut sections: Vec<SectionDescriptor<D::Node>> = Vec::new();

    for header in dom.query_all(root, SECTION_HEADERS) {
        let label = label_of(dom, &header);
        if !label.starts_with(SECTION_LABEL) {
            continue;
        }
        let toggle = section_toggle(dom, &header);
        if sections.iter().any(|s| s.toggle == toggle) {
            continue;
        }
        let container = dom
            .closest(&toggle, COLLAPSIBLE)
            .or_else(|| dom.parent(&toggle))
            .unwrap_or_else(|| toggle.clone());
        let content = content_region(dom, &toggle, &container).map(|(_, node)| node);
        let scope = match &content {
            Some(content) if !dom.contains(&container, content) => content.clone(),
            _ => container.clone(),
        };
        sections.push(SectionDescriptor {
            label,
            toggle,
            container,
            content,
            scope,
        });
    }

    // Stable: document order within each group.
    sections.sort_by_key(|s| is_section_expanded(dom, s));
    sections
}

/// Whether the section's content is showing.
///
/// `aria-expanded` wins when present. Otherwise the content region's own
/// visibility decides, and without a content region the section counts as
/// expanded when anything only an open section shows is visible: the
/// source filter, the search box, or an action button.
pub fn is_section_expanded<D: Dom>(dom: &D, section: &SectionDescriptor<D::Node>) -> bool {
    match dom.attr(&section.toggle, "aria-expanded").as_deref() {
        Some("true") => return true,
        Some("false") => return false,
        _ => {}
    }

    if let Some(content) = &section.content {
        return is_visible(dom, content) && !has_collapsed_class(&dom.class_name(content));
    }

    shows_open_content(dom, &section.scope)
}

/// A `collapsed` class token, bare or as a `-collapsed`/`--collapsed` suffix.
fn has_collapsed_class(class_name: &str) -> bool {
    class_name
        .split_whitespace()
        .any(|token| token == "collapsed" || token.ends_with("-collapsed"))
}

fn shows_open_content<D: Dom>(dom: &D, scope: &D::Node) -> bool {
    let filter_text = find_by_exact_text(dom, scope, LABEL_CANDIDATES, FILTER_PANEL_TEXT)
        .is_some_and(|n| is_visible(dom, &n));
    let filter_toggle = RULE_FILTERS
        .iter()
        .filter_map(|label| find_toggle_control(dom, scope, label))
        .any(|n| is_visible(dom, &n));
    let search = dom.query_all(scope, SEARCH_INPUT).iter().any(|n| is_visible(dom, n));
    filter_text || filter_toggle || search || has_visible_actions(dom, scope)
}
