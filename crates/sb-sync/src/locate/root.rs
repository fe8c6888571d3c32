//! The region of the page holding the spell manager.
//!
//! The manager's component boundary has no stable hook, so the root is
//! inferred: start from something we can name and widen until the region
//! holds enough spell actions, falling back to scoring the whole document
//! and finally to `<body>`.

use sb_core::limits::{MAX_ANCESTOR_DEPTH, ROOT_ACTION_THRESHOLD};
use sb_core::normalize::label_key;

use super::{action_buttons, find_clickables, first_match, Strategy};
use crate::dom::Dom;

const ROOT_ANCHORS: &str =
    r#"[data-testid="manage-spells-button"], [data-testid="spell-manager-button"], [data-testid="manage-spells"]"#;

const REGION_CANDIDATES: &str = r#"section, div, [role="dialog"]"#;

const REGION_KEYWORDS: &[&str] = &["known spells", "prepared spells", "filter by source category"];

/// Ancestor of `start` holding at least the threshold of action buttons,
/// else the nearest ancestor holding the most of them.
pub fn widen_to_root<D: Dom>(dom: &D, start: &D::Node) -> Option<D::Node> {
    let mut best: Option<(usize, D::Node)> = None;
    for ancestor in dom.ancestors(start, MAX_ANCESTOR_DEPTH) {
        let count = action_buttons(dom, &ancestor).len();
        if count >= ROOT_ACTION_THRESHOLD {
            return Some(ancestor);
        }
        if count > 0 && best.as_ref().map_or(true, |(c, _)| count > *c) {
            best = Some((count, ancestor));
        }
    }
    best.map(|(_, node)| node)
}

fn score_region<D: Dom>(dom: &D, node: &D::Node) -> usize {
    let actions = action_buttons(dom, node).len();
    if actions == 0 {
        return 0;
    }
    let text = label_key(&dom.text_content(node));
    let keywords = REGION_KEYWORDS.iter().filter(|k| text.contains(*k)).count();
    keywords * 3 + actions
}

/// Highest-scoring region in the document; ties go to the deeper one.
pub fn best_scoring_region<D: Dom>(dom: &D) -> Option<D::Node> {
    let mut best: Option<(usize, D::Node)> = None;
    for node in dom.query_all(&dom.body(), REGION_CANDIDATES) {
        let score = score_region(dom, &node);
        if score > 0 && best.as_ref().map_or(true, |(s, _)| score >= *s) {
            best = Some((score, node));
        }
    }
    best.map(|(_, node)| node)
}

/// Root of the Manage Spells panel and the strategy that found it.
/// Never fails: the last strategy is the document body.
pub fn locate_manage_spells_root<D: Dom>(dom: &D) -> (&'static str, D::Node) {
    let strategies = [
        Strategy::new("test-id anchor", |d: &D| {
            d.query_all(&d.body(), ROOT_ANCHORS)
                .iter()
                .find_map(|anchor| widen_to_root(d, anchor))
        }),
        Strategy::new("manage spells text", |d: &D| {
            find_clickables(d, &d.body(), false, |label| label == "manage spells")
                .iter()
                .find_map(|anchor| widen_to_root(d, anchor))
        }),
        Strategy::new("document scoring", |d: &D| best_scoring_region(d)),
        Strategy::new("body", |d: &D| Some(d.body())),
    ];
    first_match(dom, &strategies).unwrap_or_else(|| ("body", dom.body()))
}
