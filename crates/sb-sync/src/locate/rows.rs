//! Spell rows: from an action button up to its row, and from a spell name
//! to the row that can act on it.

use sb_core::limits::MAX_ANCESTOR_DEPTH;
use sb_core::normalize::{collapse_whitespace, label_key, spell_key};

use super::action_buttons;
use crate::dom::{is_visible, Dom};

/// Selector cascade for the element holding a row's spell name.
pub const SPELL_NAME_SELECTORS: &[&str] = &[".ddbc-spell-name", ".ct-spell-name", r#"[data-testid="spell-name"]"#, ".spell-name"];

/// Lines in a row that are never the spell's name.
const NOISE_PREFIXES: &[&str] = &["prepare", "unprepare", "cantrip", "concentration", "ritual", "at will"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellAction {
    Prepare,
    Unprepare,
}

impl SpellAction {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "prepare" => Some(Self::Prepare),
            "unprepare" => Some(Self::Unprepare),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "Prepare",
            Self::Unprepare => "Unprepare",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Prepare => Self::Unprepare,
            Self::Unprepare => Self::Prepare,
        }
    }
}

/// A row as seen through its action button.
#[derive(Debug, Clone, PartialEq)]
pub struct SpellEntry<N> {
    pub key: String,
    pub name: String,
    pub row: N,
    pub button: N,
    /// The row offers "Unprepare", so the spell is prepared now.
    pub prepared: bool,
    pub visible: bool,
}

impl<N> SpellEntry<N> {
    pub fn action(&self) -> SpellAction {
        if self.prepared {
            SpellAction::Unprepare
        } else {
            SpellAction::Prepare
        }
    }
}

/// Best row for a target spell.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMatch<N> {
    pub row: N,
    pub name: String,
    pub score: u8,
    pub visible: bool,
}

/// How well a row's name key `name` matches the target key `target`.
///
/// 4 exact, 3 the row name is a prefix of the target, 2 the target is a
/// whole-word run inside the row name, 1 the target is a prefix of the row name,
/// 0 no match.
pub fn match_score(name: &str, target: &str) -> u8 {
    if name.is_empty() || target.is_empty() {
        return 0;
    }
    if name == target {
        4
    } else if target.starts_with(name) {
        3
    } else if format!(" {name} ").contains(&format!(" {target} ")) {
        2
    } else if name.starts_with(target) {
        1
    } else {
        0
    }
}

/// A level tag such as "4th level" or "12th": digits, then an ordinal suffix.
fn is_level_tag(key: &str) -> bool {
    let digits = key.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return false;
    }
    let rest = &key[digits..];
    ["st", "nd", "rd", "th"].iter().any(|&suffix| {
        rest.strip_prefix(suffix)
            .is_some_and(|tail| tail.is_empty() || tail.starts_with(' '))
    })
}

fn first_name_line(text: &str) -> Option<String> {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let key = label_key(line);
            !is_level_tag(&key) && !NOISE_PREFIXES.iter().any(|p| key.starts_with(p))
        })
        .find(|line| line.chars().any(char::is_alphabetic))
}

/// Spell name shown in `container`: the selector cascade first, then the
/// first plain-text line that is not an action label or level tag.
pub fn spell_name_in_container<D: Dom>(dom: &D, container: &D::Node) -> Option<String> {
    for selector in SPELL_NAME_SELECTORS {
        if let Some(node) = dom.query_first(container, selector) {
            let text = collapse_whitespace(&dom.text_content(&node));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    first_name_line(&dom.inner_text(container))
}

/// Walk up from an action button to the smallest ancestor that names a
/// spell, stopping before an ancestor that holds other rows' buttons.
pub fn row_from_button<D: Dom>(dom: &D, button: &D::Node) -> Option<(D::Node, String)> {
    for ancestor in dom.ancestors(button, MAX_ANCESTOR_DEPTH) {
        if action_buttons(dom, &ancestor).len() > 1 {
            return None;
        }
        if let Some(name) = spell_name_in_container(dom, &ancestor) {
            return Some((ancestor, name));
        }
    }
    None
}

/// Every row under `scope` reachable from an action button.
pub fn collect_entries<D: Dom>(dom: &D, scope: &D::Node, visible_only: bool) -> Vec<SpellEntry<D::Node>> {
    let mut entries = Vec::new();
    for (button, action) in action_buttons(dom, scope) {
        let visible = is_visible(dom, &button);
        if visible_only && !visible {
            continue;
        }
        let Some((row, name)) = row_from_button(dom, &button) else {
            continue;
        };
        let key = spell_key(&name);
        if key.is_empty() {
            continue;
        }
        entries.push(SpellEntry {
            key,
            name,
            row,
            button,
            prepared: action == SpellAction::Unprepare,
            visible,
        });
    }
    entries
}

/// Action control in `row` whose label is `action`.
pub fn find_action_button<D: Dom>(dom: &D, row: &D::Node, action: SpellAction) -> Option<D::Node> {
    action_buttons(dom, row)
        .into_iter()
        .find(|(_, a)| *a == action)
        .map(|(button, _)| button)
}

fn nearest_row_with_action<D: Dom>(dom: &D, name_node: &D::Node) -> Option<D::Node> {
    dom.ancestors(name_node, MAX_ANCESTOR_DEPTH)
        .into_iter()
        .find(|a| !action_buttons(dom, a).is_empty())
}

fn better<N>(candidate: &RowMatch<N>, best: &Option<RowMatch<N>>) -> bool {
    match best {
        None => true,
        Some(best) => (candidate.visible, candidate.score) > (best.visible, best.score),
    }
}

/// Row for `spell` under `scope`, ranked by [`match_score`] with visible
/// rows first. Name elements are tried first; rows reached from action
/// buttons cover pages where the name cascade finds nothing.
pub fn find_spell_row<D: Dom>(dom: &D, scope: &D::Node, spell: &str) -> Option<RowMatch<D::Node>> {
    let target = spell_key(spell);
    if target.is_empty() {
        return None;
    }

    let mut best: Option<RowMatch<D::Node>> = None;
    let names = dom.query_all(scope, &SPELL_NAME_SELECTORS.join(", "));
    for name_node in names {
        let name = collapse_whitespace(&dom.text_content(&name_node));
        let score = match_score(&spell_key(&name), &target);
        if score == 0 {
            continue;
        }
        let Some(row) = nearest_row_with_action(dom, &name_node) else {
            continue;
        };
        let candidate = RowMatch {
            row,
            name,
            score,
            visible: is_visible(dom, &name_node),
        };
        if better(&candidate, &best) {
            best = Some(candidate);
        }
    }
    if best.is_some() {
        return best;
    }

    for entry in collect_entries(dom, scope, false) {
        let score = match_score(&entry.key, &target);
        if score == 0 {
            continue;
        }
        let candidate = RowMatch {
            row: entry.row,
            name: entry.name,
            score,
            visible: entry.visible,
        };
        if better(&candidate, &best) {
            best = Some(candidate);
        }
    }
    best
}
