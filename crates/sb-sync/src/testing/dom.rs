//! In-memory page: an arena of nodes with scripted click reactions.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use super::selector::{self, Combinator, Complex, ElementView, SelectorList};
use crate::dom::{ComputedStyle, Dom};

const TEXT_TAG: &str = "#text";
const INLINE_TAGS: &[&str] = &["span", "a", "b", "i", "strong", "em", "svg", "label"];
const HIDDEN_STYLE: &str = "display: none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// What a click on a node does to the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Flip the node's own text between two labels.
    SwapText(String, String),
    /// Flip `aria-expanded` and show/hide the controlled content.
    ToggleExpanded { content: NodeId },
    /// Swap one class token for another on `target`, both ways.
    SwapClass { target: NodeId, a: String, b: String },
    Show(NodeId),
    ToggleHidden(NodeId),
    /// Mark the node `aria-selected="true"`.
    Select,
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    value: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    behaviors: Vec<Behavior>,
}

impl NodeData {
    fn new(tag: &str, parent: Option<NodeId>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            parent,
            children: Vec::new(),
            behaviors: Vec::new(),
        }
    }

    fn is_text(&self) -> bool {
        self.tag == TEXT_TAG
    }

    fn is_hidden(&self) -> bool {
        self.attrs.get("style").is_some_and(|s| s.contains(HIDDEN_STYLE))
    }
}

impl ElementView for NodeData {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

pub struct FakeDom {
    nodes: RefCell<Vec<NodeData>>,
    clicks: RefCell<Vec<NodeId>>,
    value_sets: Cell<usize>,
    events: RefCell<Vec<(NodeId, String)>>,
}

impl Default for FakeDom {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDom {
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![NodeData::new("body", None)]),
            clicks: RefCell::new(Vec::new()),
            value_sets: Cell::new(0),
            events: RefCell::new(Vec::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Building
    // -------------------------------------------------------------------------

    fn push(&self, parent: NodeId, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len());
        nodes.push(data);
        nodes[parent.0].children.push(id);
        id
    }

    /// Append an element, optionally with a text child.
    pub fn el(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)], text: Option<&str>) -> NodeId {
        let mut data = NodeData::new(tag, Some(parent));
        for (k, v) in attrs {
            data.attrs.insert((*k).to_string(), (*v).to_string());
        }
        let id = self.push(parent, data);
        if let Some(text) = text {
            self.text(id, text);
        }
        id
    }

    pub fn text(&self, parent: NodeId, text: &str) -> NodeId {
        let mut data = NodeData::new(TEXT_TAG, Some(parent));
        data.text = text.to_string();
        self.push(parent, data)
    }

    pub fn on_click(&self, node: NodeId, behavior: Behavior) {
        self.nodes.borrow_mut()[node.0].behaviors.push(behavior);
    }

    /// Make clicks on `node` do nothing.
    pub fn clear_behaviors(&self, node: NodeId) {
        self.nodes.borrow_mut()[node.0].behaviors.clear();
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        self.nodes.borrow_mut()[node.0].attrs.insert(name.to_string(), value.to_string());
    }

    pub fn remove_attr(&self, node: NodeId, name: &str) {
        self.nodes.borrow_mut()[node.0].attrs.remove(name);
    }

    pub fn set_hidden(&self, node: NodeId, hidden: bool) {
        if hidden {
            self.set_attr(node, "style", HIDDEN_STYLE);
        } else {
            self.remove_attr(node, "style");
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&self, node: NodeId, text: &str) {
        self.nodes.borrow_mut()[node.0].children.clear();
        self.text(node, text);
    }

    /// Detach a node from its parent.
    pub fn remove(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[node.0].parent.take() {
            nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn clicks(&self) -> usize {
        self.clicks.borrow().len()
    }

    pub fn clicked(&self) -> Vec<NodeId> {
        self.clicks.borrow().clone()
    }

    pub fn value_sets(&self) -> usize {
        self.value_sets.get()
    }

    pub fn events(&self) -> Vec<(NodeId, String)> {
        self.events.borrow().clone()
    }

    pub fn value(&self, node: NodeId) -> String {
        self.nodes.borrow()[node.0].value.clone()
    }

    /// Every recorded mutation: clicks plus value assignments.
    pub fn mutations(&self) -> usize {
        self.clicks() + self.value_sets()
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes.borrow()[node.0].is_hidden()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn descendants(&self, scope: NodeId, out: &mut Vec<NodeId>) {
        let children = self.nodes.borrow()[scope.0].children.clone();
        for child in children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn is_element(&self, node: NodeId) -> bool {
        !self.nodes.borrow()[node.0].is_text()
    }

    fn matches_complex(&self, node: NodeId, complex: &Complex, idx: usize) -> bool {
        let matched = {
            let nodes = self.nodes.borrow();
            complex.compounds[idx].matches(&nodes[node.0])
        };
        if !matched {
            return false;
        }
        if idx == 0 {
            return true;
        }
        let parent_of = |n: NodeId| self.nodes.borrow()[n.0].parent;
        match complex.combinators[idx - 1] {
            Combinator::Child => parent_of(node).is_some_and(|p| self.matches_complex(p, complex, idx - 1)),
            Combinator::Descendant => {
                let mut current = parent_of(node);
                while let Some(p) = current {
                    if self.matches_complex(p, complex, idx - 1) {
                        return true;
                    }
                    current = parent_of(p);
                }
                false
            }
        }
    }

    fn matches_list(&self, node: NodeId, list: &SelectorList) -> bool {
        self.is_element(node)
            && list
                .0
                .iter()
                .any(|c| self.matches_complex(node, c, c.compounds.len() - 1))
    }

    fn render(&self, node: NodeId, out: &mut String) {
        let (is_text, hidden, tag, text, children) = {
            let nodes = self.nodes.borrow();
            let data = &nodes[node.0];
            (data.is_text(), data.is_hidden(), data.tag.clone(), data.text.clone(), data.children.clone())
        };
        if is_text {
            out.push_str(&text);
            return;
        }
        if hidden {
            return;
        }
        let block = !INLINE_TAGS.contains(&tag.as_str());
        if block && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        for child in children {
            self.render(child, out);
        }
        if block && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    fn flip_class(&self, target: NodeId, a: &str, b: &str) {
        let class = self.class_name(&target);
        let swapped: Vec<&str> = class
            .split_whitespace()
            .map(|w| if w == a { b } else if w == b { a } else { w })
            .collect();
        self.set_attr(target, "class", &swapped.join(" "));
    }

    fn run(&self, node: NodeId, behavior: Behavior) {
        match behavior {
            Behavior::SwapText(a, b) => {
                let current = self.text_content(&node);
                let next = if current.trim() == a { b } else { a };
                self.set_text(node, &next);
            }
            Behavior::ToggleExpanded { content } => {
                let expanded = self.attr(&node, "aria-expanded").as_deref() == Some("true");
                self.set_attr(node, "aria-expanded", if expanded { "false" } else { "true" });
                self.set_hidden(content, expanded);
            }
            Behavior::SwapClass { target, a, b } => self.flip_class(target, &a, &b),
            Behavior::Show(target) => self.set_hidden(target, false),
            Behavior::ToggleHidden(target) => {
                let hidden = self.is_hidden(target);
                self.set_hidden(target, !hidden);
            }
            Behavior::Select => self.set_attr(node, "aria-selected", "true"),
        }
    }
}

impl Dom for FakeDom {
    type Node = NodeId;

    fn body(&self) -> NodeId {
        NodeId(0)
    }

    fn get_by_id(&self, id: &str) -> Option<NodeId> {
        let mut all = vec![NodeId(0)];
        self.descendants(NodeId(0), &mut all);
        let nodes = self.nodes.borrow();
        all.into_iter().find(|n| nodes[n.0].attrs.get("id").map(String::as_str) == Some(id))
    }

    fn query_all(&self, scope: &NodeId, selector: &str) -> Vec<NodeId> {
        let Some(list) = selector::parse(selector) else {
            return Vec::new();
        };
        let mut all = Vec::new();
        self.descendants(*scope, &mut all);
        all.into_iter().filter(|n| self.matches_list(*n, &list)).collect()
    }

    fn matches(&self, node: &NodeId, selector: &str) -> bool {
        selector::parse(selector).is_some_and(|list| self.matches_list(*node, &list))
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes.borrow()[node.0].parent
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        let children = self.nodes.borrow()[node.0].children.clone();
        children.into_iter().filter(|c| self.is_element(*c)).collect()
    }

    fn next_sibling(&self, node: &NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(&parent);
        let pos = siblings.iter().position(|s| s == node)?;
        siblings.get(pos + 1).copied()
    }

    fn contains(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        let mut current = Some(*node);
        while let Some(n) = current {
            if n == *ancestor {
                return true;
            }
            current = self.parent(&n);
        }
        false
    }

    fn tag_name(&self, node: &NodeId) -> String {
        self.nodes.borrow()[node.0].tag.clone()
    }

    fn attr(&self, node: &NodeId, name: &str) -> Option<String> {
        self.nodes.borrow()[node.0].attrs.get(name).cloned()
    }

    fn text_content(&self, node: &NodeId) -> String {
        let mut all = vec![*node];
        self.descendants(*node, &mut all);
        let nodes = self.nodes.borrow();
        all.iter()
            .filter(|n| nodes[n.0].is_text())
            .map(|n| nodes[n.0].text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }

    fn inner_text(&self, node: &NodeId) -> String {
        let mut out = String::new();
        self.render(*node, &mut out);
        out.trim().to_string()
    }

    fn computed_style(&self, node: &NodeId) -> ComputedStyle {
        let style = self.attr(node, "style").unwrap_or_default();
        let mut computed = ComputedStyle::default();
        for decl in style.split(';') {
            let Some((prop, value)) = decl.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match prop.trim() {
                "display" => computed.display = value,
                "visibility" => computed.visibility = value,
                "opacity" => computed.opacity = value.parse().unwrap_or(1.0),
                _ => {}
            }
        }
        computed
    }

    fn has_layout(&self, node: &NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(*node);
        let mut attached = false;
        while let Some(n) = current {
            if nodes[n.0].is_hidden() {
                return false;
            }
            attached = n == NodeId(0);
            current = nodes[n.0].parent;
        }
        attached
    }

    fn scroll_into_view(&self, _node: &NodeId) {}

    fn click(&self, node: &NodeId) {
        self.clicks.borrow_mut().push(*node);
        let behaviors = self.nodes.borrow()[node.0].behaviors.clone();
        for behavior in behaviors {
            self.run(*node, behavior);
        }
    }

    fn set_value_native(&self, node: &NodeId, value: &str) -> bool {
        let tag = self.tag_name(node);
        if tag != "input" && tag != "textarea" {
            return false;
        }
        self.nodes.borrow_mut()[node.0].value = value.to_string();
        self.value_sets.set(self.value_sets.get() + 1);
        true
    }

    fn dispatch_event(&self, node: &NodeId, event_type: &str) {
        self.events.borrow_mut().push((*node, event_type.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_scoped_with_outer_ancestors() {
        let dom = FakeDom::new();
        let body = dom.body();
        let spells = dom.el(body, "div", &[("class", "ct-spells")], None);
        let header = dom.el(spells, "div", &[("aria-expanded", "false")], Some("Cantrips"));
        let _other = dom.el(body, "div", &[("aria-expanded", "false")], None);

        assert_eq!(dom.query_all(&body, r#".ct-spells [aria-expanded="false"]"#), vec![header]);
        assert_eq!(dom.query_all(&spells, r#".ct-spells [aria-expanded="false"]"#), vec![header]);
        assert!(dom.matches(&header, ".ct-spells > div"));
        assert!(dom.query_all(&body, "div[").is_empty());
    }

    #[test]
    fn test_inner_text_blocks_and_hidden() {
        let dom = FakeDom::new();
        let body = dom.body();
        let row = dom.el(body, "div", &[], None);
        dom.el(row, "span", &[], Some("Mage Armor"));
        dom.el(row, "div", &[], Some("1st Level"));
        let hidden = dom.el(row, "div", &[], Some("secret"));
        dom.set_hidden(hidden, true);

        assert_eq!(dom.inner_text(&row), "Mage Armor\n1st Level");
        assert_eq!(dom.text_content(&row), "Mage Armor1st Levelsecret");
    }

    #[test]
    fn test_click_behaviors() {
        let dom = FakeDom::new();
        let body = dom.body();
        let content = dom.el(body, "div", &[("style", "display: none")], None);
        let header = dom.el(body, "div", &[("aria-expanded", "false")], Some("Known Spells"));
        dom.on_click(header, Behavior::ToggleExpanded { content });
        let button = dom.el(body, "button", &[], Some("Prepare"));
        dom.on_click(button, Behavior::SwapText("Prepare".into(), "Unprepare".into()));

        dom.click(&header);
        dom.click(&button);

        assert_eq!(dom.attr(&header, "aria-expanded").as_deref(), Some("true"));
        assert!(!dom.is_hidden(content));
        assert_eq!(dom.text_content(&button), "Unprepare");
        assert_eq!(dom.clicks(), 2);
    }

    #[test]
    fn test_detached_node_has_no_layout() {
        let dom = FakeDom::new();
        let body = dom.body();
        let div = dom.el(body, "div", &[], None);
        assert!(dom.has_layout(&div));
        dom.remove(div);
        assert!(!dom.has_layout(&div));
    }
}
