//! Character-sheet fixtures shaped like the D&D Beyond spell manager.

use super::dom::{Behavior, FakeDom, NodeId};
use crate::dom::Dom;

const OUTLINE: &str = "ddbc-svg--outline";
const SOLID: &str = "ddbc-svg--solid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ruleset {
    Core,
    Expanded,
}

#[derive(Debug, Clone)]
struct SpellSpec {
    name: String,
    ruleset: Ruleset,
    prepared: bool,
}

#[derive(Debug, Clone)]
struct SectionSpec {
    expanded: bool,
    spells: Vec<SpellSpec>,
}

#[derive(Debug, Clone)]
pub struct SheetBuilder {
    sections: Vec<SectionSpec>,
    spells_tab_selected: bool,
    manager_open: bool,
    filters_on: bool,
    toggle_markers: bool,
}

impl Default for SheetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles into a built sheet.
pub struct Sheet {
    pub dom: FakeDom,
    pub spells_tab: NodeId,
    pub manage_button: NodeId,
    pub manager: NodeId,
    pub sections: Vec<SectionNodes>,
}

pub struct SectionNodes {
    pub header: NodeId,
    pub content: NodeId,
    pub filter_header: NodeId,
    pub filter_body: NodeId,
    /// `(label, switch)` per rule-set toggle.
    pub toggles: Vec<(String, NodeId)>,
    pub search: NodeId,
    /// `(spell name, action button)` per row.
    pub rows: Vec<(String, NodeId)>,
}

impl Sheet {
    pub fn button_for(&self, spell: &str) -> Option<NodeId> {
        self.sections
            .iter()
            .flat_map(|s| s.rows.iter())
            .find(|(name, _)| name == spell)
            .map(|(_, button)| *button)
    }

    pub fn button_text(&self, spell: &str) -> Option<String> {
        self.button_for(spell).map(|b| self.dom.text_content(&b))
    }
}

impl SheetBuilder {
    /// A sheet on some other tab, manager closed, filters off.
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            spells_tab_selected: false,
            manager_open: false,
            filters_on: false,
            toggle_markers: true,
        }
    }

    /// Spells tab selected, manager open, both rule filters on.
    pub fn opened(mut self) -> Self {
        self.spells_tab_selected = true;
        self.manager_open = true;
        self.filters_on = true;
        self
    }

    pub fn filters_on(mut self, on: bool) -> Self {
        self.filters_on = on;
        self
    }

    /// Render toggles without any solid/outline styling.
    pub fn without_toggle_markers(mut self) -> Self {
        self.toggle_markers = false;
        self
    }

    /// Add a Known Spells section with `(name, ruleset, prepared)` rows.
    pub fn section(mut self, expanded: bool, spells: &[(&str, Ruleset, bool)]) -> Self {
        self.sections.push(SectionSpec {
            expanded,
            spells: spells
                .iter()
                .map(|(name, ruleset, prepared)| SpellSpec {
                    name: (*name).to_string(),
                    ruleset: *ruleset,
                    prepared: *prepared,
                })
                .collect(),
        });
        self
    }

    pub fn build(self) -> Sheet {
        let dom = FakeDom::new();
        let body = dom.body();
        let sheet = dom.el(body, "div", &[("class", "ct-character-sheet")], None);

        let tabs = dom.el(sheet, "nav", &[("class", "ct-primary-box__tabs"), ("role", "tablist")], None);
        let selected = if self.spells_tab_selected { "true" } else { "false" };
        let spells_tab = dom.el(
            tabs,
            "button",
            &[("id", "SPELLS"), ("data-testid", "SPELLS"), ("role", "tab"), ("aria-selected", selected)],
            Some("Spells"),
        );
        dom.el(tabs, "button", &[("role", "tab"), ("aria-selected", "false")], Some("Actions"));

        let spells = dom.el(sheet, "div", &[("class", "ct-spells")], None);
        dom.set_hidden(spells, !self.spells_tab_selected);
        dom.on_click(spells_tab, Behavior::Select);
        dom.on_click(spells_tab, Behavior::Show(spells));

        let spells_header = dom.el(spells, "div", &[("class", "ct-spells__header")], None);
        let manage_button = dom.el(
            spells_header,
            "button",
            &[("class", "ct-spells__manage"), ("data-testid", "manage-spells-button")],
            Some("Manage Spells"),
        );

        let manager = dom.el(spells, "div", &[("class", "ct-spell-manager"), ("role", "dialog")], None);
        dom.set_hidden(manager, !self.manager_open);
        dom.on_click(manage_button, Behavior::Show(manager));
        dom.el(manager, "h2", &[("class", "ct-spell-manager__title")], Some("Wizard"));

        let sections = self
            .sections
            .iter()
            .enumerate()
            .map(|(i, spec)| self.build_section(&dom, manager, i, spec))
            .collect();

        Sheet {
            dom,
            spells_tab,
            manage_button,
            manager,
            sections,
        }
    }

    fn build_section(&self, dom: &FakeDom, manager: NodeId, index: usize, spec: &SectionSpec) -> SectionNodes {
        let content_id = format!("known-spells-{index}");
        let collapsible = dom.el(manager, "div", &[("class", "ddbc-collapsible")], None);
        let header = dom.el(
            collapsible,
            "div",
            &[
                ("class", "ddbc-collapsible__header"),
                ("role", "button"),
                ("aria-expanded", if spec.expanded { "true" } else { "false" }),
                ("aria-controls", content_id.as_str()),
            ],
            None,
        );
        dom.el(header, "span", &[("class", "ddbc-collapsible__heading")], Some("Known Spells"));
        dom.el(header, "span", &[("class", "ddbc-collapsible__count")], Some(spec.spells.len().to_string().as_str()));

        let content = dom.el(collapsible, "div", &[("class", "ddbc-collapsible__content"), ("id", content_id.as_str())], None);
        dom.set_hidden(content, !spec.expanded);
        dom.on_click(header, Behavior::ToggleExpanded { content });

        let filters = dom.el(content, "div", &[("class", "ct-spell-manager__filters")], None);
        let filter_header = dom.el(
            filters,
            "div",
            &[("class", "ct-spell-manager__filters-header"), ("role", "button")],
            Some("Filter By Source Category"),
        );
        let filter_body = dom.el(filters, "div", &[("class", "ct-spell-manager__filters-body")], None);
        dom.set_hidden(filter_body, !self.filters_on);
        dom.on_click(filter_header, Behavior::Show(filter_body));

        let search = dom.el(
            content,
            "input",
            &[("type", "search"), ("placeholder", "Search Spell Names")],
            None,
        );

        let mut toggles = Vec::new();
        let mut rows = Vec::new();
        for (ruleset, label) in [(Ruleset::Core, "2014 Core Rules"), (Ruleset::Expanded, "2014 Expanded Rules")] {
            let list = dom.el(content, "div", &[("class", "ct-spell-manager__spells")], None);
            dom.set_hidden(list, !self.filters_on);

            let row = dom.el(filter_body, "div", &[("class", "ct-source-toggle")], None);
            dom.el(row, "span", &[("class", "ct-source-toggle__label")], Some(label));
            let switch = dom.el(row, "button", &[("class", "ddbc-toggle-field"), ("role", "switch")], None);
            if self.toggle_markers {
                let (now, other) = if self.filters_on { (SOLID, OUTLINE) } else { (OUTLINE, SOLID) };
                let svg = dom.el(switch, "svg", &[("class", format!("ddbc-svg {now}").as_str())], None);
                dom.on_click(
                    switch,
                    Behavior::SwapClass {
                        target: svg,
                        a: now.to_string(),
                        b: other.to_string(),
                    },
                );
            }
            dom.on_click(switch, Behavior::ToggleHidden(list));
            toggles.push((label.to_string(), switch));

            for spell in spec.spells.iter().filter(|s| s.ruleset == ruleset) {
                rows.push((spell.name.clone(), build_row(dom, list, spell)));
            }
        }

        SectionNodes {
            header,
            content,
            filter_header,
            filter_body,
            toggles,
            search,
            rows,
        }
    }
}

fn build_row(dom: &FakeDom, list: NodeId, spell: &SpellSpec) -> NodeId {
    let row = dom.el(list, "div", &[("class", "ct-spell-manager__spell")], None);
    let header = dom.el(row, "div", &[("class", "ct-spell-manager__spell-header")], None);
    dom.el(header, "span", &[("class", "ddbc-spell-name")], Some(&spell.name));
    dom.el(header, "span", &[("class", "ct-spell-manager__spell-level")], Some("1st Level"));
    let actions = dom.el(row, "div", &[("class", "ct-spell-manager__spell-actions")], None);
    let label = if spell.prepared { "Unprepare" } else { "Prepare" };
    let button = dom.el(actions, "button", &[("class", "ct-spell-manager__spell-action")], Some(label));
    dom.on_click(button, Behavior::SwapText("Prepare".into(), "Unprepare".into()));
    button
}
