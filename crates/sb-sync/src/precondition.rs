//! Bringing the sheet into a state where spell rows can be acted on.
//!
//! Spells tab, collapsed headers, Manage Spells, the root, then per
//! section: expanded, source filter panel open, both 2014 rule sets on.

use sb_core::normalize::label_key;

use crate::dom::{describe_all, is_visible, Dom};
use crate::error::SyncError;
use crate::host::Host;
use crate::interact::click_element;
use crate::locate::{
    collect_known_spells_sections, find_by_exact_text, find_clickables, find_toggle_control, first_match,
    has_visible_actions, is_section_expanded, locate_manage_spells_root, SectionDescriptor, Strategy,
    COLLAPSED_SPELL_HEADERS, CORE_RULES, FILTER_PANEL_TEXT, LABEL_CANDIDATES, RULE_FILTERS, SPELLS_TAB_SELECTORS,
    TAB_LIKE,
};
use crate::retry::Backoff;
use crate::session::SyncSession;
use crate::toggle::ToggleState;

const DIAGNOSTIC_BUTTONS: usize = 12;

fn find_spells_tab<D: Dom>(dom: &D) -> Option<(&'static str, D::Node)> {
    let mut strategies: Vec<Strategy<'_, D>> = SPELLS_TAB_SELECTORS
        .iter()
        .map(|selector| Strategy::new("tab selector", move |d: &D| d.query_first(&d.body(), selector)))
        .collect();
    strategies.push(Strategy::new("tab text", |d: &D| {
        d.query_all(&d.body(), TAB_LIKE)
            .into_iter()
            .find(|n| crate::locate::label_of(d, n) == "spells")
    }));
    first_match(dom, &strategies)
}

/// Select the Spells tab unless it already is.
pub async fn open_spells_tab<D: Dom, H: Host>(s: &SyncSession<'_, D, H>) -> Result<(), SyncError> {
    let found = s
        .retry("Spells tab", s.options.lookup_retries, s.backoff(), |_| async move {
            find_spells_tab(s.dom).ok_or_else(|| SyncError::Lookup("Spells tab".into()))
        })
        .await;
    let (strategy, tab) = found.map_err(|_| SyncError::structural("Spells tab"))?;
    s.trace_node(&format!("spells tab via {strategy}"), &tab);

    if s.dom.attr(&tab, "aria-selected").as_deref() == Some("true") {
        s.trace("spells tab already selected", None);
        return Ok(());
    }
    click_element(s, &tab, "Opened Spells tab", s.options.emit_progress).await;
    Ok(())
}

/// Click every visible collapsed spell header under `scope`. Best effort.
pub async fn expand_collapsed_spell_headers<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, scope: &D::Node) -> usize {
    let headers: Vec<D::Node> = s
        .dom
        .query_all(scope, COLLAPSED_SPELL_HEADERS)
        .into_iter()
        .filter(|n| is_visible(s.dom, n))
        .collect();
    for header in &headers {
        click_element(s, header, "Expanded spell header", false).await;
    }
    if !headers.is_empty() {
        s.trace(&format!("expanded {} spell headers", headers.len()), None);
    }
    headers.len()
}

fn known_spells_visible<D: Dom>(dom: &D) -> bool {
    collect_known_spells_sections(dom, &dom.body())
        .iter()
        .any(|section| is_visible(dom, &section.toggle))
}

/// Open the Manage Spells panel unless a Known Spells section already shows.
pub async fn open_manage_spells<D: Dom, H: Host>(s: &SyncSession<'_, D, H>) -> Result<(), SyncError> {
    if known_spells_visible(s.dom) {
        s.trace("manage spells already open", None);
        return Ok(());
    }
    let button = s
        .retry("Manage Spells", s.options.lookup_retries, s.backoff(), |_| async move {
            find_clickables(s.dom, &s.dom.body(), true, |label| label == "manage spells")
                .into_iter()
                .next()
                .ok_or_else(|| SyncError::Lookup("Manage Spells button".into()))
        })
        .await
        .map_err(|_| SyncError::Structural {
            what: "Manage Spells button".into(),
            diagnostics: crate::locate::visible_button_texts(s.dom, &s.dom.body(), DIAGNOSTIC_BUTTONS),
        })?;
    click_element(s, &button, "Opened Manage Spells", s.options.emit_progress).await;
    Ok(())
}

/// Stages one to three, then the manager root with its headers expanded.
pub async fn prepare_manager<D: Dom, H: Host>(s: &SyncSession<'_, D, H>) -> Result<D::Node, SyncError> {
    open_spells_tab(s).await?;
    expand_collapsed_spell_headers(s, &s.dom.body()).await;
    open_manage_spells(s).await?;

    let (strategy, root) = locate_manage_spells_root(s.dom);
    s.trace_node(&format!("manage spells root via {strategy}"), &root);
    expand_collapsed_spell_headers(s, &root).await;
    Ok(root)
}

/// Expand a Known Spells section, accepting visible action rows as proof
/// when the markup gives no other signal.
pub async fn ensure_section_expanded<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    section: &SectionDescriptor<D::Node>,
) -> Result<(), SyncError> {
    if is_section_expanded(s.dom, section) {
        return Ok(());
    }
    s.retry("expand Known Spells", s.options.lookup_retries, s.backoff(), |_| async move {
        if is_section_expanded(s.dom, section) {
            return Ok(());
        }
        click_element(s, &section.toggle, "Expanded Known Spells", s.options.emit_progress).await;
        if is_section_expanded(s.dom, section) || has_visible_actions(s.dom, &section.scope) {
            Ok(())
        } else {
            Err(SyncError::SectionNotExpanded(section.label.clone()))
        }
    })
    .await
}

fn filter_controls_visible<D: Dom>(dom: &D, scope: &D::Node) -> bool {
    RULE_FILTERS
        .iter()
        .any(|label| find_toggle_control(dom, scope, label).is_some_and(|c| is_visible(dom, &c)))
}

/// Open the "Filter By Source Category" panel under `scope` if its toggles
/// are not showing, re-scanning after each click.
pub async fn ensure_filter_panel_visible<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, scope: &D::Node) -> Result<(), SyncError> {
    if filter_controls_visible(s.dom, scope) {
        return Ok(());
    }
    s.retry("source filter panel", s.options.lookup_retries, s.backoff(), |_| async move {
        if filter_controls_visible(s.dom, scope) {
            return Ok(());
        }
        let header = find_by_exact_text(s.dom, scope, LABEL_CANDIDATES, FILTER_PANEL_TEXT)
            .ok_or_else(|| SyncError::Lookup("Filter By Source Category".into()))?;
        let target = crate::locate::resolve_clickable(s.dom, &header);
        click_element(s, &target, "Opened source filters", false).await;
        if filter_controls_visible(s.dom, scope) {
            Ok(())
        } else {
            Err(SyncError::Lookup("source filter toggles".into()))
        }
    })
    .await
}

/// Drive the toggle labelled `label` to `on`: read, click only on
/// mismatch, re-read. An unreadable toggle is an error, never "off".
pub async fn ensure_toggle_state<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    scope: &D::Node,
    label: &str,
    on: bool,
) -> Result<(), SyncError> {
    let desired = ToggleState::from_bool(on);
    let attempts = s.options.lookup_retries + 1;
    s.retry(label, attempts, Backoff::Fixed(s.options.backoff_step_ms), |_| async move {
        let visible_control = || find_toggle_control(s.dom, scope, label).filter(|c| is_visible(s.dom, c));
        let control = match visible_control() {
            Some(control) => control,
            None => {
                if let Err(err) = ensure_filter_panel_visible(s, scope).await {
                    log::warn!("re-opening source filters for {label}: {err}");
                }
                visible_control().ok_or_else(|| SyncError::ToggleNotFound(label.to_string()))?
            }
        };

        let state = s.toggle_state(&control);
        s.trace(&format!("toggle {label}: {state:?}"), None);
        match state {
            ToggleState::Indeterminate => return Err(SyncError::IndeterminateToggle(label.to_string())),
            current if current == desired => return Ok(()),
            _ => {}
        }

        click_element(s, &control, &format!("Enabled {label}"), s.options.emit_progress).await;
        match s.toggle_state(&control) {
            state if state == desired => Ok(()),
            ToggleState::Indeterminate => Err(SyncError::IndeterminateToggle(label.to_string())),
            _ => Err(SyncError::ToggleStuck(label.to_string())),
        }
    })
    .await
}

/// Expand every section and turn both rule sets on, once, before any
/// operation runs. Returns the failures; none of them stop the sync.
pub async fn preconfigure_known_spells_filters<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    sections: &[SectionDescriptor<D::Node>],
) -> Vec<String> {
    let mut errors = Vec::new();
    for section in sections {
        if let Err(err) = ensure_section_expanded(s, section).await {
            errors.push(err.to_string());
            continue;
        }
        if let Err(err) = ensure_filter_panel_visible(s, &section.scope).await {
            errors.push(err.to_string());
            continue;
        }
        for label in RULE_FILTERS {
            if let Err(err) = ensure_toggle_state(s, &section.scope, label, true).await {
                errors.push(err.to_string());
            }
        }
    }
    for err in &errors {
        log::warn!("filter preconfiguration: {err}");
        s.trace("filter preconfiguration failed", Some(serde_json::Value::String(err.clone())));
    }
    if errors.is_empty() && !sections.is_empty() {
        s.progress("Source filters applied");
    }
    errors
}

/// Legacy filter step: make sure "2014 Core Rules" is on under `scope`.
/// Returns whether the filter was found. A missing filter is an error only
/// when `required`.
pub async fn apply_legacy_core_filter<D: Dom, H: Host>(
    s: &SyncSession<'_, D, H>,
    scope: &D::Node,
    required: bool,
) -> Result<bool, SyncError> {
    let wanted = label_key(CORE_RULES);
    let locate = || {
        find_clickables(s.dom, scope, true, |label| label == wanted)
            .into_iter()
            .next()
            .or_else(|| find_toggle_control(s.dom, scope, CORE_RULES))
    };

    let mut control = locate();
    if control.is_none() {
        if let Err(err) = ensure_filter_panel_visible(s, scope).await {
            log::warn!("legacy filter panel: {err}");
        }
        control = locate();
    }

    let Some(control) = control else {
        if !required {
            s.trace("2014 Core Rules filter not found, continuing", None);
            return Ok(false);
        }
        let candidates = crate::locate::visible_button_texts(s.dom, scope, DIAGNOSTIC_BUTTONS);
        s.trace("2014 Core Rules filter not found", Some(serde_json::json!(candidates)));
        let nodes: Vec<D::Node> = s.dom.query_all(scope, crate::locate::CLICKABLE).into_iter().take(3).collect();
        s.trace("first clickables", Some(describe_all(s.dom, &nodes)));
        return Err(SyncError::Structural {
            what: "2014 Core Rules filter".into(),
            diagnostics: candidates,
        });
    };

    if s.toggle_state(&control) == ToggleState::On {
        s.trace_node("2014 Core Rules already on", &control);
    } else {
        click_element(s, &control, "Applied 2014 Core Rules filter", s.options.emit_progress).await;
    }
    Ok(true)
}
