//! Reading on/off state of the source-category toggles.
//!
//! The sheet renders toggles as icon buttons whose only state signal is a
//! "solid" or "outline" fragment in some class name near the control.
//! That coupling is kept behind [`ToggleReader`] so a better signal can
//! replace it without touching the flows that flip toggles.

use crate::dom::Dom;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    On,
    Off,
    /// No signal found. Callers treat this as a failure, never as `Off`.
    Indeterminate,
}

impl ToggleState {
    pub fn from_bool(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Indeterminate)
    }
}

pub trait ToggleReader<D: Dom> {
    fn read(&self, dom: &D, control: &D::Node) -> ToggleState;
}

/// "solid" means on, "outline" means off, checked on the control, its
/// first child, its parent and any nested style markers, in that order.
#[derive(Debug, Clone, Default)]
pub struct ClassFragmentToggle;

const ON_FRAGMENT: &str = "solid";
const OFF_FRAGMENT: &str = "outline";
const STYLE_MARKERS: &str = "svg, [class*=\"solid\"], [class*=\"outline\"]";

fn classify(class: &str) -> ToggleState {
    let class = class.to_ascii_lowercase();
    if class.contains(ON_FRAGMENT) {
        ToggleState::On
    } else if class.contains(OFF_FRAGMENT) {
        ToggleState::Off
    } else {
        ToggleState::Indeterminate
    }
}

impl<D: Dom> ToggleReader<D> for ClassFragmentToggle {
    fn read(&self, dom: &D, control: &D::Node) -> ToggleState {
        let mut candidates = vec![control.clone()];
        candidates.extend(dom.children(control).into_iter().next());
        candidates.extend(dom.parent(control));
        candidates.extend(dom.query_all(control, STYLE_MARKERS));

        candidates
            .iter()
            .map(|node| classify(&dom.class_name(node)))
            .find(ToggleState::is_known)
            .unwrap_or(ToggleState::Indeterminate)
    }
}

/// ARIA and form state: `aria-pressed`, `aria-checked`, then `checked`.
#[derive(Debug, Clone, Default)]
pub struct AriaToggle;

impl<D: Dom> ToggleReader<D> for AriaToggle {
    fn read(&self, dom: &D, control: &D::Node) -> ToggleState {
        for attr in ["aria-pressed", "aria-checked"] {
            match dom.attr(control, attr).as_deref() {
                Some("true") => return ToggleState::On,
                Some("false") => return ToggleState::Off,
                _ => {}
            }
        }
        if dom.tag_name(control) == "input" {
            return ToggleState::from_bool(dom.attr(control, "checked").is_some());
        }
        ToggleState::Indeterminate
    }
}

/// First reader with a definite answer wins.
pub struct FallbackToggle<D: Dom> {
    readers: Vec<Box<dyn ToggleReader<D>>>,
}

impl<D: Dom> FallbackToggle<D> {
    pub fn new(readers: Vec<Box<dyn ToggleReader<D>>>) -> Self {
        Self { readers }
    }
}

impl<D: Dom + 'static> Default for FallbackToggle<D> {
    /// Class fragments first, ARIA state second.
    fn default() -> Self {
        Self::new(vec![Box::new(ClassFragmentToggle), Box::new(AriaToggle)])
    }
}

impl<D: Dom> ToggleReader<D> for FallbackToggle<D> {
    fn read(&self, dom: &D, control: &D::Node) -> ToggleState {
        self.readers
            .iter()
            .map(|reader| reader.read(dom, control))
            .find(ToggleState::is_known)
            .unwrap_or(ToggleState::Indeterminate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDom;

    #[test]
    fn test_class_fragment_on_nested_marker() {
        let dom = FakeDom::new();
        let body = dom.body();
        let button = dom.el(body, "button", &[("role", "switch")], None);
        let wrap = dom.el(button, "span", &[], None);
        let svg = dom.el(wrap, "svg", &[("class", "ddbc-svg ddbc-svg--themed-solid")], None);

        assert_eq!(ClassFragmentToggle.read(&dom, &button), ToggleState::On);
        dom.set_attr(svg, "class", "ddbc-svg ddbc-svg--outline");
        assert_eq!(ClassFragmentToggle.read(&dom, &button), ToggleState::Off);
    }

    #[test]
    fn test_class_fragment_indeterminate() {
        let dom = FakeDom::new();
        let body = dom.body();
        let button = dom.el(body, "button", &[("class", "ddbc-toggle")], None);
        assert_eq!(ClassFragmentToggle.read(&dom, &button), ToggleState::Indeterminate);
    }

    #[test]
    fn test_fallback_uses_aria() {
        let dom = FakeDom::new();
        let body = dom.body();
        let button = dom.el(body, "button", &[("aria-pressed", "true")], None);

        let reader: FallbackToggle<FakeDom> = FallbackToggle::default();
        assert_eq!(reader.read(&dom, &button), ToggleState::On);

        dom.remove_attr(button, "aria-pressed");
        assert_eq!(reader.read(&dom, &button), ToggleState::Indeterminate);
    }

    #[test]
    fn test_aria_checkbox_input() {
        let dom = FakeDom::new();
        let body = dom.body();
        let input = dom.el(body, "input", &[("type", "checkbox")], None);
        assert_eq!(AriaToggle.read(&dom, &input), ToggleState::Off);
        dom.set_attr(input, "checked", "");
        assert_eq!(AriaToggle.read(&dom, &input), ToggleState::On);
    }
}
