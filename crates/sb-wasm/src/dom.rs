//! [`Dom`] over the live page through `web-sys`.

use js_sys::{Function, Object, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, Element, Event, EventInit, HtmlElement, HtmlInputElement, ScrollIntoViewOptions, ScrollLogicalPosition,
    Window,
};

use sb_sync::{ComputedStyle, Dom};

pub struct WebDom {
    window: Window,
    document: Document,
    body: Element,
}

impl WebDom {
    pub fn new(window: Window) -> Result<Self, JsValue> {
        let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
        let body: Element = match document.body() {
            Some(body) => body.into(),
            None => document
                .document_element()
                .ok_or_else(|| JsValue::from_str("document has no root element"))?,
        };
        Ok(Self { window, document, body })
    }

    pub fn from_global() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        Self::new(window)
    }
}

/// `HTMLInputElement.prototype.value` setter, which React's own value
/// tracking does not intercept.
fn native_value_setter() -> Option<Function> {
    let ctor = Reflect::get(&js_sys::global(), &"HTMLInputElement".into()).ok()?;
    let proto = Reflect::get(&ctor, &"prototype".into()).ok()?;
    let descriptor = Object::get_own_property_descriptor(proto.dyn_ref::<Object>()?, &"value".into());
    Reflect::get(&descriptor, &"set".into()).ok()?.dyn_into::<Function>().ok()
}

impl Dom for WebDom {
    type Node = Element;

    fn body(&self) -> Element {
        self.body.clone()
    }

    fn get_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn query_all(&self, scope: &Element, selector: &str) -> Vec<Element> {
        let Ok(list) = scope.query_selector_all(selector) else {
            log::debug!("bad selector {selector:?}");
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn matches(&self, node: &Element, selector: &str) -> bool {
        node.matches(selector).unwrap_or(false)
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn children(&self, node: &Element) -> Vec<Element> {
        let children = node.children();
        (0..children.length()).filter_map(|i| children.item(i)).collect()
    }

    fn next_sibling(&self, node: &Element) -> Option<Element> {
        node.next_element_sibling()
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        let node: &web_sys::Node = node;
        ancestor.contains(Some(node))
    }

    fn tag_name(&self, node: &Element) -> String {
        node.tag_name().to_lowercase()
    }

    fn attr(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn text_content(&self, node: &Element) -> String {
        node.text_content().unwrap_or_default()
    }

    fn inner_text(&self, node: &Element) -> String {
        match node.dyn_ref::<HtmlElement>() {
            Some(html) => html.inner_text(),
            None => self.text_content(node),
        }
    }

    fn computed_style(&self, node: &Element) -> ComputedStyle {
        let Ok(Some(style)) = self.window.get_computed_style(node) else {
            return ComputedStyle::default();
        };
        let prop = |name: &str| style.get_property_value(name).unwrap_or_default();
        ComputedStyle {
            display: prop("display"),
            visibility: prop("visibility"),
            opacity: prop("opacity").trim().parse().unwrap_or(1.0),
        }
    }

    fn has_layout(&self, node: &Element) -> bool {
        node.get_client_rects().length() > 0
    }

    fn scroll_into_view(&self, node: &Element) {
        let options = ScrollIntoViewOptions::new();
        options.set_block(ScrollLogicalPosition::Center);
        node.scroll_into_view_with_scroll_into_view_options(&options);
    }

    fn click(&self, node: &Element) {
        if let Some(html) = node.dyn_ref::<HtmlElement>() {
            html.click();
        } else {
            // svg icons and friends have no click()
            self.dispatch_event(node, "click");
        }
    }

    fn set_value_native(&self, node: &Element, value: &str) -> bool {
        let Some(input) = node.dyn_ref::<HtmlInputElement>() else {
            return false;
        };
        match native_value_setter() {
            Some(setter) => {
                if let Err(err) = setter.call1(input, &JsValue::from_str(value)) {
                    log::warn!("native value setter failed: {err:?}");
                    input.set_value(value);
                }
            }
            None => input.set_value(value),
        }
        true
    }

    fn dispatch_event(&self, node: &Element, event_type: &str) {
        let init = EventInit::new();
        init.set_bubbles(true);
        match Event::new_with_event_init_dict(event_type, &init) {
            Ok(event) => {
                let _ = node.dispatch_event(&event);
            }
            Err(err) => log::warn!("could not create {event_type} event: {err:?}"),
        }
    }
}
