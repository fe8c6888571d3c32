//! Content-script ingress: the page's `postMessage` channel and
//! `chrome.runtime.onMessage`.

use std::cell::Cell;
use std::rc::Rc;

use js_sys::{Function, Reflect};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{MessageEvent, Window};

use sb_core::messages::{PageMessage, RuntimeMessage, STORAGE_KEY};
use sb_core::{validate_payload, SyncPayload};
use sb_sync::Router;

use crate::dom::WebDom;
use crate::host::{chrome_api, storage_set, WasmHost};
use crate::{from_js, to_js};

const PAYLOAD_SET: &str = "SPELLBOOK_SYNC_PAYLOAD_SET";

thread_local! {
    static INSTALLED: Cell<bool> = const { Cell::new(false) };
    static ROUTER: Rc<Router> = Rc::new(Router::default());
}

/// Hook both listeners up once per page. Does nothing outside a web page
/// (popup, background worker).
pub fn install() {
    if INSTALLED.with(|flag| flag.replace(true)) {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    let protocol = window.location().protocol().unwrap_or_default();
    if protocol != "https:" && protocol != "http:" {
        return;
    }

    if is_top_window(&window) {
        if let Err(err) = install_page_listener(&window) {
            log::warn!("page listener not installed: {err:?}");
        }
    }
    if let Err(err) = install_runtime_listener() {
        log::warn!("runtime listener not installed: {err:?}");
    }
}

fn is_top_window(window: &Window) -> bool {
    match window.top() {
        Ok(Some(top)) => JsValue::from(top) == JsValue::from(window.clone()),
        _ => false,
    }
}

// =============================================================================
// Page -> content script
// =============================================================================

fn install_page_listener(window: &Window) -> Result<(), JsValue> {
    let own = window.clone();
    let callback = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
        on_page_message(&own, &event);
    });
    window.add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())?;
    // lives as long as the page
    callback.forget();
    Ok(())
}

fn on_page_message(window: &Window, event: &MessageEvent) {
    let from_self = event
        .source()
        .is_some_and(|source| JsValue::from(source) == JsValue::from(window.clone()));
    if !from_self {
        return;
    }
    let Ok(origin) = window.location().origin() else {
        return;
    };
    if event.origin() != origin {
        return;
    }

    let Ok(data) = from_js::<Value>(&event.data()) else {
        return;
    };
    if data.get("type").and_then(Value::as_str) != Some(PAYLOAD_SET) {
        return;
    }

    let raw = data.get("payload").cloned().unwrap_or(Value::Null);
    let window = window.clone();
    spawn_local(async move {
        let result = accept_page_payload(&raw).await;
        let ack = PageMessage::ack(&result, js_sys::Date::now());
        match to_js(&ack) {
            Ok(message) => {
                if let Err(err) = window.post_message(&message, &origin) {
                    log::warn!("ack not posted: {err:?}");
                }
            }
            Err(err) => log::warn!("ack not encoded: {err:?}"),
        }
    });
}

/// Validate with the shared validator, then persist the normalized payload.
async fn accept_page_payload(raw: &Value) -> Result<SyncPayload, String> {
    let payload = validate_payload(raw).map_err(|e| e.to_string())?;
    let stored = to_js(&payload).map_err(|e| format!("could not encode payload: {e:?}"))?;
    storage_set(STORAGE_KEY, &stored)
        .await
        .map_err(|e| format!("could not save payload: {e:?}"))?;
    log::debug!("stored v{} payload", payload.version());
    Ok(payload)
}

// =============================================================================
// Background -> content script
// =============================================================================

fn install_runtime_listener() -> Result<(), JsValue> {
    let callback = Closure::wrap(Box::new(
        move |message: JsValue, _sender: JsValue, send_response: Function| -> JsValue {
            let Ok(raw) = from_js::<Value>(&message) else {
                return JsValue::FALSE;
            };
            let decoded = match RuntimeMessage::decode_execute(&raw) {
                Some(decoded) => decoded,
                None => return JsValue::FALSE,
            };
            spawn_local(async move {
                let response = match decoded {
                    Ok(message) => handle_runtime_message(message).await,
                    Err(error) => {
                        log::warn!("{error}");
                        serde_json::json!({ "ok": false, "error": error })
                    }
                };
                let reply = to_js(&response).unwrap_or(JsValue::NULL);
                let _ = send_response.call1(&JsValue::UNDEFINED, &reply);
            });
            // answer asynchronously
            JsValue::TRUE
        },
    ) as Box<dyn FnMut(JsValue, JsValue, Function) -> JsValue>);

    let on_message = chrome_api(&["runtime", "onMessage"])?;
    let add_listener: Function = Reflect::get(&on_message, &"addListener".into())?.dyn_into()?;
    add_listener.call1(&on_message, callback.as_ref())?;
    callback.forget();
    Ok(())
}

async fn handle_runtime_message(message: RuntimeMessage) -> Value {
    let dom = match WebDom::from_global() {
        Ok(dom) => dom,
        Err(err) => return serde_json::json!({ "ok": false, "error": format!("{err:?}") }),
    };
    let router = ROUTER.with(Rc::clone);
    router
        .handle(&dom, &WasmHost, message)
        .await
        .unwrap_or_else(|| serde_json::json!({ "ok": false, "error": "Unsupported message" }))
}
