//! [`Host`] for the content script, plus the `chrome.*` plumbing it needs.

use std::future::Future;

use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};

use sb_core::messages::RuntimeMessage;
use sb_sync::Host;

use crate::to_js;

#[derive(Debug, Default, Clone, Copy)]
pub struct WasmHost;

impl Host for WasmHost {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    fn random(&self) -> f64 {
        js_sys::Math::random()
    }

    fn sleep(&self, ms: u64) -> impl Future<Output = ()> {
        gloo_timers::future::TimeoutFuture::new(ms.min(u64::from(u32::MAX)) as u32)
    }

    fn progress(&self, label: &str) {
        let message = RuntimeMessage::SyncProgress { label: label.to_string() };
        if let Err(err) = send_runtime_message(&message) {
            log::debug!("progress not delivered: {err:?}");
        }
    }
}

/// Walk `chrome.<path>` from the global object.
pub(crate) fn chrome_api(path: &[&str]) -> Result<JsValue, JsValue> {
    let mut current = Reflect::get(&js_sys::global(), &"chrome".into())?;
    for key in path {
        if current.is_undefined() || current.is_null() {
            return Err(JsValue::from_str(&format!("chrome.{} is unavailable", path.join("."))));
        }
        current = Reflect::get(&current, &JsValue::from_str(key))?;
    }
    if current.is_undefined() {
        return Err(JsValue::from_str(&format!("chrome.{} is unavailable", path.join("."))));
    }
    Ok(current)
}

/// Call `chrome.<object>.<method>(args...)` with the right receiver.
pub(crate) fn chrome_call(object: &[&str], method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let target = chrome_api(object)?;
    let function: Function = Reflect::get(&target, &JsValue::from_str(method))?.dyn_into()?;
    let args: js_sys::Array = args.iter().collect();
    Reflect::apply(&function, &target, &args)
}

/// Fire-and-forget `chrome.runtime.sendMessage`. A rejected promise (popup
/// closed, no listener) is swallowed.
pub fn send_runtime_message(message: &RuntimeMessage) -> Result<(), JsValue> {
    let value = to_js(message)?;
    let returned = chrome_call(&["runtime"], "sendMessage", &[value])?;
    if let Ok(promise) = returned.dyn_into::<Promise>() {
        spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                log::debug!("sendMessage rejected: {err:?}");
            }
        });
    }
    Ok(())
}

/// `chrome.storage.local.set({ [key]: value })`.
pub async fn storage_set(key: &str, value: &JsValue) -> Result<(), JsValue> {
    let items = js_sys::Object::new();
    Reflect::set(&items, &JsValue::from_str(key), value)?;
    let returned = chrome_call(&["storage", "local"], "set", &[items.into()])?;
    if let Ok(promise) = returned.dyn_into::<Promise>() {
        JsFuture::from(promise).await?;
    }
    Ok(())
}
