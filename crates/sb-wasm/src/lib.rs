//! WebAssembly bindings for Spellbook Sync
//!
//! One module serves every extension context. In the content script the
//! start hook installs the page and runtime listeners; the popup and the
//! background worker only call the exported helpers.

pub mod content;
pub mod dom;
pub mod host;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use sb_core::messages::SyncResponse;
use sb_core::preview::{summarize_ops, SyncPreview};
use sb_core::SyncPayload;

pub use dom::WebDom;
pub use host::WasmHost;

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Into::into)
}

pub(crate) fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value.clone()).map_err(Into::into)
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    content::install();
}

/// Run the payload validator; `{ ok, payload }` or `{ ok: false, error }`.
#[wasm_bindgen]
pub fn validate_payload(raw: JsValue) -> Result<JsValue, JsValue> {
    let response = match from_js::<Value>(&raw) {
        Ok(raw) => match sb_core::validate_payload(&raw) {
            Ok(payload) => serde_json::json!({ "ok": true, "payload": payload }),
            Err(err) => serde_json::json!({ "ok": false, "error": err.to_string() }),
        },
        Err(_) => serde_json::json!({ "ok": false, "error": "Payload must be an object" }),
    };
    to_js(&response)
}

#[wasm_bindgen]
pub fn extract_character_id(url: &str) -> Option<String> {
    sb_core::extract_dndbeyond_character_id(url)
}

#[wasm_bindgen]
pub fn is_sync_target(url: &str) -> bool {
    sb_core::is_sync_target(url)
}

/// State for `POPUP_INIT`, from the active tab's URL and whatever is stored
/// under the payload key (`undefined` when nothing is).
#[wasm_bindgen]
pub fn popup_status(tab_url: Option<String>, stored: JsValue) -> Result<JsValue, JsValue> {
    let stored = if stored.is_undefined() || stored.is_null() {
        None
    } else {
        Some(from_js::<Value>(&stored)?)
    };
    to_js(&sb_core::messages::popup_status(tab_url.as_deref(), stored.as_ref()))
}

/// `PREVIEW_EXECUTE` for a v2 payload without asking the content script.
#[wasm_bindgen]
pub fn preview_ops(raw: JsValue) -> Result<JsValue, JsValue> {
    let response: SyncResponse<SyncPreview> = match from_js::<Value>(&raw) {
        Err(_) => SyncResponse::failure("Payload must be an object", None),
        Ok(raw) => match sb_core::validate_payload(&raw) {
            Ok(SyncPayload::Ops(payload)) => SyncResponse::success(SyncPreview::Ops(summarize_ops(&payload))),
            Ok(SyncPayload::Legacy(_)) => {
                SyncResponse::failure("Legacy payloads are previewed on the character sheet", None)
            }
            Err(err) => SyncResponse::failure(err.to_string(), None),
        },
    };
    to_js(&response)
}
