//! Execute-request handling with the single in-flight gate.
//!
//! A request is rejected while another one runs; there is no queue. The
//! gate is taken synchronously, before the first await, and released by
//! [`FlightGuard`] however the request ends.

use std::cell::Cell;

use serde_json::{json, Value};

use sb_core::messages::{check_context, ExecuteRequest, RuntimeMessage, SyncResponse};
use sb_core::preview::{summarize_ops, SyncPreview};
use sb_core::{validate_payload, SyncOptions, SyncPayload, SyncResult};

use crate::dom::Dom;
use crate::error::SyncError;
use crate::host::Host;
use crate::legacy::{preview_legacy, sync_legacy};
use crate::ops::sync_ops;
use crate::session::SyncSession;

#[derive(Debug, Default)]
pub struct Router {
    in_flight: Cell<bool>,
    defaults: SyncOptions,
}

/// Holds the gate; dropping it opens the gate again.
#[must_use]
pub struct FlightGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

impl Router {
    pub fn new(defaults: SyncOptions) -> Self {
        Self {
            in_flight: Cell::new(false),
            defaults,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    pub fn try_begin(&self) -> Result<FlightGuard<'_>, SyncError> {
        if self.in_flight.replace(true) {
            return Err(SyncError::Busy);
        }
        Ok(FlightGuard { flag: &self.in_flight })
    }

    fn options_for(&self, request: &ExecuteRequest) -> SyncOptions {
        request.options.clone().unwrap_or_else(|| self.defaults.clone())
    }

    /// `SYNC_EXECUTE`: validate, check the tab, run the pipeline the
    /// payload's version selects. Failures carry the debug trace.
    pub async fn sync_execute<D, H>(&self, dom: &D, host: &H, request: &ExecuteRequest) -> SyncResponse<SyncResult>
    where
        D: Dom + 'static,
        H: Host,
    {
        let _guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(err) => return SyncResponse::failure(err.to_string(), None),
        };
        let session = SyncSession::new(dom, host, self.options_for(request));
        match run_sync(&session, request).await {
            Ok(result) => SyncResponse::success(result),
            Err(err) => {
                log::warn!("sync failed: {err}");
                session.trace("sync failed", Some(Value::String(err.to_string())));
                SyncResponse::failure(err.to_string(), Some(session.debug_snapshot()))
            }
        }
    }

    /// `PREVIEW_EXECUTE`: same validation, no row is ever clicked. An ops
    /// preview does not look at the page at all.
    pub async fn preview_execute<D, H>(&self, dom: &D, host: &H, request: &ExecuteRequest) -> SyncResponse<SyncPreview>
    where
        D: Dom + 'static,
        H: Host,
    {
        let _guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(err) => return SyncResponse::failure(err.to_string(), None),
        };
        let options = SyncOptions {
            emit_progress: false,
            require_2014: false,
            ..self.options_for(request)
        };
        let session = SyncSession::new(dom, host, options);
        match run_preview(&session, request).await {
            Ok(preview) => SyncResponse::success(preview),
            Err(err) => {
                log::warn!("preview failed: {err}");
                SyncResponse::failure(err.to_string(), None)
            }
        }
    }

    /// Route a runtime message; `None` for messages this side does not answer.
    pub async fn handle<D, H>(&self, dom: &D, host: &H, message: RuntimeMessage) -> Option<Value>
    where
        D: Dom + 'static,
        H: Host,
    {
        let response = match message {
            RuntimeMessage::SyncExecute(request) => serde_json::to_value(self.sync_execute(dom, host, &request).await),
            RuntimeMessage::PreviewExecute(request) => {
                serde_json::to_value(self.preview_execute(dom, host, &request).await)
            }
            _ => return None,
        };
        Some(response.unwrap_or_else(|err| json!({ "ok": false, "error": err.to_string() })))
    }
}

fn accept(request: &ExecuteRequest) -> Result<SyncPayload, SyncError> {
    let payload = validate_payload(&request.payload)?;
    check_context(&payload, &request.context)?;
    Ok(payload)
}

async fn run_sync<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, request: &ExecuteRequest) -> Result<SyncResult, SyncError> {
    s.trace("sync requested", Some(json!({ "context": request.context })));
    match accept(request)? {
        SyncPayload::Legacy(payload) => sync_legacy(s, &payload).await.map(SyncResult::Legacy),
        SyncPayload::Ops(payload) => sync_ops(s, &payload).await.map(SyncResult::Ops),
    }
}

async fn run_preview<D: Dom, H: Host>(s: &SyncSession<'_, D, H>, request: &ExecuteRequest) -> Result<SyncPreview, SyncError> {
    match accept(request)? {
        SyncPayload::Legacy(payload) => preview_legacy(s, &payload).await.map(SyncPreview::Legacy),
        SyncPayload::Ops(payload) => Ok(SyncPreview::Ops(summarize_ops(&payload))),
    }
}
