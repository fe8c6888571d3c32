//! Debug trace of one sync attempt.
//!
//! Lines look like `[+123ms] clicked toggle | {"label":"2014 Core Rules"}`
//! and live in a bounded ring buffer; the oldest line is evicted once the
//! buffer is full. The run is owned by whoever drives the sync and is
//! snapshotted into the result (or the error response) at the end.

use std::collections::VecDeque;

use serde_json::Value;

use crate::limits::DEBUG_LOG_MAX_LINES;

#[derive(Debug, Clone)]
pub struct DebugRun {
    started_at: f64,
    capacity: usize,
    lines: VecDeque<String>,
}

impl DebugRun {
    /// Start a run at `now_ms` (any monotonic millisecond clock).
    pub fn start(now_ms: f64) -> Self {
        Self::with_capacity(now_ms, DEBUG_LOG_MAX_LINES)
    }

    pub fn with_capacity(now_ms: f64, capacity: usize) -> Self {
        Self {
            started_at: now_ms,
            capacity: capacity.max(1),
            lines: VecDeque::with_capacity(capacity.min(256)),
        }
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        (now_ms - self.started_at).max(0.0)
    }

    /// Append a line. `detail` is rendered as compact JSON after a `|`.
    pub fn log(&mut self, now_ms: f64, message: &str, detail: Option<&Value>) {
        let elapsed = self.elapsed_ms(now_ms).round() as u64;
        let line = match detail {
            Some(Value::Null) | None => format!("[+{elapsed}ms] {message}"),
            Some(detail) => format!("[+{elapsed}ms] {message} | {detail}"),
        };
        log::debug!("{line}");

        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}
