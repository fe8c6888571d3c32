//! Everything the engine needs from its runtime besides the page.

use std::future::Future;

pub trait Host {
    /// Milliseconds on a monotonic clock.
    fn now_ms(&self) -> f64;

    /// Uniform sample in `[0, 1)`.
    fn random(&self) -> f64;

    /// Yield to the page for `ms` milliseconds.
    fn sleep(&self, ms: u64) -> impl Future<Output = ()>;

    /// Best-effort `SYNC_PROGRESS` notification; delivery failures are swallowed.
    fn progress(&self, label: &str);
}

/// Inclusive uniform pick in `[min, max]`.
pub fn jitter<H: Host>(host: &H, min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    let span = (max - min + 1) as f64;
    let offset = (host.random().clamp(0.0, 1.0) * span).floor() as u64;
    min + offset.min(max - min)
}
