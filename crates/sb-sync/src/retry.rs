//! Bounded retries for anything that may race the page's render loop.

use std::fmt::Display;
use std::future::Future;

use crate::host::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    /// Same wait after every failed attempt.
    Fixed(u64),
    /// `step * attempt` after the n-th failed attempt.
    Linear(u64),
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> u64 {
        match *self {
            Backoff::None => 0,
            Backoff::Fixed(ms) => ms,
            Backoff::Linear(step) => step.saturating_mul(u64::from(attempt)),
        }
    }
}

/// Run `factory(attempt)` until it succeeds or `attempts` are used up,
/// sleeping per `backoff` in between. Attempts are numbered from 1 and at
/// least one is always made. The last error is returned.
pub async fn with_retries<H, T, E, F, Fut>(
    host: &H,
    label: &str,
    attempts: u32,
    backoff: Backoff,
    mut factory: F,
) -> Result<T, E>
where
    H: Host,
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match factory(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                log::debug!("{label}: giving up after {attempt} attempts: {err}");
                return Err(err);
            }
            Err(err) => {
                log::debug!("{label}: attempt {attempt}/{attempts} failed: {err}");
                let delay = backoff.delay(attempt);
                if delay > 0 {
                    host.sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
