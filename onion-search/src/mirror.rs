//! Mirror rotation with per-address failure cooldown.
//!
//! A source with several known addresses tries them in preference order.
//! An address that fails is skipped until its cooldown expires, so one dead
//! mirror cannot block a source that still has working alternates.
//!
//! ```text
//! ┌──────────┐  fetch fails   ┌─────────────┐  cooldown elapsed  ┌──────────┐
//! │ Eligible ├───────────────►│ Cooling down├───────────────────►│ Eligible │
//! └───▲──────┘                └─────────────┘                    └──────────┘
//!     │  fetch succeeds (failure cleared)
//!     └──────────────────────────────────
//! ```
//!
//! State lives in the selector instance, which is owned by exactly one
//! source adapter; nothing is shared across sources.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::error::{Result, SearchError};

/// Failure tracking for a single mirror address.
#[derive(Debug, Clone)]
pub struct MirrorState {
    /// Base address of the mirror.
    pub address: Url,
    /// When the last failure occurred, cleared on success.
    pub last_failure_at: Option<Instant>,
}

impl MirrorState {
    fn new(address: Url) -> Self {
        Self {
            address,
            last_failure_at: None,
        }
    }

    fn is_eligible(&self, cooldown: Duration, now: Instant) -> bool {
        self.last_failure_at
            .is_none_or(|failed_at| now.duration_since(failed_at) >= cooldown)
    }
}

/// Picks the first eligible mirror for a source and records outcomes.
#[derive(Debug)]
pub struct MirrorSelector {
    cooldown: Duration,
    mirrors: Mutex<Vec<MirrorState>>,
}

impl MirrorSelector {
    /// Create a selector over `addresses`, in preference order.
    pub fn new(addresses: Vec<Url>, cooldown: Duration) -> Self {
        Self {
            cooldown,
            mirrors: Mutex::new(addresses.into_iter().map(MirrorState::new).collect()),
        }
    }

    /// Number of known addresses.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no addresses are known.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The preferred address, regardless of cooldown.
    pub fn primary(&self) -> Option<Url> {
        self.lock().first().map(|m| m.address.clone())
    }

    /// Try eligible mirrors in order until `fetch` succeeds.
    ///
    /// - Addresses inside their cooldown window are skipped.
    /// - A failure marks the address and moves on to the next one.
    /// - A success clears the address's failure state.
    /// - A [`SearchError::ProxyUnavailable`] is returned immediately without
    ///   marking the mirror, since the proxy rather than the mirror is down.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NoMirrorAvailable`] if every address is cooling
    /// down or failed.
    pub async fn pick_and_fetch<T, F, Fut>(&self, mut fetch: F) -> Result<T>
    where
        F: FnMut(Url) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let snapshot: Vec<Url> = self.lock().iter().map(|m| m.address.clone()).collect();
        let mut failures = Vec::new();
        let mut skipped = 0usize;

        for address in snapshot {
            if !self.is_eligible(&address) {
                tracing::debug!(mirror = %address, "skipping mirror in cooldown");
                skipped += 1;
                continue;
            }

            match fetch(address.clone()).await {
                Ok(value) => {
                    self.record_success(&address);
                    return Ok(value);
                }
                Err(err) if err.is_proxy_unavailable() => return Err(err),
                Err(err) => {
                    tracing::warn!(mirror = %address, error = %err, "mirror failed");
                    self.record_failure(&address);
                    failures.push(format!("{address}: {err}"));
                }
            }
        }

        let detail = if failures.is_empty() {
            format!("{skipped} mirror(s) in cooldown")
        } else {
            format!(
                "{skipped} mirror(s) in cooldown; {}",
                failures.join("; ")
            )
        };
        Err(SearchError::NoMirrorAvailable(detail))
    }

    /// Mark `address` as failed now.
    pub fn record_failure(&self, address: &Url) {
        if let Some(mirror) = self.lock().iter_mut().find(|m| &m.address == address) {
            mirror.last_failure_at = Some(Instant::now());
        }
    }

    /// Clear the failure state of `address`.
    pub fn record_success(&self, address: &Url) {
        if let Some(mirror) = self.lock().iter_mut().find(|m| &m.address == address) {
            mirror.last_failure_at = None;
        }
    }

    /// Returns `true` if `address` is known and outside its cooldown.
    pub fn is_eligible(&self, address: &Url) -> bool {
        let now = Instant::now();
        self.lock()
            .iter()
            .find(|m| &m.address == address)
            .is_some_and(|m| m.is_eligible(self.cooldown, now))
    }

    /// Each address with its current eligibility, in preference order.
    pub fn status(&self) -> Vec<(Url, bool)> {
        let now = Instant::now();
        self.lock()
            .iter()
            .map(|m| (m.address.clone(), m.is_eligible(self.cooldown, now)))
            .collect()
    }

    /// Forget all recorded failures.
    pub fn reset(&self) {
        for mirror in self.lock().iter_mut() {
            mirror.last_failure_at = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<MirrorState>> {
        self.mirrors.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
