//! Backend selection against a published ring snapshot.
//!
//! # Pick Algorithm
//! ```text
//! affinity hash
//!     → ring.pick(hash) → anchor entry
//!     → anchor Ready? return it
//!     → walk the ring clockwise, each backend once:
//!         first Ready backend wins
//!     → nothing Ready:
//!         request a connect on the first Idle backend (anchor first)
//!         that has not been asked yet in its Idle period
//!         → NoBackendAvailable (retry later)
//! ```
//!
//! # Design Decisions
//! - Pickers are immutable; the controller replaces them wholesale
//! - Backend state is read live, so an older picker never routes to a
//!   backend the transport has since reported down
//! - At most one new connection attempt per pick, in ring order

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::health::state::ConnectivityState;
use crate::load_balancer::backend::{Backend, ConnectTrigger};
use crate::load_balancer::ring::Ring;
use crate::observability::metrics;
use crate::resilience::backoff::BackoffConfig;

/// Non-terminal pick failures. Both mean "queue the call and pick again".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PickError {
    /// Every backend reachable from the anchor is not Ready.
    #[error("no backend available, retry after the next picker update")]
    NoBackendAvailable,

    /// No picker has been published yet.
    #[error("no picker published yet")]
    NoPicker,
}

/// Immutable pairing of a ring with the backends its entries refer to.
#[derive(Debug)]
pub struct Picker {
    ring: Arc<Ring>,
    backends: Arc<[Arc<Backend>]>,
    state: ConnectivityState,
    generation: u64,
}

impl Picker {
    /// `backends[i]` must be the backend of the ring's endpoint `i`.
    pub(crate) fn new(
        ring: Arc<Ring>,
        backends: Arc<[Arc<Backend>]>,
        state: ConnectivityState,
    ) -> Self {
        debug_assert_eq!(ring.endpoint_count(), backends.len());
        Self {
            ring,
            backends,
            state,
            generation: 0,
        }
    }

    /// Select a backend for a call carrying `hash`.
    pub fn pick(&self, hash: u64) -> Result<Arc<Backend>, PickError> {
        let anchor = self.ring.pick(hash);
        let anchor_endpoint = self.ring.entry(anchor).endpoint;
        let first = &self.backends[anchor_endpoint];
        if first.state().is_ready() {
            metrics::record_pick("ready");
            return Ok(first.clone());
        }

        let mut visited = vec![false; self.backends.len()];
        visited[anchor_endpoint] = true;
        let mut candidates = vec![anchor_endpoint];

        let len = self.ring.len();
        for step in 1..len {
            if candidates.len() == self.backends.len() {
                break;
            }
            let endpoint = self.ring.entry((anchor + step) % len).endpoint;
            if visited[endpoint] {
                continue;
            }
            visited[endpoint] = true;

            let backend = &self.backends[endpoint];
            if backend.state().is_ready() {
                tracing::trace!(
                    hash,
                    address = %backend.address(),
                    "Anchor not ready, picked next ready backend"
                );
                metrics::record_pick("ready");
                return Ok(backend.clone());
            }
            candidates.push(endpoint);
        }

        for endpoint in candidates {
            if self.backends[endpoint].request_connect(ConnectTrigger::Pick) {
                break;
            }
        }

        tracing::trace!(hash, "No ready backend, queueing pick");
        metrics::record_pick("queued");
        Err(PickError::NoBackendAvailable)
    }

    pub fn ring(&self) -> &Arc<Ring> {
        &self.ring
    }

    /// Backends in ring endpoint order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Aggregate policy state when this picker was published.
    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Publication sequence number, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// The call path's view of the latest picker.
///
/// Latest publication wins. Reads are lock-free.
#[derive(Debug, Default)]
pub struct PickerSlot {
    current: ArcSwapOption<Picker>,
    published: AtomicU64,
    notify: Notify,
}

impl PickerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest picker, if any.
    pub fn current(&self) -> Option<Arc<Picker>> {
        self.current.load_full()
    }

    /// Number of pickers published so far.
    pub fn generation(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    /// Replace the current picker and wake queued calls.
    pub(crate) fn publish(&self, mut picker: Picker) -> u64 {
        let generation = self.published.load(Ordering::Acquire) + 1;
        picker.generation = generation;
        self.current.store(Some(Arc::new(picker)));
        self.published.store(generation, Ordering::Release);
        self.notify.notify_waiters();
        generation
    }

    /// Drop the current picker; later picks fail with `NoPicker`.
    pub(crate) fn clear(&self) {
        self.current.store(None);
        self.notify.notify_waiters();
    }

    /// Pick once against the latest picker.
    pub fn pick(&self, hash: u64) -> Result<Arc<Backend>, PickError> {
        match &*self.current.load() {
            Some(picker) => picker.pick(hash),
            None => Err(PickError::NoPicker),
        }
    }

    /// Pick, re-picking on every new publication or after backoff, until `max_wait`.
    ///
    /// Returns the last pick error if no backend became available in time.
    pub async fn pick_or_wait(
        &self,
        hash: u64,
        max_wait: Duration,
        backoff: &BackoffConfig,
    ) -> Result<Arc<Backend>, PickError> {
        let deadline = Instant::now() + max_wait;
        let mut attempt = 0u32;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let err = match self.pick(hash) {
                Ok(backend) => return Ok(backend),
                Err(err) => err,
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(err);
            }
            attempt = attempt.saturating_add(1);
            let delay = backoff.delay(attempt).min(deadline - now);

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
