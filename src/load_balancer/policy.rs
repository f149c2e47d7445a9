//! Ring hash policy controller.
//!
//! # Responsibilities
//! - Diff resolver updates against the current backend set
//! - Create and tear down backends, rebuild the ring when the set changes
//! - Record transport state changes and recompute the aggregate state
//! - Re-kick Idle backends while the policy is in TransientFailure
//! - Publish a fresh picker after every change
//!
//! # Design Decisions
//! - Single owner: every method takes `&mut self`; callers serialize
//!   (see `events.rs` for the event loop that does so)
//! - Lazy connect: new backends stay Idle until a pick asks for them
//! - Ring input is sorted by endpoint key so resolver ordering does not
//!   change placement

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::config::loader::ConfigError;
use crate::config::schema::RingHashConfig;
use crate::config::validation::validate_update;
use crate::health::aggregate::aggregate_state;
use crate::health::state::ConnectivityState;
use crate::load_balancer::backend::{Backend, ConnectTrigger};
use crate::load_balancer::endpoint::{Endpoint, EndpointKey};
use crate::load_balancer::picker::{Picker, PickerSlot};
use crate::load_balancer::ring::Ring;
use crate::net::transport::{BackendId, Transport};
use crate::observability::metrics;

/// A resolver update paired with its ring size bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyUpdate {
    pub endpoints: Vec<Endpoint>,
    pub config: RingHashConfig,
}

impl PolicyUpdate {
    pub fn new(endpoints: Vec<Endpoint>, config: RingHashConfig) -> Self {
        Self { endpoints, config }
    }
}

/// What an accepted update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Same endpoints, weights and bounds: nothing rebuilt or published.
    Unchanged,
    /// A new ring was built and a new picker published.
    Rebuilt {
        added: usize,
        removed: usize,
        ring_size: usize,
    },
}

/// Collapse duplicate keys (first occurrence wins) and sort by key.
///
/// This is the exact endpoint order the controller builds its ring from.
pub fn ring_endpoints(endpoints: &[Endpoint]) -> Vec<Endpoint> {
    let mut unique: BTreeMap<EndpointKey, &Endpoint> = BTreeMap::new();
    for endpoint in endpoints {
        let key = endpoint.key();
        if unique.contains_key(&key) {
            tracing::warn!(endpoint = %key, "Duplicate endpoint in update, keeping first");
            continue;
        }
        unique.insert(key, endpoint);
    }
    unique.into_values().cloned().collect()
}

/// The policy controller. Owns every backend.
#[derive(Debug)]
pub struct RingHashPolicy {
    transport: Arc<dyn Transport>,
    slot: Arc<PickerSlot>,
    next_id: u64,
    backends: BTreeMap<EndpointKey, Arc<Backend>>,
    by_id: HashMap<BackendId, EndpointKey>,
    weights: BTreeMap<EndpointKey, u32>,
    config: Option<RingHashConfig>,
    ring: Option<Arc<Ring>>,
    ring_backends: Arc<[Arc<Backend>]>,
    aggregate: ConnectivityState,
}

impl RingHashPolicy {
    /// Create a policy publishing into a fresh picker slot.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_slot(transport, Arc::new(PickerSlot::new()))
    }

    /// Create a policy publishing into `slot`.
    pub fn with_slot(transport: Arc<dyn Transport>, slot: Arc<PickerSlot>) -> Self {
        Self {
            transport,
            slot,
            next_id: 1,
            backends: BTreeMap::new(),
            by_id: HashMap::new(),
            weights: BTreeMap::new(),
            config: None,
            ring: None,
            ring_backends: Arc::from(Vec::new()),
            aggregate: ConnectivityState::Idle,
        }
    }

    /// The slot the call path picks from.
    pub fn picker_slot(&self) -> Arc<PickerSlot> {
        self.slot.clone()
    }

    /// Current aggregate state.
    pub fn aggregate_state(&self) -> ConnectivityState {
        self.aggregate
    }

    /// Current ring, once an update has been accepted.
    pub fn ring(&self) -> Option<&Arc<Ring>> {
        self.ring.as_ref()
    }

    /// Backend for `key`, if present.
    pub fn backend(&self, key: &EndpointKey) -> Option<&Arc<Backend>> {
        self.backends.get(key)
    }

    /// Backend with `id`, if present.
    pub fn backend_by_id(&self, id: BackendId) -> Option<&Arc<Backend>> {
        self.by_id.get(&id).and_then(|key| self.backends.get(key))
    }

    /// All backends in key order.
    pub fn backends(&self) -> impl Iterator<Item = &Arc<Backend>> {
        self.backends.values()
    }

    /// Apply a resolver/config update.
    ///
    /// On error nothing changes and the previous picker stays published.
    pub fn update(&mut self, update: PolicyUpdate) -> Result<UpdateOutcome, ConfigError> {
        if let Err(errors) = validate_update(&update.endpoints, &update.config) {
            let err = ConfigError::Validation(errors);
            tracing::warn!(error = %err, "Rejected policy update");
            return Err(err);
        }

        let endpoints = ring_endpoints(&update.endpoints);
        let weights: BTreeMap<EndpointKey, u32> =
            endpoints.iter().map(|e| (e.key(), e.weight())).collect();

        if self.config == Some(update.config) && self.weights == weights {
            tracing::debug!(endpoints = weights.len(), "Update unchanged, keeping current ring");
            return Ok(UpdateOutcome::Unchanged);
        }

        // Build before touching any state so a failure leaves everything intact.
        let ring = Arc::new(Ring::build(&endpoints, &update.config)?);

        let stale: Vec<EndpointKey> = self
            .backends
            .keys()
            .filter(|key| !weights.contains_key(*key))
            .cloned()
            .collect();
        for key in &stale {
            if let Some(backend) = self.backends.remove(key) {
                self.by_id.remove(&backend.id());
                tracing::info!(backend_id = %backend.id(), endpoint = %key, "Removing backend");
                backend.shutdown();
            }
        }

        let mut added = 0;
        for endpoint in &endpoints {
            let key = endpoint.key();
            if self.backends.contains_key(&key) {
                continue;
            }
            let id = BackendId::new(self.next_id);
            self.next_id += 1;

            tracing::info!(
                backend_id = %id,
                endpoint = %key,
                weight = endpoint.weight(),
                "Adding backend"
            );
            self.transport.create(id, endpoint);
            let backend = Arc::new(Backend::new(id, key.clone(), self.transport.clone()));
            self.by_id.insert(id, key.clone());
            self.backends.insert(key, backend);
            added += 1;
        }

        // Every ring endpoint has a backend by now; order matches the ring's indices.
        let ring_backends: Vec<Arc<Backend>> = endpoints
            .iter()
            .filter_map(|endpoint| self.backends.get(&endpoint.key()).cloned())
            .collect();

        let ring_size = ring.len();
        tracing::info!(
            ring_size,
            backends = self.backends.len(),
            added,
            removed = stale.len(),
            min = update.config.min_ring_size,
            max = update.config.max_ring_size,
            "Ring rebuilt"
        );
        metrics::record_ring_rebuild(ring_size, self.backends.len());

        self.ring = Some(ring);
        self.ring_backends = ring_backends.into();
        self.weights = weights;
        self.config = Some(update.config);

        self.refresh_aggregate();
        self.publish();

        Ok(UpdateOutcome::Rebuilt {
            added,
            removed: stale.len(),
            ring_size,
        })
    }

    /// Record a connectivity change reported by the transport.
    ///
    /// Returns true if a new picker was published.
    pub fn on_state_change(&mut self, id: BackendId, state: ConnectivityState) -> bool {
        let Some(backend) = self.backend_by_id(id).cloned() else {
            tracing::debug!(
                backend_id = %id,
                state = %state,
                "State change for unknown backend, ignoring"
            );
            return false;
        };

        let before = self.aggregate;
        let Some(previous) = backend.record_state(state) else {
            tracing::trace!(backend_id = %id, state = %state, "Duplicate state report");
            return false;
        };

        tracing::debug!(
            backend_id = %id,
            address = %backend.address(),
            from = %previous,
            to = %state,
            "Backend connectivity changed"
        );

        if state == ConnectivityState::Idle
            && before == ConnectivityState::TransientFailure
            && backend.request_connect(ConnectTrigger::IdleKick)
        {
            tracing::info!(
                backend_id = %id,
                address = %backend.address(),
                "Policy in transient failure, reconnecting idle backend"
            );
        }

        self.refresh_aggregate();
        self.publish();
        true
    }

    /// Tear down every backend and withdraw the picker.
    pub fn close(&mut self) {
        for (key, backend) in std::mem::take(&mut self.backends) {
            tracing::debug!(backend_id = %backend.id(), endpoint = %key, "Closing backend");
            backend.shutdown();
        }
        self.by_id.clear();
        self.weights.clear();
        self.config = None;
        self.ring = None;
        self.ring_backends = Arc::from(Vec::new());
        self.aggregate = ConnectivityState::Idle;
        self.slot.clear();
        tracing::info!("Policy closed");
    }

    fn refresh_aggregate(&mut self) {
        let state = aggregate_state(self.backends.values().filter_map(|b| b.reported_state()));
        if state != self.aggregate {
            tracing::info!(from = %self.aggregate, to = %state, "Aggregate state changed");
            self.aggregate = state;
        }
        metrics::record_aggregate_state(state);
    }

    fn publish(&self) {
        if let Some(ring) = &self.ring {
            let picker = Picker::new(ring.clone(), self.ring_backends.clone(), self.aggregate);
            let generation = self.slot.publish(picker);
            tracing::trace!(generation, state = %self.aggregate, "Published picker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_endpoints_sorted_and_deduped() {
        let eps = vec![
            Endpoint::new("b:1").with_weight(2),
            Endpoint::new("a:1"),
            Endpoint::new("b:1").with_weight(9),
        ];
        let out = ring_endpoints(&eps);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].address(), "a:1");
        assert_eq!(out[1].address(), "b:1");
        assert_eq!(out[1].weight(), 2);
    }
}
