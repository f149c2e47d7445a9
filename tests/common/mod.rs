//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ringhash::load_balancer::{Endpoint, EndpointKey, Picker};
use ringhash::{BackendId, RingHashConfig, Transport};

/// Transport that records every call and never reports anything by itself.
///
/// Tests drive state changes explicitly through `RingHashPolicy::on_state_change`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    created: Mutex<Vec<(BackendId, String)>>,
    connects: Mutex<Vec<BackendId>>,
    shutdowns: Mutex<Vec<BackendId>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> Vec<(BackendId, String)> {
        self.created.lock().unwrap().clone()
    }

    pub fn connects(&self) -> Vec<BackendId> {
        self.connects.lock().unwrap().clone()
    }

    pub fn connect_count(&self, id: BackendId) -> usize {
        self.connects.lock().unwrap().iter().filter(|c| **c == id).count()
    }

    pub fn shutdowns(&self) -> Vec<BackendId> {
        self.shutdowns.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn create(&self, id: BackendId, endpoint: &Endpoint) {
        self.created
            .lock()
            .unwrap()
            .push((id, endpoint.address().to_string()));
    }

    fn connect(&self, id: BackendId) {
        self.connects.lock().unwrap().push(id);
    }

    fn shutdown(&self, id: BackendId) {
        self.shutdowns.lock().unwrap().push(id);
    }
}

/// Endpoints with weight 1 for each address.
pub fn endpoints(addresses: &[&str]) -> Vec<Endpoint> {
    addresses.iter().map(|a| Endpoint::new(*a)).collect()
}

/// Key of an attribute-less endpoint.
pub fn key(address: &str) -> EndpointKey {
    Endpoint::new(address).key()
}

/// Small ring bounds so tests stay fast.
pub fn small_ring() -> RingHashConfig {
    RingHashConfig::new(3, 64)
}

/// Distinct backend ids in ring order starting at the anchor for `hash`.
pub fn ring_order(picker: &Picker, hash: u64) -> Vec<BackendId> {
    let ring = picker.ring();
    let anchor = ring.pick(hash);
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for step in 0..ring.len() {
        let endpoint = ring.entry((anchor + step) % ring.len()).endpoint;
        let id = picker.backends()[endpoint].id();
        if seen.insert(id) {
            order.push(id);
        }
    }
    order
}
