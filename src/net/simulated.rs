//! In-process simulated transport.
//!
//! Stands in for a real connection manager: each `connect` plays out
//! Connecting → Ready, or Connecting → TransientFailure → (backoff) → Idle
//! for addresses marked down, and reports every step to the policy event loop.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::health::state::ConnectivityState;
use crate::load_balancer::endpoint::Endpoint;
use crate::load_balancer::events::PolicySender;
use crate::net::transport::{BackendId, Transport};

/// Timing of simulated connection attempts.
#[derive(Debug, Clone, Copy)]
pub struct SimulationTiming {
    /// Time from Connecting to Ready/TransientFailure.
    pub connect_delay: Duration,
    /// Time spent in TransientFailure before returning to Idle.
    pub failure_backoff: Duration,
}

impl Default for SimulationTiming {
    fn default() -> Self {
        Self {
            connect_delay: Duration::from_millis(50),
            failure_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    addresses: HashMap<BackendId, String>,
    connecting: HashSet<BackendId>,
    down: HashSet<String>,
}

/// Transport whose backends connect instantly-ish, or fail if marked down.
#[derive(Debug)]
pub struct SimulatedTransport {
    events: PolicySender,
    timing: SimulationTiming,
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedTransport {
    pub fn new(events: PolicySender, timing: SimulationTiming) -> Self {
        Self {
            events,
            timing,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Mark an address down (connects fail) or back up.
    pub fn set_down(&self, address: &str, down: bool) {
        let mut inner = self.lock();
        if down {
            inner.down.insert(address.to_string());
        } else {
            inner.down.remove(address);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SimulatedTransport {
    fn create(&self, id: BackendId, endpoint: &Endpoint) {
        self.lock()
            .addresses
            .insert(id, endpoint.address().to_string());
    }

    fn connect(&self, id: BackendId) {
        let fails = {
            let mut inner = self.lock();
            let Some(address) = inner.addresses.get(&id) else {
                tracing::debug!(backend_id = %id, "Connect for unknown backend, ignoring");
                return;
            };
            let fails = inner.down.contains(address);
            if !inner.connecting.insert(id) {
                return;
            }
            fails
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(backend_id = %id, "No Tokio runtime, cannot simulate connect");
            self.lock().connecting.remove(&id);
            return;
        };

        let events = self.events.clone();
        let timing = self.timing;
        let inner = self.inner.clone();
        runtime.spawn(async move {
            events.report(id, ConnectivityState::Connecting);
            tokio::time::sleep(timing.connect_delay).await;
            let last = if fails {
                events.report(id, ConnectivityState::TransientFailure);
                tokio::time::sleep(timing.failure_backoff).await;
                ConnectivityState::Idle
            } else {
                ConnectivityState::Ready
            };
            // Released before the last report; the policy may redial on seeing Idle.
            inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .connecting
                .remove(&id);
            events.report(id, last);
        });
    }

    fn shutdown(&self, id: BackendId) {
        let mut inner = self.lock();
        inner.addresses.remove(&id);
        inner.connecting.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::events::{policy_channel, PolicyEvent};
    use crate::net::transport::ConnectivityEvent;
    use tokio::sync::mpsc;

    async fn next_state(events: &mut mpsc::UnboundedReceiver<PolicyEvent>) -> ConnectivityState {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no state reported in time");
        match event {
            Some(PolicyEvent::StateChanged(ConnectivityEvent { state, .. })) => state,
            other => panic!("unexpected event {:?}", other),
        }
    }

    fn timing() -> SimulationTiming {
        SimulationTiming {
            connect_delay: Duration::from_millis(1),
            failure_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_healthy_address_becomes_ready() {
        let (sender, mut events) = policy_channel();
        let transport = SimulatedTransport::new(sender, timing());
        let id = BackendId::new(1);
        transport.create(id, &Endpoint::new("10.0.0.1:80"));

        transport.connect(id);
        assert_eq!(next_state(&mut events).await, ConnectivityState::Connecting);
        assert_eq!(next_state(&mut events).await, ConnectivityState::Ready);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_redial_accepted_as_soon_as_idle_is_reported() {
        let (sender, mut events) = policy_channel();
        let transport = SimulatedTransport::new(sender, timing());
        let id = BackendId::new(1);
        transport.create(id, &Endpoint::new("10.0.0.1:80"));
        transport.set_down("10.0.0.1:80", true);

        for _ in 0..20 {
            transport.connect(id);
            assert_eq!(next_state(&mut events).await, ConnectivityState::Connecting);
            assert_eq!(next_state(&mut events).await, ConnectivityState::TransientFailure);
            assert_eq!(next_state(&mut events).await, ConnectivityState::Idle);
        }
    }

    #[tokio::test]
    async fn test_connect_after_shutdown_is_ignored() {
        let (sender, mut events) = policy_channel();
        let transport = SimulatedTransport::new(sender, timing());
        let id = BackendId::new(1);
        transport.create(id, &Endpoint::new("10.0.0.1:80"));
        transport.shutdown(id);

        transport.connect(id);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(events.try_recv().is_err());
    }
}
