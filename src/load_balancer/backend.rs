//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend connection
//! - Track the last connectivity state reported by the transport
//! - Gate connection attempts to one per Idle period
//! - Stay inert once removed, even if an older picker still holds it

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::health::state::ConnectivityState;
use crate::load_balancer::endpoint::EndpointKey;
use crate::net::transport::{BackendId, Transport};
use crate::observability::metrics;

/// What caused a connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectTrigger {
    /// A pick found no Ready backend.
    Pick,
    /// The backend went Idle while the policy was in TransientFailure.
    IdleKick,
}

impl ConnectTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectTrigger::Pick => "pick",
            ConnectTrigger::IdleKick => "idle_kick",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Status {
    state: ConnectivityState,
    /// Set once the transport has reported any state.
    reported: bool,
    /// Set when a connect was requested in the current Idle period.
    connect_requested: bool,
    /// Set once the policy has removed the backend; it never leaves Idle again.
    removed: bool,
}

/// A single backend connection.
///
/// Shared by every ring entry for the same endpoint and by successive
/// pickers. Only the policy controller records state changes.
#[derive(Debug)]
pub struct Backend {
    id: BackendId,
    key: EndpointKey,
    transport: Arc<dyn Transport>,
    status: Mutex<Status>,
}

impl Backend {
    /// Create a new backend in Idle.
    pub(crate) fn new(id: BackendId, key: EndpointKey, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            key,
            transport,
            status: Mutex::new(Status::default()),
        }
    }

    pub fn id(&self) -> BackendId {
        self.id
    }

    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    pub fn address(&self) -> &str {
        &self.key.address
    }

    /// Current connectivity state. A removed backend is always Idle.
    pub fn state(&self) -> ConnectivityState {
        self.lock().state
    }

    /// State as last reported by the transport, or `None` if it never reported.
    pub fn reported_state(&self) -> Option<ConnectivityState> {
        let status = self.lock();
        status.reported.then_some(status.state)
    }

    /// Returns true if a connect was already requested in the current Idle period.
    pub fn connect_requested(&self) -> bool {
        self.lock().connect_requested
    }

    /// Record a transport-reported state.
    ///
    /// Returns the previous state, or `None` when the report changes nothing.
    /// Leaving Idle clears the connect-requested flag.
    pub(crate) fn record_state(&self, state: ConnectivityState) -> Option<ConnectivityState> {
        let mut status = self.lock();
        if status.removed || (status.reported && status.state == state) {
            return None;
        }

        let previous = status.state;
        if state != ConnectivityState::Idle {
            status.connect_requested = false;
        }
        status.state = state;
        status.reported = true;
        Some(previous)
    }

    /// Ask the transport to connect, at most once per Idle period.
    ///
    /// Returns true if this call issued the request. Safe to race from
    /// concurrent pickers; exactly one of them wins. A removed backend
    /// never connects.
    ///
    /// The transport call is made under the status lock so it cannot be
    /// reordered after a concurrent `shutdown`; transport calls return
    /// immediately.
    pub fn request_connect(&self, trigger: ConnectTrigger) -> bool {
        let mut status = self.lock();
        if status.removed || status.state != ConnectivityState::Idle || status.connect_requested {
            return false;
        }
        status.connect_requested = true;

        tracing::debug!(
            backend_id = %self.id,
            address = %self.key.address,
            trigger = trigger.as_str(),
            "Requesting connection"
        );
        metrics::record_connect_request(trigger.as_str());
        self.transport.connect(self.id);
        true
    }

    /// Mark the backend removed and tear down the underlying connection.
    ///
    /// Pickers published before the removal may still hold the handle; from
    /// here on it reads as Idle and refuses connect requests.
    pub(crate) fn shutdown(&self) {
        let mut status = self.lock();
        if status.removed {
            return;
        }
        status.removed = true;
        status.state = ConnectivityState::Idle;
        status.connect_requested = false;
        self.transport.shutdown(self.id);
    }

    fn lock(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
