//! Transport (connection manager) interface.
//!
//! # Responsibilities
//! - Create the connection object behind a backend
//! - Start a connection attempt on request (fire-and-forget)
//! - Tear connections down when a backend is removed
//! - Report connectivity changes back as [`ConnectivityEvent`]s
//!
//! # Design Decisions
//! - The policy never blocks on the transport; every call returns immediately
//! - `connect` must tolerate being called while already connecting
//! - Retry and backoff of a single connection are the transport's business

use std::fmt;

use crate::health::state::ConnectivityState;
use crate::load_balancer::endpoint::Endpoint;

/// Identifier the policy assigns to each backend it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(u64);

impl BackendId {
    /// Wrap a raw id.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend-{}", self.0)
    }
}

/// A connectivity change reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityEvent {
    pub id: BackendId,
    pub state: ConnectivityState,
}

/// The connection manager the policy drives.
pub trait Transport: Send + Sync + fmt::Debug {
    /// A backend was created for `endpoint`; it starts Idle and must not connect yet.
    fn create(&self, id: BackendId, endpoint: &Endpoint);

    /// Begin connecting. Idempotent: a second call while connecting is a no-op.
    fn connect(&self, id: BackendId);

    /// The backend was removed; release its connection.
    fn shutdown(&self, id: BackendId);
}
