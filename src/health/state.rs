//! Backend connectivity state.
//!
//! # States
//! - Idle: no connection, none in progress
//! - Connecting: a connection attempt is in flight
//! - Ready: connected, usable for picks
//! - TransientFailure: last attempt failed; the transport backs off and
//!   eventually reports Idle or Connecting again
//!
//! # State Transitions
//! ```text
//! Idle → Connecting → Ready
//!          ↓            ↓
//!   TransientFailure → Idle
//! ```
//!
//! # Design Decisions
//! - Transitions are driven by the transport, never inferred here
//! - Rank order is fixed: Ready > Connecting > Idle > TransientFailure

use std::fmt;

/// Connectivity state of one backend, or of the whole policy.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectivityState {
    #[default]
    Idle = 0,
    Connecting = 1,
    Ready = 2,
    TransientFailure = 3,
}

impl ConnectivityState {
    /// Position in the aggregation ranking; higher is better.
    pub fn rank(self) -> u8 {
        match self {
            ConnectivityState::TransientFailure => 0,
            ConnectivityState::Idle => 1,
            ConnectivityState::Connecting => 2,
            ConnectivityState::Ready => 3,
        }
    }

    /// Returns true if picks may use a backend in this state.
    pub fn is_ready(self) -> bool {
        self == ConnectivityState::Ready
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectivityState::Idle => "IDLE",
            ConnectivityState::Connecting => "CONNECTING",
            ConnectivityState::Ready => "READY",
            ConnectivityState::TransientFailure => "TRANSIENT_FAILURE",
        };
        f.write_str(name)
    }
}
