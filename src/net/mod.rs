//! Transport boundary.
//!
//! # Data Flow
//! ```text
//! Policy → Transport::create / connect / shutdown
//!
//! Transport (async, its own retry/backoff)
//!     → ConnectivityEvent { id, state }
//!     → policy event loop
//! ```
//!
//! # Design Decisions
//! - The policy never dials sockets itself
//! - Every transport call is fire-and-forget
//! - simulated.rs gives the CLI and tests a transport without a network

pub mod simulated;
pub mod transport;

pub use simulated::{SimulatedTransport, SimulationTiming};
pub use transport::{BackendId, ConnectivityEvent, Transport};
