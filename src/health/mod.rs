//! Connectivity health subsystem.
//!
//! # Data Flow
//! ```text
//! Transport reports a backend state change
//!     → state.rs (ConnectivityState recorded on the backend)
//!     → aggregate.rs (fold all reported states into one)
//!     → policy controller publishes the aggregate with a new picker
//! ```
//!
//! # Design Decisions
//! - Health is observed, not probed: the transport is the only source
//! - Aggregation is a pure function recomputed on every change
//! - State is per-backend; the aggregate is derived, never stored as truth

pub mod aggregate;
pub mod state;

pub use aggregate::aggregate_state;
pub use state::ConnectivityState;
