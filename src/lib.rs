//! Client-side ring hash load balancing.
//!
//! Calls carrying the same 64-bit affinity hash land on the same backend
//! while it is healthy; when it is not, the call fails over clockwise around
//! a weighted consistent hash ring. Backends connect lazily, one at a time,
//! in ring order.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod resilience;

pub use config::{ConfigError, PolicyConfig, RingHashConfig};
pub use health::ConnectivityState;
pub use lifecycle::Shutdown;
pub use load_balancer::{
    Endpoint, PickError, Picker, PickerSlot, PolicyUpdate, Ring, RingHashPolicy, UpdateOutcome,
};
pub use net::{BackendId, Transport};
