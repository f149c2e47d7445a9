//! Ring hash load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Resolver update (endpoints + ring bounds)
//!     → policy.rs (diff, create/remove backends)
//!     → ring.rs (rebuild consistent hash ring)
//!     → picker.rs (publish new Picker into the PickerSlot)
//!
//! Call with affinity hash
//!     → PickerSlot → Picker::pick
//!     → backend.rs (Ready backend, or connect request + retry later)
//!
//! Transport state change
//!     → events.rs (serialized) → policy.rs
//!     → health::aggregate → new Picker
//! ```
//!
//! # Design Decisions
//! - Ring and pickers are immutable; changes publish replacements
//! - Backends are shared by index, never copied, so state is seen everywhere
//! - All mutation goes through one owner; picks only read

pub mod backend;
pub mod endpoint;
pub mod events;
pub mod hash;
pub mod picker;
pub mod policy;
pub mod ring;

pub use backend::Backend;
pub use endpoint::{Attributes, Endpoint, EndpointKey};
pub use events::{policy_channel, run_policy, PolicyError, PolicyEvent, PolicySender};
pub use picker::{PickError, Picker, PickerSlot};
pub use policy::{PolicyUpdate, RingHashPolicy, UpdateOutcome};
pub use ring::{Ring, RingEntry};
