//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Ctrl+C / caller request
//!     → Shutdown::trigger
//!     → policy event loop exits, closes the policy
//!     → every backend torn down through the transport
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
