//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Pick returns retry-later:
//!     → backoff.rs (jittered delay)
//!     → wait for the next picker or the delay, whichever comes first
//!     → pick again until the caller's deadline
//! ```
//!
//! # Design Decisions
//! - Queued calls never fail on a single retry-later
//! - Jittered backoff keeps many queued calls from re-picking in lockstep
//! - Connection backoff is the transport's concern, not handled here

pub mod backoff;
