//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PolicyConfig (validated, immutable)
//!     → PolicyConfig::to_update() → policy controller
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → update sent to the policy event loop
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The same validation guards file loads and controller updates

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::ConfigError;
pub use schema::{EndpointConfig, ObservabilityConfig, PolicyConfig, RingHashConfig};
pub use validation::ValidationError;
