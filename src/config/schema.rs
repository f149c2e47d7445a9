//! Configuration schema definitions.
//!
//! This module defines the file-level configuration for the ring hash policy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::load_balancer::endpoint::{Attributes, Endpoint};
use crate::load_balancer::policy::PolicyUpdate;

/// Default lower bound on the number of ring entries.
pub const DEFAULT_MIN_RING_SIZE: u64 = 1024;

/// Default upper bound on the number of ring entries.
pub const DEFAULT_MAX_RING_SIZE: u64 = 4096;

/// Hard cap on either ring size bound (8M entries).
pub const RING_SIZE_UPPER_BOUND: u64 = 8 * 1024 * 1024;

/// Root configuration for the policy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Ring size bounds.
    pub ring_hash: RingHashConfig,

    /// Weighted backend endpoints.
    pub endpoints: Vec<EndpointConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl PolicyConfig {
    /// Convert the file configuration into a controller update.
    pub fn to_update(&self) -> PolicyUpdate {
        PolicyUpdate {
            endpoints: self.endpoints.iter().map(EndpointConfig::to_endpoint).collect(),
            config: self.ring_hash,
        }
    }
}

/// Ring size bounds.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct RingHashConfig {
    /// Minimum number of ring entries.
    pub min_ring_size: u64,

    /// Maximum number of ring entries.
    pub max_ring_size: u64,
}

impl RingHashConfig {
    /// Create a config with explicit bounds.
    pub fn new(min_ring_size: u64, max_ring_size: u64) -> Self {
        Self {
            min_ring_size,
            max_ring_size,
        }
    }
}

impl Default for RingHashConfig {
    fn default() -> Self {
        Self {
            min_ring_size: DEFAULT_MIN_RING_SIZE,
            max_ring_size: DEFAULT_MAX_RING_SIZE,
        }
    }
}

/// A single backend endpoint as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Backend address (e.g., "10.0.0.1:443").
    pub address: String,

    /// Relative weight (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,

    /// Opaque attributes, compared for identity only.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl EndpointConfig {
    /// Build the runtime endpoint descriptor.
    pub fn to_endpoint(&self) -> Endpoint {
        Endpoint::new(self.address.clone())
            .with_weight(self.weight)
            .with_attributes(Attributes::from(self.attributes.clone()))
    }
}

fn default_weight() -> u32 {
    1
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
