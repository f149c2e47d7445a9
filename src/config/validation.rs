//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate ring size bounds (non-zero, ordered, capped)
//! - Validate endpoints (non-empty list, positive weights, non-empty addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: input → Result<(), Vec<ValidationError>>
//! - Runs before an update is accepted by the policy

use thiserror::Error;

use crate::config::schema::{PolicyConfig, RingHashConfig, RING_SIZE_UPPER_BOUND};
use crate::load_balancer::endpoint::Endpoint;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The update carried no endpoints.
    #[error("at least one endpoint is required")]
    NoEndpoints,

    /// A ring size bound was zero.
    #[error("{field} must be at least 1")]
    ZeroRingSize { field: &'static str },

    /// Minimum ring size exceeds the maximum.
    #[error("min_ring_size {min} exceeds max_ring_size {max}")]
    MinExceedsMax { min: u64, max: u64 },

    /// A ring size bound exceeds the hard cap.
    #[error("{field} {value} exceeds the limit of {limit}")]
    RingSizeTooLarge {
        field: &'static str,
        value: u64,
        limit: u64,
    },

    /// An endpoint had weight zero.
    #[error("endpoint {address} has zero weight")]
    ZeroWeight { address: String },

    /// An endpoint had an empty address.
    #[error("endpoint #{index} has an empty address")]
    EmptyAddress { index: usize },
}

/// Validate an endpoint list together with its ring size bounds.
pub fn validate_update(
    endpoints: &[Endpoint],
    config: &RingHashConfig,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_ring_config(config, &mut errors);
    check_endpoints(endpoints, &mut errors);
    finish(errors)
}

/// Validate a full file configuration.
pub fn validate_config(config: &PolicyConfig) -> Result<(), Vec<ValidationError>> {
    let update = config.to_update();
    validate_update(&update.endpoints, &update.config)
}

fn check_ring_config(config: &RingHashConfig, errors: &mut Vec<ValidationError>) {
    let bounds = [
        ("min_ring_size", config.min_ring_size),
        ("max_ring_size", config.max_ring_size),
    ];
    for (field, value) in bounds {
        if value == 0 {
            errors.push(ValidationError::ZeroRingSize { field });
        } else if value > RING_SIZE_UPPER_BOUND {
            errors.push(ValidationError::RingSizeTooLarge {
                field,
                value,
                limit: RING_SIZE_UPPER_BOUND,
            });
        }
    }

    if config.min_ring_size > config.max_ring_size {
        errors.push(ValidationError::MinExceedsMax {
            min: config.min_ring_size,
            max: config.max_ring_size,
        });
    }
}

fn check_endpoints(endpoints: &[Endpoint], errors: &mut Vec<ValidationError>) {
    if endpoints.is_empty() {
        errors.push(ValidationError::NoEndpoints);
        return;
    }

    for (index, endpoint) in endpoints.iter().enumerate() {
        if endpoint.address().is_empty() {
            errors.push(ValidationError::EmptyAddress { index });
        }
        if endpoint.weight() == 0 {
            errors.push(ValidationError::ZeroWeight {
                address: endpoint.address().to_string(),
            });
        }
    }
}

fn finish(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_update() {
        let endpoints = vec![Endpoint::new("a:1"), Endpoint::new("b:1").with_weight(4)];
        assert!(validate_update(&endpoints, &RingHashConfig::new(1, 10)).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let endpoints = vec![Endpoint::new("").with_weight(0)];
        let errors = validate_update(&endpoints, &RingHashConfig::new(0, 0)).unwrap_err();

        assert!(errors.contains(&ValidationError::ZeroRingSize { field: "min_ring_size" }));
        assert!(errors.contains(&ValidationError::ZeroRingSize { field: "max_ring_size" }));
        assert!(errors.contains(&ValidationError::EmptyAddress { index: 0 }));
        assert!(errors.contains(&ValidationError::ZeroWeight { address: String::new() }));
    }

    #[test]
    fn test_min_above_max() {
        let endpoints = vec![Endpoint::new("a:1")];
        let errors = validate_update(&endpoints, &RingHashConfig::new(20, 10)).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MinExceedsMax { min: 20, max: 10 }]);
    }

    #[test]
    fn test_upper_bound() {
        let endpoints = vec![Endpoint::new("a:1")];
        let config = RingHashConfig::new(1, RING_SIZE_UPPER_BOUND + 1);
        let errors = validate_update(&endpoints, &config).unwrap_err();
        assert!(matches!(
            errors[0],
            ValidationError::RingSizeTooLarge { field: "max_ring_size", .. }
        ));
    }

    #[test]
    fn test_no_endpoints() {
        let errors = validate_update(&[], &RingHashConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoEndpoints]);
    }
}
