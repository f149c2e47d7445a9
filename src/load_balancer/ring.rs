//! Consistent hash ring.
//!
//! # Construction
//! ```text
//! endpoints (address, weight), min_ring_size, max_ring_size
//!     → ring size N: start at min, grow toward max until every endpoint
//!       gets at least one position
//!     → per-endpoint share: ceil(N·C_i/W) − ceil(N·C_{i−1}/W)
//!       (C = running weight sum, W = total weight; shares sum to N)
//!     → positions: xxh64("{address}_{suffix}") for suffix = 0, 1, 2, …
//!       skipping any hash already taken (lowest endpoint index wins)
//!     → sort ascending by hash
//! ```
//!
//! # Design Decisions
//! - Same endpoints in the same order always produce the same ring
//! - Entries refer to endpoints by index; the ring owns no backends
//! - Immutable once built; a change means a rebuild

use std::collections::HashSet;

use crate::config::loader::ConfigError;
use crate::config::schema::RingHashConfig;
use crate::config::validation::validate_update;
use crate::load_balancer::endpoint::Endpoint;
use crate::load_balancer::hash::ring_position_hash;

/// One ring position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingEntry {
    /// Position on the ring.
    pub hash: u64,
    /// Index of the endpoint in the list the ring was built from.
    pub endpoint: usize,
}

/// Sorted, immutable sequence of ring entries with distinct hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    entries: Vec<RingEntry>,
    endpoint_count: usize,
}

impl Ring {
    /// Build a ring from weighted endpoints.
    ///
    /// Fails if `endpoints` is empty, a weight is zero, or the size bounds are invalid.
    pub fn build(endpoints: &[Endpoint], config: &RingHashConfig) -> Result<Self, ConfigError> {
        validate_update(endpoints, config)?;

        let weights: Vec<u32> = endpoints.iter().map(Endpoint::weight).collect();
        let size = ring_size(&weights, config.min_ring_size, config.max_ring_size);
        let shares = allocate(&weights, size);

        let mut seen = HashSet::with_capacity(size as usize);
        let mut entries = Vec::with_capacity(size as usize);

        for (index, (endpoint, share)) in endpoints.iter().zip(shares).enumerate() {
            let mut suffix = 0u64;
            let mut taken = 0u64;
            while taken < share {
                let hash = ring_position_hash(endpoint.address(), suffix);
                suffix += 1;
                if seen.insert(hash) {
                    entries.push(RingEntry { hash, endpoint: index });
                    taken += 1;
                } else {
                    tracing::trace!(
                        address = %endpoint.address(),
                        suffix = suffix - 1,
                        "Ring hash collision, skipping"
                    );
                }
            }
        }

        entries.sort_unstable_by_key(|e| e.hash);
        debug_assert!(!entries.is_empty(), "ring empty after non-empty endpoint list");

        tracing::debug!(
            size = entries.len(),
            endpoints = endpoints.len(),
            min = config.min_ring_size,
            max = config.max_ring_size,
            "Ring built"
        );

        Ok(Self {
            entries,
            endpoint_count: endpoints.len(),
        })
    }

    /// Index of the first entry whose hash is `>= hash`, wrapping to 0.
    pub fn pick(&self, hash: u64) -> usize {
        let index = self.entries.partition_point(|e| e.hash < hash);
        if index == self.entries.len() {
            0
        } else {
            index
        }
    }

    /// The entry at `index`.
    pub fn entry(&self, index: usize) -> RingEntry {
        self.entries[index]
    }

    pub fn entries(&self) -> &[RingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of endpoints the ring was built from.
    pub fn endpoint_count(&self) -> usize {
        self.endpoint_count
    }

    /// Number of ring positions held by each endpoint.
    pub fn shares(&self) -> Vec<usize> {
        let mut shares = vec![0; self.endpoint_count];
        for entry in &self.entries {
            shares[entry.endpoint] += 1;
        }
        shares
    }
}

/// Smallest size in `[min, max]` giving every endpoint a position, capped at `max`.
fn ring_size(weights: &[u32], min: u64, max: u64) -> u64 {
    let total: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    let min_weight = weights.iter().copied().min().map_or(1, u128::from).max(1);
    let needed = total.div_ceil(min_weight);

    u128::from(min).max(needed).min(u128::from(max)) as u64
}

/// Split `size` positions proportionally to `weights`; the result sums to `size`.
fn allocate(weights: &[u32], size: u64) -> Vec<u64> {
    let total: u128 = weights.iter().map(|&w| u128::from(w)).sum();
    let size = u128::from(size);

    let mut cumulative = 0u128;
    let mut previous = 0u128;
    weights
        .iter()
        .map(|&w| {
            cumulative += u128::from(w);
            let target = (size * cumulative).div_ceil(total);
            let share = target - previous;
            previous = target;
            share as u64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::ValidationError;

    fn endpoints(weights: &[u32]) -> Vec<Endpoint> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| Endpoint::new(format!("{i}.{i}.{i}.{i}:{i}")).with_weight(w))
            .collect()
    }

    #[test]
    fn test_single_endpoint() {
        let ring = Ring::build(&endpoints(&[1]), &RingHashConfig::new(1, 10)).unwrap();
        assert!((1..=10).contains(&ring.len()));
        for hash in [0, 1, u64::MAX / 2, u64::MAX] {
            assert_eq!(ring.entry(ring.pick(hash)).endpoint, 0);
        }
    }

    #[test]
    fn test_shares_follow_weights() {
        let ring = Ring::build(&endpoints(&[1, 2, 3]), &RingHashConfig::new(6, 100)).unwrap();
        assert_eq!(ring.len(), 6);
        assert_eq!(ring.shares(), vec![1, 2, 3]);
    }

    #[test]
    fn test_grows_until_light_endpoint_fits() {
        let ring = Ring::build(&endpoints(&[1, 99]), &RingHashConfig::new(10, 1000)).unwrap();
        assert_eq!(ring.len(), 100);
        assert_eq!(ring.shares(), vec![1, 99]);
    }

    #[test]
    fn test_capped_at_max() {
        let eps = endpoints(&[1; 12]);
        let ring = Ring::build(&eps, &RingHashConfig::new(1, 10)).unwrap();
        assert_eq!(ring.len(), 10);
        assert_eq!(ring.endpoint_count(), 12);
    }

    #[test]
    fn test_min_size_respected() {
        let ring = Ring::build(&endpoints(&[1, 1, 1]), &RingHashConfig::new(20, 100)).unwrap();
        assert!(ring.len() >= 20 && ring.len() <= 100);
        assert!(ring.shares().iter().all(|&s| s >= 6));
    }

    #[test]
    fn test_strictly_ascending() {
        let ring = Ring::build(&endpoints(&[3, 1, 2]), &RingHashConfig::new(64, 256)).unwrap();
        assert!(ring.entries().windows(2).all(|w| w[0].hash < w[1].hash));
    }

    #[test]
    fn test_deterministic() {
        let eps = endpoints(&[1, 2, 3]);
        let config = RingHashConfig::new(32, 128);
        assert_eq!(Ring::build(&eps, &config).unwrap(), Ring::build(&eps, &config).unwrap());
    }

    #[test]
    fn test_same_address_twice_still_distinct() {
        let eps = vec![Endpoint::new("10.0.0.1:80"), Endpoint::new("10.0.0.1:80")];
        let ring = Ring::build(&eps, &RingHashConfig::new(8, 8)).unwrap();
        assert_eq!(ring.len(), 8);
        assert_eq!(ring.shares(), vec![4, 4]);
        assert!(ring.entries().windows(2).all(|w| w[0].hash < w[1].hash));
    }

    #[test]
    fn test_pick_boundaries() {
        let ring = Ring::build(&endpoints(&[1, 1, 1]), &RingHashConfig::new(3, 3)).unwrap();
        let first = ring.entry(0).hash;
        let last = ring.entry(ring.len() - 1).hash;

        assert_eq!(ring.pick(first), 0);
        assert_eq!(ring.pick(first + 1), 1);
        assert_eq!(ring.pick(ring.entry(1).hash), 1);
        if last < u64::MAX {
            assert_eq!(ring.pick(last + 1), 0, "wraps past the last entry");
        }
    }

    #[test]
    fn test_pick_is_stable() {
        let ring = Ring::build(&endpoints(&[1, 2]), &RingHashConfig::new(16, 64)).unwrap();
        let hash = 0x1234_5678_9abc_def0;
        let anchor = ring.pick(hash);
        for _ in 0..10 {
            assert_eq!(ring.pick(hash), anchor);
        }
    }

    #[test]
    fn test_rejects_empty_endpoints() {
        let err = Ring::build(&[], &RingHashConfig::new(1, 10)).unwrap_err();
        assert_eq!(err.validation_errors(), &[ValidationError::NoEndpoints]);
    }

    #[test]
    fn test_rejects_min_above_max() {
        let err = Ring::build(&endpoints(&[1]), &RingHashConfig::new(11, 10)).unwrap_err();
        assert_eq!(
            err.validation_errors(),
            &[ValidationError::MinExceedsMax { min: 11, max: 10 }]
        );
    }

    #[test]
    fn test_allocate_sums_to_size() {
        for size in [1u64, 7, 10, 1024] {
            let shares = allocate(&[3, 5, 7, 11], size);
            assert_eq!(shares.iter().sum::<u64>(), size);
        }
    }
}
