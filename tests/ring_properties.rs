//! Property tests for ring construction.

use proptest::prelude::*;

use ringhash::load_balancer::Endpoint;
use ringhash::{Ring, RingHashConfig};

fn arb_endpoints() -> impl Strategy<Value = Vec<Endpoint>> {
    prop::collection::vec(1u32..50, 1..12).prop_map(|weights| {
        weights
            .into_iter()
            .enumerate()
            .map(|(i, w)| Endpoint::new(format!("192.168.0.{}:8080", i)).with_weight(w))
            .collect()
    })
}

fn arb_bounds() -> impl Strategy<Value = RingHashConfig> {
    (1u64..200, 0u64..800).prop_map(|(min, extra)| RingHashConfig::new(min, min + extra))
}

proptest! {
    #[test]
    fn ring_is_sorted_distinct_and_bounded(eps in arb_endpoints(), bounds in arb_bounds()) {
        let ring = Ring::build(&eps, &bounds).unwrap();
        prop_assert!(!ring.is_empty());
        prop_assert!(ring.len() as u64 >= bounds.min_ring_size);
        prop_assert!(ring.len() as u64 <= bounds.max_ring_size);
        prop_assert!(ring.entries().windows(2).all(|w| w[0].hash < w[1].hash));
        prop_assert!(ring.entries().iter().all(|e| e.endpoint < eps.len()));
    }

    #[test]
    fn ring_is_deterministic(eps in arb_endpoints(), bounds in arb_bounds()) {
        let a = Ring::build(&eps, &bounds).unwrap();
        let b = Ring::build(&eps, &bounds).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn every_endpoint_placed_when_ring_is_large_enough(eps in arb_endpoints()) {
        let total: u64 = eps.iter().map(|e| u64::from(e.weight())).sum();
        let ring = Ring::build(&eps, &RingHashConfig::new(1, total * 50)).unwrap();
        let shares = ring.shares();
        prop_assert_eq!(shares.iter().sum::<usize>(), ring.len());
        prop_assert!(shares.iter().all(|&s| s >= 1));
    }

    #[test]
    fn pick_lands_on_first_entry_at_or_after_hash(eps in arb_endpoints(), hash in any::<u64>()) {
        let ring = Ring::build(&eps, &RingHashConfig::new(16, 256)).unwrap();
        let index = ring.pick(hash);
        let entry = ring.entry(index);
        if entry.hash >= hash {
            prop_assert!(index == 0 || ring.entry(index - 1).hash < hash);
        } else {
            // Wrapped around: every entry is below the hash.
            prop_assert_eq!(index, 0);
            prop_assert!(ring.entries().last().unwrap().hash < hash);
        }
    }
}
