//! Stable 64-bit hashing (xxHash64, seed 0).
//!
//! Ring placement must produce the same values on every client and every
//! platform, so nothing here may depend on `std`'s randomized hashers.

use xxhash_rust::xxh64::xxh64;

const SEED: u64 = 0;

/// Hash of the `suffix`-th ring position for `address`.
pub fn ring_position_hash(address: &str, suffix: u64) -> u64 {
    xxh64(format!("{}_{}", address, suffix).as_bytes(), SEED)
}

/// Derive a call's affinity hash from a string routing key (e.g. a session id).
pub fn affinity_hash(key: &str) -> u64 {
    xxh64(key.as_bytes(), SEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // Reference value for xxHash64("", 0).
        assert_eq!(affinity_hash(""), 0xEF46_DB37_51D8_E999);
    }

    #[test]
    fn test_position_hash_is_key_hash() {
        assert_eq!(ring_position_hash("10.0.0.1:80", 3), affinity_hash("10.0.0.1:80_3"));
        assert_ne!(ring_position_hash("10.0.0.1:80", 3), ring_position_hash("10.0.0.1:80", 4));
    }
}
