//! Key-to-partition routing.
//!
//! All events of one aggregate are routed to the same partition, which is
//! what gives them a total order: the log itself only orders records within
//! a partition.

use sha2::{Digest, Sha256};

/// Returns the partition `key` is routed to among `partition_count` partitions.
///
/// The first four bytes of the key's SHA-256 digest, read big-endian, modulo
/// the partition count. Stable across processes and releases.
#[must_use]
pub fn partition_for_key(key: &str, partition_count: u32) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    let hash = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    hash % partition_count.max(1)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_same_key_always_maps_to_same_partition() {
        let key = Uuid::new_v4().to_string();

        let first = partition_for_key(&key, 12);
        let second = partition_for_key(&key, 12);

        assert_eq!(first, second);
        assert!(first < 12);
    }

    #[test]
    fn test_known_key_has_stable_partition() {
        // SHA-256("account") starts with 9a f2 11 32.
        let expected = u32::from_be_bytes([0x9a, 0xf2, 0x11, 0x32]) % 7;

        assert_eq!(partition_for_key("account", 7), expected);
    }

    #[test]
    fn test_keys_spread_over_all_partitions() {
        let partitions: HashSet<u32> = (0..200)
            .map(|_| partition_for_key(&Uuid::new_v4().to_string(), 4))
            .collect();

        assert_eq!(partitions.len(), 4);
    }

    #[test]
    fn test_single_partition_and_zero_count_route_to_zero() {
        assert_eq!(partition_for_key("anything", 1), 0);
        assert_eq!(partition_for_key("anything", 0), 0);
    }
}
