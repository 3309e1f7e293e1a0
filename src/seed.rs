use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};

use crate::types::DateKey;

/// Separator between composite-key components. Dates and decimal offsets
/// never contain it, so the trailing model name cannot shift a boundary.
pub const KEY_DELIMITER: char = '|';

pub const DEFAULT_MODEL: &str = "default";

/// SHA-256 of `key`, first four digest bytes read big-endian.
pub fn seed(key: &str) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// `date|offset|model`, with an empty model replaced by `default`.
pub fn composite_key(date: DateKey, offset_hours: u32, model: &str) -> String {
    let model = if model.is_empty() { DEFAULT_MODEL } else { model };
    format!("{date}{KEY_DELIMITER}{offset_hours}{KEY_DELIMITER}{model}")
}

/// A generator local to one computation. Salt is added after hashing, so
/// the 32-bit seed and the salt never wrap into each other.
pub fn rng_for(key: &str, salt: u64) -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(u64::from(seed(key)) + salt)
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn known_digest_prefixes() {
        assert_eq!(seed(""), 3_820_012_610);
        assert_eq!(seed("abc"), 3_128_432_319);
        assert_eq!(seed("2024-01-05|0|rf"), 1_326_106_493);
    }

    #[test]
    fn equal_keys_equal_seeds() {
        let d = DateKey::parse("2024-01-05").unwrap();
        assert_eq!(seed(&composite_key(d, 0, "rf")), seed(&composite_key(d, 0, "rf")));
    }

    #[test]
    fn empty_model_means_default() {
        let d = DateKey::parse("2024-01-05").unwrap();
        assert_eq!(composite_key(d, 0, ""), "2024-01-05|0|default");
        assert_eq!(composite_key(d, 0, ""), composite_key(d, 0, DEFAULT_MODEL));
    }

    #[test]
    fn delimiter_keeps_components_apart() {
        let d = DateKey::parse("2024-01-05").unwrap();
        // "1" + "0-x" must not read the same as "10" + "-x".
        assert_ne!(composite_key(d, 1, "0-x"), composite_key(d, 10, "-x"));
        assert_ne!(composite_key(d, 0, "rf"), composite_key(d, 0, "0|rf"));
    }

    #[test]
    fn neighbouring_dates_decorrelate() {
        let d = DateKey::parse("2024-01-01").unwrap();
        let seeds: Vec<u32> = (0..64)
            .map(|i| seed(&composite_key(d.offset_days(i).unwrap(), 0, DEFAULT_MODEL)))
            .collect();
        let low_bits_set = seeds.iter().filter(|s| *s & 1 == 1).count();
        assert!((16..=48).contains(&low_bits_set), "low bit set {low_bits_set}/64");
    }

    #[test]
    fn rng_for_is_reproducible() {
        let a: f64 = rng_for("k", 5000).random();
        let b: f64 = rng_for("k", 5000).random();
        let c: f64 = rng_for("k", 1000).random();
        assert_eq!(a.to_bits(), b.to_bits());
        assert_ne!(a.to_bits(), c.to_bits());
    }
}
