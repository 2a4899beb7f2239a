// crates/core/src/types/key.rs
//! Object key generation
//!
//! Remote ids are 8-character keys drawn from an alphabet that excludes
//! ambiguous characters (0/O, 1/I). Keys generated locally must survive
//! upload unchanged, so the alphabet matches what the service accepts.

use rand::Rng;

/// Generates stable object keys
pub struct KeyGenerator;

impl KeyGenerator {
    /// Length of a generated key
    pub const LENGTH: usize = 8;

    const ALPHABET: &'static [u8] = b"23456789ABCDEFGHIJKLMNPQRSTUVWXYZ";

    /// Generates a new random object key
    pub fn new_key() -> String {
        let mut rng = rand::thread_rng();
        (0..Self::LENGTH)
            .map(|_| {
                let idx = rng.gen_range(0..Self::ALPHABET.len());
                Self::ALPHABET[idx] as char
            })
            .collect()
    }

    /// Returns true if `key` could have been produced by this generator
    pub fn is_valid(key: &str) -> bool {
        key.len() == Self::LENGTH
            && key.bytes().all(|b| Self::ALPHABET.contains(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_length() {
        let key = KeyGenerator::new_key();
        assert_eq!(key.len(), KeyGenerator::LENGTH);
    }

    #[test]
    fn test_key_alphabet() {
        for _ in 0..100 {
            let key = KeyGenerator::new_key();
            assert!(KeyGenerator::is_valid(&key), "invalid key {key}");
        }
    }

    #[test]
    fn test_keys_are_unique() {
        let a = KeyGenerator::new_key();
        let b = KeyGenerator::new_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_validation_rejects_ambiguous_characters() {
        assert!(!KeyGenerator::is_valid("0OABCDEF"));
        assert!(!KeyGenerator::is_valid("SHORT"));
        assert!(KeyGenerator::is_valid("ABCD2345"));
    }
}
