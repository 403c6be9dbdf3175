use serde::Serialize;
use sha3::{Digest, Keccak256};

use ardan_common::codec;

/// The hash value every chain comparison starts from: `0x` followed by
/// 64 zero hex digits. Used as the genesis block hash and as the sentinel
/// state root handed to the miner.
pub const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Raw keccak-256 over a byte slice.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Hash a byte slice into the 66-character string form used everywhere a
/// hash is stored or compared.
pub fn hash(data: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(data)))
}

/// Hash a value by first encoding it into canonical JSON.
pub fn hash_struct<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let data = codec::to_canonical_json(value)?;
    Ok(hash(&data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[test]
    fn test_hash_form() {
        let h = hash(b"hello");
        assert_eq!(h.len(), 66);
        assert!(h.starts_with("0x"));
        assert!(h[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_zero_hash_form() {
        assert_eq!(ZERO_HASH.len(), 66);
        assert!(ZERO_HASH[2..].chars().all(|c| c == '0'));
    }

    #[test]
    fn test_keccak_known_vector() {
        // keccak256 of the empty input.
        assert_eq!(
            hash(&[]),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hash_struct_is_deterministic() {
        #[derive(Serialize)]
        struct Person {
            name: String,
            age: u32,
        }

        let a = Person {
            name: "bill".to_string(),
            age: 45,
        };
        let b = Person {
            name: "bill".to_string(),
            age: 45,
        };

        assert_eq!(hash_struct(&a).unwrap(), hash_struct(&b).unwrap());
    }
}
