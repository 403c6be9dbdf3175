//! Canonical encoding helpers. Every digest in the system is computed over
//! this encoding, so it must stay byte-stable: struct fields serialize in
//! declaration order with no whitespace, and byte values serialize as
//! `0x`-prefixed lowercase hex.

use serde::Serialize;

/// Encode a value into its canonical JSON byte form.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Serde helpers for variable-length byte fields.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for fixed 32-byte fields (signature components).
pub mod hex_array {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let decoded = hex::decode(s).map_err(serde::de::Error::custom)?;
        if decoded.len() != 32 {
            return Err(serde::de::Error::custom("invalid length for 32 byte value"));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&decoded);
        Ok(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        name: String,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
        #[serde(with = "hex_array")]
        digest: [u8; 32],
    }

    #[test]
    fn test_canonical_json_is_compact_and_ordered() {
        let v = Sample {
            name: "bill".to_string(),
            data: vec![0xde, 0xad],
            digest: [7u8; 32],
        };

        let json = String::from_utf8(to_canonical_json(&v).unwrap()).unwrap();
        assert!(json.starts_with("{\"name\":\"bill\",\"data\":\"0xdead\""));
        assert!(!json.contains(' '));
    }

    #[test]
    fn test_canonical_json_round_trip_idempotent() {
        let v = Sample {
            name: "bill".to_string(),
            data: vec![1, 2, 3],
            digest: [0u8; 32],
        };

        let first = to_canonical_json(&v).unwrap();
        let parsed: Sample = serde_json::from_slice(&first).unwrap();
        let second = to_canonical_json(&parsed).unwrap();
        assert_eq!(first, second);
    }
}
