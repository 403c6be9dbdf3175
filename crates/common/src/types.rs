use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::error::ChainError;

pub const ADDRESS_LENGTH: usize = 20;

/// A 20-byte account address. Rendered as a `0x`-prefixed hex string with
/// the mixed-case checksum convention, which is how it appears on the wire
/// and in the genesis file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountID(pub [u8; ADDRESS_LENGTH]);

impl AccountID {
    /// Parse an address from its string form. Accepts any hex casing with
    /// or without the `0x` prefix, but rejects anything that does not
    /// decode to exactly 20 bytes.
    pub fn from_hex(s: &str) -> Result<Self, ChainError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| ChainError::InvalidAccountID)?;
        if bytes.len() != ADDRESS_LENGTH {
            return Err(ChainError::InvalidAccountID);
        }
        let mut arr = [0u8; ADDRESS_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(AccountID(arr))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checksum-cased string form. A hex digit is uppercased when the
    /// corresponding nibble of keccak256(lowercase_hex) is >= 8.
    fn to_checksum_string(self) -> String {
        let lower = hex::encode(self.0);
        let digest = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + ADDRESS_LENGTH * 2);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                digest[i / 2] >> 4
            } else {
                digest[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for AccountID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum_string())
    }
}

impl fmt::Debug for AccountID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountID({})", self.to_checksum_string())
    }
}

impl FromStr for AccountID {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountID {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_checksum_string())
    }
}

impl<'de> Deserialize<'de> for AccountID {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        AccountID::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Balance and nonce information for a single account. Accounts are created
/// lazily with a zero balance on first reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: AccountID,
    pub balance: u64,
    pub nonce: u64,
}

impl Account {
    pub fn new(id: AccountID, balance: u64) -> Self {
        Self {
            id,
            balance,
            nonce: 0,
        }
    }
}
