use serde::{Deserialize, Serialize};

use ardan_common::codec;
use ardan_common::types::AccountID;
use ardan_common::{ChainError, Result};
use ardan_crypto::hash::{hash_struct, keccak256};
use ardan_crypto::{signature, KeyPair};

use crate::merkle::Hashable;

/// An unsigned transfer of value between two accounts. The `from` field is
/// informational; the authoritative sender is recovered from the signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tx {
    pub chain_id: u16,
    pub nonce: u64,
    pub from: AccountID,
    pub to: AccountID,
    pub value: u64,
    pub tip: u64,
    #[serde(with = "codec::hex_bytes", default)]
    pub data: Vec<u8>,
}

impl Tx {
    /// Sign the transaction, producing the wire form carrying `(r, s, v)`.
    pub fn sign(&self, key: &KeyPair) -> Result<SignedTx> {
        let (r, s, v) = signature::sign(self, key.signing_key())
            .map_err(|err| ChainError::BadSignature(err.to_string()))?;

        Ok(SignedTx {
            tx: self.clone(),
            r,
            s,
            v,
        })
    }
}

/// A signed transaction as it travels over the wire: the transaction fields
/// followed by the secp256k1 signature components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedTx {
    #[serde(flatten)]
    pub tx: Tx,
    #[serde(with = "codec::hex_array")]
    pub r: [u8; 32],
    #[serde(with = "codec::hex_array")]
    pub s: [u8; 32],
    pub v: u8,
}

impl SignedTx {
    /// Recover the account that signed this transaction.
    pub fn from_account(&self) -> Result<AccountID> {
        signature::recover(&self.tx, &self.r, &self.s, self.v)
            .map_err(|err| ChainError::BadSignature(err.to_string()))
    }

    /// Check the transaction is well formed for this chain before it is
    /// allowed anywhere near the mempool.
    pub fn validate(&self, chain_id: u16) -> Result<()> {
        if self.tx.chain_id != chain_id {
            return Err(ChainError::WrongChainId {
                got: self.tx.chain_id,
                expected: chain_id,
            });
        }

        if self.tx.from == self.tx.to {
            return Err(ChainError::SelfTransfer {
                from: self.tx.from,
                to: self.tx.to,
            });
        }

        signature::verify_signature(&self.r, &self.s, self.v)
            .map_err(|err| ChainError::BadSignature(err.to_string()))?;

        // The declared sender must be the account the signature recovers to.
        let from = self.from_account()?;
        if from != self.tx.from {
            return Err(ChainError::BadSignature(
                "from address does not match signature".to_string(),
            ));
        }

        Ok(())
    }
}

/// A transaction as recorded inside a block, extended with the gas metering
/// captured at submission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockTx {
    #[serde(flatten)]
    pub signed_tx: SignedTx,
    #[serde(rename = "timestamp")]
    pub time_stamp: u64,
    pub gas_price: u64,
    pub gas_units: u64,
}

impl BlockTx {
    pub fn new(signed_tx: SignedTx, gas_price: u64, gas_units: u64) -> Self {
        Self {
            signed_tx,
            time_stamp: chrono::Utc::now().timestamp() as u64,
            gas_price,
            gas_units,
        }
    }

    /// The unique hash of this transaction, computed over the signed
    /// transaction it carries. Used as the Merkle leaf.
    pub fn hash(&self) -> Result<String> {
        hash_struct(&self.signed_tx).map_err(ChainError::Serialization)
    }

    pub fn from(&self) -> AccountID {
        self.signed_tx.tx.from
    }

    pub fn to(&self) -> AccountID {
        self.signed_tx.tx.to
    }

    pub fn nonce(&self) -> u64 {
        self.signed_tx.tx.nonce
    }

    pub fn tip(&self) -> u64 {
        self.signed_tx.tx.tip
    }
}

impl Hashable for BlockTx {
    fn merkle_hash(&self) -> Result<[u8; 32]> {
        let data = codec::to_canonical_json(&self.signed_tx).map_err(ChainError::Serialization)?;
        Ok(keccak256(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "fae85851bdf5c9f49923722ce38f3c1defcfd3619ef5453230a58ad805499959";
    const TEST_ADDRESS: &str = "0xdd6B972ffcc631a62CAE1BB9d80b7ff429c8ebA4";
    const OTHER_ADDRESS: &str = "0xF01813E4B85e178A83e29B8E7bF26BD830a25f32";

    fn test_tx() -> Tx {
        Tx {
            chain_id: 1,
            nonce: 1,
            from: TEST_ADDRESS.parse().unwrap(),
            to: OTHER_ADDRESS.parse().unwrap(),
            value: 100,
            tip: 50,
            data: Vec::new(),
        }
    }

    #[test]
    fn test_sign_and_recover_sender() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let signed = test_tx().sign(&key).unwrap();

        let from = signed.from_account().unwrap();
        assert_eq!(from.to_string(), TEST_ADDRESS);
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let signed = test_tx().sign(&key).unwrap();
        assert!(signed.validate(1).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_chain() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let signed = test_tx().sign(&key).unwrap();

        assert!(matches!(
            signed.validate(2),
            Err(ChainError::WrongChainId { got: 1, expected: 2 })
        ));
    }

    #[test]
    fn test_validate_rejects_self_transfer() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let mut tx = test_tx();
        tx.to = tx.from;

        let signed = tx.sign(&key).unwrap();
        assert!(matches!(
            signed.validate(1),
            Err(ChainError::SelfTransfer { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_mismatched_from() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let mut tx = test_tx();
        // Claim to be someone other than the key holder.
        tx.from = OTHER_ADDRESS.parse().unwrap();
        tx.to = TEST_ADDRESS.parse().unwrap();

        let signed = tx.sign(&key).unwrap();
        assert!(matches!(
            signed.validate(1),
            Err(ChainError::BadSignature(_))
        ));
    }

    #[test]
    fn test_block_tx_hash_ignores_gas_fields() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let signed = test_tx().sign(&key).unwrap();

        let a = BlockTx::new(signed.clone(), 1, 15);
        let b = BlockTx::new(signed, 2, 30);
        assert_eq!(a.hash().unwrap(), b.hash().unwrap());
    }

    #[test]
    fn test_signed_tx_wire_field_order() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let signed = test_tx().sign(&key).unwrap();

        let json = String::from_utf8(codec::to_canonical_json(&signed).unwrap()).unwrap();
        let chain = json.find("\"chain_id\"").unwrap();
        let r = json.find("\"r\"").unwrap();
        let s = json.find("\"s\"").unwrap();
        let v = json.find("\"v\"").unwrap();
        assert!(chain < r && r < s && s < v);
    }

    #[test]
    fn test_signed_tx_json_round_trip() {
        let key = KeyPair::from_private_key_hex(TEST_KEY).unwrap();
        let signed = test_tx().sign(&key).unwrap();

        let json = serde_json::to_string(&signed).unwrap();
        let back: SignedTx = serde_json::from_str(&json).unwrap();
        assert_eq!(back, signed);
    }
}
