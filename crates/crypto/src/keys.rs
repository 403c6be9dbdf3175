use k256::ecdsa::SigningKey;
use rand_core::OsRng;
use std::path::Path;

use crate::signature::public_key_to_account;
use crate::CryptoError;
use ardan_common::types::AccountID;

/// A secp256k1 key pair. Account key files are stored as the raw hex of
/// the 32-byte private key in a `<name>.ecdsa` file.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    pub fn from_private_key_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let hex_str = hex_str.trim().strip_prefix("0x").unwrap_or(hex_str.trim());
        let bytes = hex::decode(hex_str)?;
        let signing_key = SigningKey::from_slice(&bytes).map_err(|_| CryptoError::Key)?;
        Ok(Self { signing_key })
    }

    /// Load a key pair from a `.ecdsa` key file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_private_key_hex(&contents)
    }

    /// Write the private key out as raw hex.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), CryptoError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, hex::encode(self.signing_key.to_bytes()))?;
        Ok(())
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// The account address this key controls.
    pub fn account_id(&self) -> AccountID {
        public_key_to_account(self.signing_key.verifying_key())
    }
}
