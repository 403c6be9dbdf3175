pub mod hash;
pub mod keys;
pub mod signature;

pub use hash::{hash, hash_struct, keccak256, ZERO_HASH};
pub use keys::KeyPair;
pub use signature::{recover, sign, stamp, verify_signature, ARDAN_ID};

use thiserror::Error;

/// Errors raised by the cryptographic primitives. The chain layer folds
/// these into its `BadSignature` error kind.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("invalid hex string")]
    Hex(#[from] hex::FromHexError),

    #[error("invalid private key")]
    Key,

    #[error("signing failed")]
    Sign,

    #[error("unable to recover public key from signature")]
    Recover,

    #[error("invalid recovery id")]
    RecoveryId,

    #[error("invalid signature values")]
    SignatureValues,

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("key file error: {0}")]
    Io(#[from] std::io::Error),
}
