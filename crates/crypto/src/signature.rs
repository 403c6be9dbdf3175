//! Signing and recovery over secp256k1. Values are hashed with a chain
//! specific stamp before signing so signatures can never be replayed from
//! another system, and the recovery id is offset by a fixed constant to
//! mark the signature as belonging to this chain.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::FieldBytes;
use serde::Serialize;
use sha3::{Digest, Keccak256};

use crate::hash::keccak256;
use crate::CryptoError;
use ardan_common::codec;
use ardan_common::types::{AccountID, ADDRESS_LENGTH};

/// Offset added to the recovery id when a signature is written out.
/// Inherited from the original protocol definition; the wire `v` is always
/// `ARDAN_ID` or `ARDAN_ID + 1`.
pub const ARDAN_ID: u8 = 29;

/// secp256k1 curve order n, big endian.
const SECP256K1_N: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36,
    0x41, 0x41,
];

/// secp256k1 n / 2, big endian. Signatures with `s` above this value are
/// malleable and rejected.
const SECP256K1_N_HALF: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b,
    0x20, 0xa0,
];

/// Hash a value with the chain stamp embedded: the canonical JSON encoding
/// is prefixed with `\x19Ardan Signed Message:\n<len>` and the whole thing
/// keccak-256 hashed into the 32-byte digest that gets signed.
pub fn stamp<T: Serialize>(value: &T) -> Result<[u8; 32], CryptoError> {
    let data = codec::to_canonical_json(value)?;
    let prefix = format!("\x19Ardan Signed Message:\n{}", data.len());

    let mut hasher = Keccak256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(&data);

    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// Sign a value, returning the `(r, s, v)` signature components with `v`
/// already offset by [`ARDAN_ID`].
pub fn sign<T: Serialize>(
    value: &T,
    key: &SigningKey,
) -> Result<([u8; 32], [u8; 32], u8), CryptoError> {
    let digest = stamp(value)?;

    let (sig, recovery_id) = key
        .sign_prehash_recoverable(&digest)
        .map_err(|_| CryptoError::Sign)?;
    if recovery_id.is_x_reduced() {
        return Err(CryptoError::Sign);
    }

    let r: [u8; 32] = sig.r().to_bytes().into();
    let s: [u8; 32] = sig.s().to_bytes().into();
    let v = recovery_id.to_byte() + ARDAN_ID;

    Ok((r, s, v))
}

/// Recover the account that signed the value. The signature is checked
/// against the chain rules first.
pub fn recover<T: Serialize>(
    value: &T,
    r: &[u8; 32],
    s: &[u8; 32],
    v: u8,
) -> Result<AccountID, CryptoError> {
    verify_signature(r, s, v)?;

    let digest = stamp(value)?;
    let sig = EcdsaSignature::from_scalars(FieldBytes::from(*r), FieldBytes::from(*s))
        .map_err(|_| CryptoError::SignatureValues)?;
    let recovery_id = RecoveryId::from_byte(v - ARDAN_ID).ok_or(CryptoError::RecoveryId)?;

    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|_| CryptoError::Recover)?;

    Ok(public_key_to_account(&key))
}

/// Check the signature components obey the chain rules: `v` carries the
/// chain offset, `r` lies in `[1, n)`, and `s` lies in `[1, n/2]`.
pub fn verify_signature(r: &[u8; 32], s: &[u8; 32], v: u8) -> Result<(), CryptoError> {
    if v != ARDAN_ID && v != ARDAN_ID + 1 {
        return Err(CryptoError::RecoveryId);
    }

    // Fixed-width big-endian values compare numerically as byte slices.
    let zero = [0u8; 32];
    if r == &zero || r.as_slice() >= SECP256K1_N.as_slice() {
        return Err(CryptoError::SignatureValues);
    }
    if s == &zero || s.as_slice() > SECP256K1_N_HALF.as_slice() {
        return Err(CryptoError::SignatureValues);
    }

    Ok(())
}

/// Derive the account address from a public key: keccak-256 of the
/// uncompressed point, keeping the last 20 bytes.
pub fn public_key_to_account(key: &VerifyingKey) -> AccountID {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);

    let mut id = [0u8; ADDRESS_LENGTH];
    id.copy_from_slice(&digest[32 - ADDRESS_LENGTH..]);
    AccountID(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Payload {
        name: String,
    }

    #[test]
    fn test_sign_recover_round_trip() {
        let pair = KeyPair::random();
        let value = Payload {
            name: "bill".to_string(),
        };

        let (r, s, v) = sign(&value, pair.signing_key()).unwrap();
        let recovered = recover(&value, &r, &s, v).unwrap();
        assert_eq!(recovered, pair.account_id());
    }

    #[test]
    fn test_recover_rejects_tampered_value() {
        let pair = KeyPair::random();
        let value = Payload {
            name: "bill".to_string(),
        };
        let other = Payload {
            name: "bills".to_string(),
        };

        let (r, s, v) = sign(&value, pair.signing_key()).unwrap();

        // Recovery over different data yields a different account, never
        // the signer.
        if let Ok(recovered) = recover(&other, &r, &s, v) {
            assert_ne!(recovered, pair.account_id());
        }
    }

    #[test]
    fn test_signatures_are_low_s() {
        let pair = KeyPair::random();
        let value = Payload {
            name: "bill".to_string(),
        };

        let (r, s, v) = sign(&value, pair.signing_key()).unwrap();
        assert!(verify_signature(&r, &s, v).is_ok());
    }

    #[test]
    fn test_verify_signature_bounds() {
        let one = {
            let mut b = [0u8; 32];
            b[31] = 1;
            b
        };

        // Recovery id without the chain offset.
        assert!(verify_signature(&one, &one, 0).is_err());
        assert!(verify_signature(&one, &one, ARDAN_ID + 2).is_err());

        // Zero components.
        assert!(verify_signature(&[0u8; 32], &one, ARDAN_ID).is_err());
        assert!(verify_signature(&one, &[0u8; 32], ARDAN_ID).is_err());

        // s above n/2.
        let mut high_s = SECP256K1_N_HALF;
        high_s[31] = high_s[31].wrapping_add(1);
        assert!(verify_signature(&one, &high_s, ARDAN_ID).is_err());

        // r at the curve order.
        assert!(verify_signature(&SECP256K1_N, &one, ARDAN_ID).is_err());

        assert!(verify_signature(&one, &one, ARDAN_ID).is_ok());
        assert!(verify_signature(&one, &one, ARDAN_ID + 1).is_ok());
    }

    #[test]
    fn test_stamp_depends_on_length_prefix() {
        let a = Payload {
            name: "bill".to_string(),
        };
        let b = Payload {
            name: "bilbo".to_string(),
        };

        assert_ne!(stamp(&a).unwrap(), stamp(&b).unwrap());
        assert_eq!(stamp(&a).unwrap(), stamp(&a).unwrap());
    }
}
