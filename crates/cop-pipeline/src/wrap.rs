//! Key wrapping: ephemeral X25519 + HKDF-SHA256 + AES-256-GCM.
//!
//! A wrap encrypts one 32-byte key to a recipient's long-term encryption
//! public key. The HKDF salt binds the ephemeral and recipient keys into
//! the derivation, and the recipient key doubles as AEAD aad, so a wrap
//! opens only for the recipient it was addressed to.

use zeroize::Zeroize;

use cop_core::crypto::{
    aead_open, aead_seal, hkdf32, AeadNonce, EphemeralKeyPair, SharedPoint, SymmetricKey,
    X25519PublicKey, X25519StaticSecret,
};
use cop_core::envelope::WrappedKey;
use cop_core::error::{CopError, Result};
use cop_core::types::TxId;

/// Domain-separation label for wrap-key derivation.
pub const WRAP_INFO: &[u8] = b"cop/wrap/v1";

fn derive_wrap_key(
    shared: &SharedPoint,
    eph_pub: &X25519PublicKey,
    recipient_pub: &X25519PublicKey,
) -> SymmetricKey {
    let mut salt = [0u8; 64];
    salt[..32].copy_from_slice(eph_pub.as_bytes());
    salt[32..].copy_from_slice(recipient_pub.as_bytes());
    hkdf32(shared.as_bytes(), &salt, WRAP_INFO)
}

/// Wrap a 32-byte key for one recipient.
///
/// All intermediate secret material (ephemeral secret, shared point,
/// wrap key) is zeroized before this function returns.
pub fn wrap_key(
    key: &SymmetricKey,
    recipient_name: &str,
    recipient_pub: &X25519PublicKey,
) -> Result<WrappedKey> {
    let ephemeral = EphemeralKeyPair::generate()?;
    let eph_pub = ephemeral.public_key();

    let shared = ephemeral.diffie_hellman(recipient_pub);
    let wrap_key = derive_wrap_key(&shared, &eph_pub, recipient_pub);
    drop(shared);

    let nonce = AeadNonce::generate()?;
    let ct = aead_seal(&wrap_key, &nonce, key.as_bytes(), recipient_pub.as_bytes())?;
    drop(wrap_key);

    Ok(WrappedKey {
        ct,
        eph_pub,
        name: recipient_name.to_string(),
        nonce,
    })
}

/// Unwrap a key with the recipient's encryption secret.
///
/// Fails with `AuthFailure` on any tampering or when the wrap was
/// addressed to a different recipient.
pub fn unwrap_key(wrapped: &WrappedKey, recipient_secret: &X25519StaticSecret) -> Result<SymmetricKey> {
    let recipient_pub = recipient_secret.public_key();
    let shared = recipient_secret.diffie_hellman(&wrapped.eph_pub);
    let wrap_key = derive_wrap_key(&shared, &wrapped.eph_pub, &recipient_pub);
    drop(shared);

    let mut key_bytes = aead_open(
        &wrap_key,
        &wrapped.nonce,
        &wrapped.ct,
        recipient_pub.as_bytes(),
    )?;
    drop(wrap_key);

    if key_bytes.len() != 32 {
        key_bytes.zeroize();
        return Err(CopError::AuthFailure);
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&key_bytes);
    key_bytes.zeroize();
    let key = SymmetricKey::from_bytes(arr);
    arr.zeroize();
    Ok(key)
}

/// Derive the per-transaction group key: HKDF(ikm = content key,
/// salt = tx id, info = group id). Binds the key to both the
/// transaction and the group, so disclosure to one group never allows
/// cross-group or cross-transaction derivation.
pub fn derive_group_key(content_key: &SymmetricKey, tx_id: &TxId, group_id: &str) -> SymmetricKey {
    hkdf32(content_key.as_bytes(), tx_id.as_bytes(), group_id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let recipient = X25519StaticSecret::generate().unwrap();
        let key = SymmetricKey::generate().unwrap();

        let wrapped = wrap_key(&key, "Auditor Corp", &recipient.public_key()).unwrap();
        assert_eq!(wrapped.name, "Auditor Corp");
        assert_eq!(wrapped.ct.len(), 48);

        let unwrapped = unwrap_key(&wrapped, &recipient).unwrap();
        assert_eq!(unwrapped.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_wrong_recipient_cannot_unwrap() {
        let recipient = X25519StaticSecret::generate().unwrap();
        let outsider = X25519StaticSecret::generate().unwrap();
        let key = SymmetricKey::generate().unwrap();

        let wrapped = wrap_key(&key, "Auditor Corp", &recipient.public_key()).unwrap();
        assert!(matches!(
            unwrap_key(&wrapped, &outsider),
            Err(CopError::AuthFailure)
        ));
    }

    #[test]
    fn test_tampered_wrap_fails() {
        let recipient = X25519StaticSecret::generate().unwrap();
        let key = SymmetricKey::generate().unwrap();

        let mut wrapped = wrap_key(&key, "Auditor Corp", &recipient.public_key()).unwrap();
        wrapped.ct[0] ^= 0x01;
        assert!(matches!(
            unwrap_key(&wrapped, &recipient),
            Err(CopError::AuthFailure)
        ));
    }

    #[test]
    fn test_wraps_use_fresh_ephemerals() {
        let recipient = X25519StaticSecret::generate().unwrap();
        let key = SymmetricKey::generate().unwrap();

        let w1 = wrap_key(&key, "X", &recipient.public_key()).unwrap();
        let w2 = wrap_key(&key, "X", &recipient.public_key()).unwrap();
        assert_ne!(w1.eph_pub, w2.eph_pub);
        assert_ne!(w1.nonce, w2.nonce);
        assert_ne!(w1.ct, w2.ct);
    }

    #[test]
    fn test_group_key_separation() {
        let content_key = SymmetricKey::generate().unwrap();
        let tx_a = TxId::from_bytes([1u8; 16]);
        let tx_b = TxId::from_bytes([2u8; 16]);

        let g1 = derive_group_key(&content_key, &tx_a, "tech_partners");
        let g2 = derive_group_key(&content_key, &tx_a, "logistics");
        let g3 = derive_group_key(&content_key, &tx_b, "tech_partners");

        assert_ne!(g1.as_bytes(), g2.as_bytes());
        assert_ne!(g1.as_bytes(), g3.as_bytes());
        assert_ne!(g1.as_bytes(), content_key.as_bytes());
    }
}
