//! Proptest strategies for property-based testing.
//!
//! The envelope strategies produce structurally valid envelopes with
//! random (unverifiable) signatures, which is exactly what the codec
//! properties need: canonical round-trips must hold for every
//! well-formed envelope regardless of signature validity.

use proptest::prelude::*;

use cop_core::crypto::{AeadNonce, Ed25519Signature, Sha256Digest, X25519PublicKey};
use cop_core::envelope::{Envelope, GroupWrapSet, WrappedKey, ENVELOPE_VERSION};
use cop_core::types::TxId;

/// Raw material for one wrap: ciphertext, ephemeral public, nonce.
type WrapRaw = (Vec<u8>, [u8; 32], [u8; 12]);

fn arb_wrap_raw() -> impl Strategy<Value = WrapRaw> {
    (
        prop::collection::vec(any::<u8>(), 48..=48),
        any::<[u8; 32]>(),
        any::<[u8; 12]>(),
    )
}

fn wraps_from_raw(prefix: &str, raw: Vec<WrapRaw>) -> Vec<WrappedKey> {
    raw.into_iter()
        .enumerate()
        .map(|(i, (ct, eph_pub, nonce))| WrappedKey {
            ct,
            eph_pub: X25519PublicKey::from_bytes(eph_pub),
            name: format!("{prefix}-{i}"),
            nonce: AeadNonce::from_bytes(nonce),
        })
        .collect()
}

/// A plausible party or group label.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 _]{0,23}"
}

/// A wrap addressed to the given recipient.
pub fn arb_wrapped_key(name: String) -> impl Strategy<Value = WrappedKey> {
    arb_wrap_raw().prop_map(move |(ct, eph_pub, nonce)| WrappedKey {
        ct,
        eph_pub: X25519PublicKey::from_bytes(eph_pub),
        name: name.clone(),
        nonce: AeadNonce::from_bytes(nonce),
    })
}

/// A structurally valid envelope without addenda.
pub fn arb_envelope() -> impl Strategy<Value = Envelope> {
    (
        arb_name(),
        prop::option::of(arb_name()),
        prop::collection::vec(any::<u8>(), 16..256),
        any::<[u8; 32]>(),
        any::<[u8; 12]>(),
        prop::collection::vec(arb_wrap_raw(), 0..4),
        prop::collection::vec(prop::collection::vec(arb_wrap_raw(), 1..4), 0..3),
        any::<[u8; 32]>(),
        any::<[u8; 16]>(),
    )
        .prop_map(
            |(seller, buyer, content_ct, hash, nonce, directs, groups, sig_seed, tx)| {
                let direct_recipients = wraps_from_raw("recipient", directs);
                let group_recipients = groups
                    .into_iter()
                    .enumerate()
                    .map(|(gi, raw)| {
                        let wraps = wraps_from_raw(&format!("member-{gi}"), raw);
                        GroupWrapSet {
                            group_id: format!("group-{gi}"),
                            members: wraps.iter().map(|w| w.name.clone()).collect(),
                            wraps,
                        }
                    })
                    .collect();

                let mut sig = [0u8; 64];
                sig[..32].copy_from_slice(&sig_seed);
                sig[32..].copy_from_slice(&sig_seed);

                Envelope {
                    addenda: Vec::new(),
                    buyer: buyer.unwrap_or_default(),
                    buyer_sig: None,
                    content_ct,
                    content_hash: Sha256Digest::from_bytes(hash),
                    content_nonce: AeadNonce::from_bytes(nonce),
                    direct_recipients,
                    group_recipients,
                    seller,
                    seller_sig: Ed25519Signature::from_bytes(sig),
                    tx_id: TxId::from_bytes(tx),
                    version: ENVELOPE_VERSION.to_string(),
                }
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cop_core::canonical::{parse_envelope, to_canonical_bytes};

    proptest! {
        #[test]
        fn envelope_canonical_roundtrip(envelope in arb_envelope()) {
            let bytes = to_canonical_bytes(&envelope).unwrap();
            let parsed = parse_envelope(&bytes).unwrap();
            prop_assert_eq!(&parsed, &envelope);
            prop_assert_eq!(to_canonical_bytes(&parsed).unwrap(), bytes);
        }

        #[test]
        fn envelope_structure_accepts_generated(envelope in arb_envelope()) {
            prop_assert!(envelope.validate_structure().is_ok());
        }
    }
}
