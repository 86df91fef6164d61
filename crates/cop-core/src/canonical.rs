//! Canonical JSON encoding.
//!
//! Seller, buyer, and sharer signatures all cover canonical bytes, so
//! serialization must be deterministic: object keys appear in
//! lexicographic order (wire structs declare fields in that order and
//! serialization follows declaration order), output is compact with no
//! insignificant whitespace, binary values are base64url without
//! padding, and integers are decimal. Parsers reject any input whose
//! canonical re-encoding differs from the input bytes.

use serde::Serialize;

use crate::crypto::{AeadNonce, Sha256Digest};
use crate::envelope::{Envelope, GroupWrapSet, WrappedKey};
use crate::error::{CopError, Result};
use crate::share::{ShareKind, ShareRecord};
use crate::types::TxId;

/// base64url without padding, the encoding of every binary wire field.
pub mod b64 {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    pub fn encode(bytes: &[u8]) -> String {
        URL_SAFE_NO_PAD.encode(bytes)
    }

    pub fn decode(s: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE_NO_PAD.decode(s)
    }
}

/// Serde adapter for variable-length binary fields.
pub(crate) mod b64vec {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::b64;

    pub fn serialize<S: Serializer, T: AsRef<[u8]>>(
        value: &T,
        s: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&b64::encode(value.as_ref()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> std::result::Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        b64::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Serialize an envelope to its canonical wire bytes.
pub fn to_canonical_bytes(envelope: &Envelope) -> Result<Vec<u8>> {
    serde_json::to_vec(envelope).map_err(|e| CopError::Malformed(e.to_string()))
}

/// Parse an envelope from wire bytes.
///
/// Rejects structurally invalid envelopes and any input that is not in
/// canonical form (the re-encoding must reproduce the input bytes).
pub fn parse_envelope(bytes: &[u8]) -> Result<Envelope> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| CopError::Malformed(e.to_string()))?;
    envelope.validate_structure()?;
    if to_canonical_bytes(&envelope)? != bytes {
        return Err(CopError::Malformed("input is not in canonical form".into()));
    }
    Ok(envelope)
}

/// Serialize a share record to its canonical wire bytes.
pub fn share_record_to_bytes(record: &ShareRecord) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|e| CopError::Malformed(e.to_string()))
}

/// Parse a share record from wire bytes, enforcing canonical form.
pub fn parse_share_record(bytes: &[u8]) -> Result<ShareRecord> {
    let record: ShareRecord =
        serde_json::from_slice(bytes).map_err(|e| CopError::Malformed(e.to_string()))?;
    if share_record_to_bytes(&record)? != bytes {
        return Err(CopError::Malformed("input is not in canonical form".into()));
    }
    Ok(record)
}

/// The seller/buyer signing input: the canonical envelope minus both
/// signatures and minus addenda.
#[derive(Serialize)]
struct SigningInput<'a> {
    buyer: &'a str,
    #[serde(with = "b64vec")]
    content_ct: &'a [u8],
    content_hash: &'a Sha256Digest,
    content_nonce: &'a AeadNonce,
    direct_recipients: &'a [WrappedKey],
    group_recipients: &'a [GroupWrapSet],
    seller: &'a str,
    tx_id: &'a TxId,
    version: &'a str,
}

/// Compute the byte string covered by the seller and buyer signatures.
pub fn signing_input(envelope: &Envelope) -> Result<Vec<u8>> {
    let input = SigningInput {
        buyer: &envelope.buyer,
        content_ct: &envelope.content_ct,
        content_hash: &envelope.content_hash,
        content_nonce: &envelope.content_nonce,
        direct_recipients: &envelope.direct_recipients,
        group_recipients: &envelope.group_recipients,
        seller: &envelope.seller,
        tx_id: &envelope.tx_id,
        version: &envelope.version,
    };
    serde_json::to_vec(&input).map_err(|e| CopError::Malformed(e.to_string()))
}

/// The share-record signing body: the canonical record minus `sig`.
#[derive(Serialize)]
struct ShareRecordSigning<'a> {
    disclosed_to: &'a str,
    kind: ShareKind,
    sharer: &'a str,
    timestamp: &'a chrono::DateTime<chrono::Utc>,
    tx_id: &'a TxId,
}

/// SHA-256 of the canonical share-record signing body.
pub fn share_record_signing_digest(record: &ShareRecord) -> Result<Sha256Digest> {
    let body = ShareRecordSigning {
        disclosed_to: &record.disclosed_to,
        kind: record.kind,
        sharer: &record.sharer,
        timestamp: &record.timestamp,
        tx_id: &record.tx_id,
    };
    let bytes = serde_json::to_vec(&body).map_err(|e| CopError::Malformed(e.to_string()))?;
    Ok(Sha256Digest::hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AeadNonce, Ed25519Signature, Sha256Digest, X25519PublicKey};
    use crate::envelope::{ENVELOPE_VERSION, WRAPPED_KEY_LEN};

    fn sample_envelope() -> Envelope {
        Envelope {
            addenda: Vec::new(),
            buyer: "Lays Chips".into(),
            buyer_sig: None,
            content_ct: vec![0xaa; 48],
            content_hash: Sha256Digest::from_bytes([1u8; 32]),
            content_nonce: AeadNonce::from_bytes([2u8; 12]),
            direct_recipients: vec![WrappedKey {
                ct: vec![3u8; WRAPPED_KEY_LEN],
                eph_pub: X25519PublicKey::from_bytes([4u8; 32]),
                name: "Ching Chong Extractions".into(),
                nonce: AeadNonce::from_bytes([5u8; 12]),
            }],
            group_recipients: vec![GroupWrapSet {
                group_id: "tech_partners".into(),
                members: vec!["Auditor Corp".into()],
                wraps: vec![WrappedKey {
                    ct: vec![6u8; WRAPPED_KEY_LEN],
                    eph_pub: X25519PublicKey::from_bytes([7u8; 32]),
                    name: "Auditor Corp".into(),
                    nonce: AeadNonce::from_bytes([8u8; 12]),
                }],
            }],
            seller: "Ching Chong Extractions".into(),
            seller_sig: Ed25519Signature::from_bytes([9u8; 64]),
            tx_id: TxId::from_bytes([10u8; 16]),
            version: ENVELOPE_VERSION.into(),
        }
    }

    #[test]
    fn test_serialization_deterministic() {
        let env = sample_envelope();
        assert_eq!(
            to_canonical_bytes(&env).unwrap(),
            to_canonical_bytes(&env).unwrap()
        );
    }

    #[test]
    fn test_parse_serialize_roundtrip() {
        let env = sample_envelope();
        let bytes = to_canonical_bytes(&env).unwrap();
        let parsed = parse_envelope(&bytes).unwrap();
        assert_eq!(env, parsed);
        assert_eq!(to_canonical_bytes(&parsed).unwrap(), bytes);
    }

    #[test]
    fn test_keys_in_lexicographic_order() {
        let env = sample_envelope();
        let bytes = to_canonical_bytes(&env).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let buyer = text.find("\"buyer\"").unwrap();
        let content_ct = text.find("\"content_ct\"").unwrap();
        let seller = text.find("\"seller\":").unwrap();
        let tx_id = text.find("\"tx_id\"").unwrap();
        let version = text.find("\"version\"").unwrap();
        assert!(buyer < content_ct && content_ct < seller && seller < tx_id && tx_id < version);
    }

    #[test]
    fn test_non_canonical_whitespace_rejected() {
        let env = sample_envelope();
        let pretty = serde_json::to_vec_pretty(&env).unwrap();
        assert!(matches!(
            parse_envelope(&pretty),
            Err(CopError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let env = sample_envelope();
        let mut value: serde_json::Value =
            serde_json::from_slice(&to_canonical_bytes(&env).unwrap()).unwrap();
        value["surprise"] = serde_json::json!(1);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            parse_envelope(&bytes),
            Err(CopError::Malformed(_))
        ));
    }

    #[test]
    fn test_padded_base64_rejected() {
        let env = sample_envelope();
        let text = String::from_utf8(to_canonical_bytes(&env).unwrap()).unwrap();
        let padded = text.replacen("\"content_nonce\":\"", "\"content_nonce\":\"=", 1);
        assert!(parse_envelope(padded.as_bytes()).is_err());
    }

    #[test]
    fn test_signing_input_ignores_signatures_and_addenda() {
        let mut env = sample_envelope();
        let base = signing_input(&env).unwrap();

        env.seller_sig = Ed25519Signature::from_bytes([0xff; 64]);
        env.buyer_sig = Some(Ed25519Signature::from_bytes([0xee; 64]));
        assert_eq!(signing_input(&env).unwrap(), base);
    }

    #[test]
    fn test_signing_input_covers_content() {
        let mut env = sample_envelope();
        let base = signing_input(&env).unwrap();
        env.content_ct[0] ^= 1;
        assert_ne!(signing_input(&env).unwrap(), base);
    }

    #[test]
    fn test_share_record_digest_excludes_sig() {
        let record = ShareRecord {
            disclosed_to: "Auditor Corp".into(),
            kind: ShareKind::Direct,
            sharer: "Lays Chips".into(),
            sig: Ed25519Signature::from_bytes([0u8; 64]),
            timestamp: "2026-08-02T10:00:00Z".parse().unwrap(),
            tx_id: TxId::from_bytes([1u8; 16]),
        };
        let d1 = share_record_signing_digest(&record).unwrap();

        let mut resigned = record.clone();
        resigned.sig = Ed25519Signature::from_bytes([0xff; 64]);
        assert_eq!(d1, share_record_signing_digest(&resigned).unwrap());

        let mut retargeted = record;
        retargeted.disclosed_to = "Random Co".into();
        assert_ne!(d1, share_record_signing_digest(&retargeted).unwrap());
    }

    #[test]
    fn test_share_record_wire_roundtrip() {
        let record = ShareRecord {
            disclosed_to: "tech_partners".into(),
            kind: ShareKind::Group,
            sharer: "Lays Chips".into(),
            sig: Ed25519Signature::from_bytes([0x33; 64]),
            timestamp: "2026-08-02T10:00:00Z".parse().unwrap(),
            tx_id: TxId::from_bytes([1u8; 16]),
        };
        let bytes = share_record_to_bytes(&record).unwrap();
        assert_eq!(parse_share_record(&bytes).unwrap(), record);
    }
}
