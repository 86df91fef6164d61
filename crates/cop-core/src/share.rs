//! Disclosure receipts.
//!
//! Every disclosure of a protected transaction is accompanied by a
//! ShareRecord signed by the sharer, so the seller can later audit who
//! disclosed what to whom.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::share_record_signing_digest;
use crate::crypto::{Ed25519PublicKey, Ed25519Signature};
use crate::error::Result;
use crate::types::TxId;

/// Whether a disclosure targets a named party or a dynamic group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareKind {
    Direct,
    Group,
}

/// A signed disclosure receipt.
///
/// The signature covers the SHA-256 of the canonical serialization of
/// all other fields. Field order is lexicographic by wire key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShareRecord {
    /// Party name (direct) or group id (group).
    pub disclosed_to: String,

    pub kind: ShareKind,

    /// The disclosing party.
    pub sharer: String,

    pub sig: Ed25519Signature,

    /// RFC 3339; non-decreasing per sharer.
    pub timestamp: DateTime<Utc>,

    pub tx_id: TxId,
}

impl ShareRecord {
    /// Verify this record's signature under the sharer's signing key.
    pub fn verify(&self, sharer_signing_pub: &Ed25519PublicKey) -> Result<()> {
        let digest = share_record_signing_digest(self)?;
        sharer_signing_pub.verify(digest.as_bytes(), &self.sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningKeypair;

    fn sample_record(keypair: &SigningKeypair) -> ShareRecord {
        let mut record = ShareRecord {
            disclosed_to: "Auditor Corp".into(),
            kind: ShareKind::Direct,
            sharer: "Lays Chips".into(),
            sig: Ed25519Signature::from_bytes([0u8; 64]),
            timestamp: "2026-08-02T10:00:00Z".parse().unwrap(),
            tx_id: TxId::from_bytes([9u8; 16]),
        };
        let digest = share_record_signing_digest(&record).unwrap();
        record.sig = keypair.sign(digest.as_bytes());
        record
    }

    #[test]
    fn test_record_verifies() {
        let keypair = SigningKeypair::from_seed(&[0x11; 32]);
        let record = sample_record(&keypair);
        assert!(record.verify(&keypair.public_key()).is_ok());
    }

    #[test]
    fn test_record_field_change_breaks_signature() {
        let keypair = SigningKeypair::from_seed(&[0x11; 32]);
        let mut record = sample_record(&keypair);
        record.disclosed_to = "Random Co".into();
        assert!(record.verify(&keypair.public_key()).is_err());
    }

    #[test]
    fn test_record_wrong_key_fails() {
        let keypair = SigningKeypair::from_seed(&[0x11; 32]);
        let other = SigningKeypair::from_seed(&[0x22; 32]);
        let record = sample_record(&keypair);
        assert!(record.verify(&other.public_key()).is_err());
    }
}
