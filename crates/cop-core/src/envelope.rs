//! The protected-document envelope.
//!
//! Field declaration order inside every wire struct is lexicographic by
//! wire key. The canonical codec relies on this: serialization emits
//! fields in declaration order, which is therefore also canonical order.

use serde::{Deserialize, Serialize};

use crate::crypto::{AeadNonce, Ed25519Signature, Sha256Digest, X25519PublicKey};
use crate::error::{CopError, Result};
use crate::share::{ShareKind, ShareRecord};
use crate::types::TxId;

/// The envelope format version tag.
pub const ENVELOPE_VERSION: &str = "cop/1";

/// AEAD tag length appended to every ciphertext.
pub const AEAD_TAG_LEN: usize = 16;

/// Length of a wrapped 32-byte key: the key plus the AEAD tag.
pub const WRAPPED_KEY_LEN: usize = 32 + AEAD_TAG_LEN;

/// A 32-byte key encrypted to one recipient's long-term X25519 key via
/// ephemeral ECDH + HKDF + AES-256-GCM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WrappedKey {
    /// 48 bytes: the wrapped key plus AEAD tag.
    #[serde(with = "crate::canonical::b64vec")]
    pub ct: Vec<u8>,

    /// Sender-side ephemeral X25519 public key.
    pub eph_pub: X25519PublicKey,

    /// The recipient this wrap is addressed to.
    pub name: String,

    /// Fresh random nonce for this wrap.
    pub nonce: AeadNonce,
}

/// The wraps produced for one group at protect time.
///
/// Invariant: `members` equals the `name` fields of `wraps`, in order.
/// These wraps carry the derived group key, never the content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupWrapSet {
    /// The group these wraps were made for.
    pub group_id: String,

    /// Membership snapshot frozen at protect time.
    pub members: Vec<String>,

    /// One group-key wrap per snapshot member.
    pub wraps: Vec<WrappedKey>,
}

/// A key sealed under another symmetric key (content key under group key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SealedKey {
    #[serde(with = "crate::canonical::b64vec")]
    pub ct: Vec<u8>,

    pub nonce: AeadNonce,
}

/// The group half of a group-share addendum: the share-time snapshot,
/// a group-key wrap per member, and the content key sealed under the
/// group key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupAddendum {
    pub group_id: String,

    /// Content key sealed under the derived group key.
    pub key_ct: SealedKey,

    /// Membership snapshot frozen at share time.
    pub members: Vec<String>,

    /// One group-key wrap per share-time member.
    pub wraps: Vec<WrappedKey>,
}

/// A post-protect extension of the envelope: one disclosure, authorized
/// by its signed [`ShareRecord`]. Addenda are not covered by the seller
/// signature; each is authenticated individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Addendum {
    /// Present for group shares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupAddendum>,

    /// The signed disclosure receipt accompanying this addendum.
    pub share_record: ShareRecord,

    /// Present for direct shares: a fresh content-key wrap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap: Option<WrappedKey>,
}

/// The protected-document envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Post-protect disclosures; empty right after protect.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addenda: Vec<Addendum>,

    /// Buyer name; may be empty until a buyer is attached.
    pub buyer: String,

    /// Buyer signature over the same signing input as the seller's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_sig: Option<Ed25519Signature>,

    /// AEAD ciphertext of the transaction content under the content key.
    #[serde(with = "crate::canonical::b64vec")]
    pub content_ct: Vec<u8>,

    /// SHA-256 of the transaction plaintext.
    pub content_hash: Sha256Digest,

    /// Nonce for the content ciphertext.
    pub content_nonce: AeadNonce,

    /// Content-key wraps for individually named recipients.
    pub direct_recipients: Vec<WrappedKey>,

    /// Group-key wraps per addressed group.
    pub group_recipients: Vec<GroupWrapSet>,

    /// Seller name.
    pub seller: String,

    /// Seller signature over the canonical signing input.
    pub seller_sig: Ed25519Signature,

    /// Transaction identifier.
    pub tx_id: TxId,

    /// Format version tag.
    pub version: String,
}

impl Envelope {
    /// AAD binding the content ciphertext to this transaction:
    /// `tx_id || seller || buyer`.
    pub fn content_aad(&self) -> Vec<u8> {
        content_aad(&self.tx_id, &self.seller, &self.buyer)
    }

    /// Find the direct content-key wrap for a party, if any.
    pub fn direct_wrap_for(&self, name: &str) -> Option<&WrappedKey> {
        self.direct_recipients.iter().find(|w| w.name == name)
    }

    /// Protect-time group wrap sets whose snapshot contains a party.
    pub fn group_sets_containing<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a GroupWrapSet> {
        self.group_recipients
            .iter()
            .filter(move |g| g.members.iter().any(|m| m == name))
    }

    /// Structural validation: every envelope invariant that can be
    /// checked without keys. Signature checks live in [`crate::check`].
    pub fn validate_structure(&self) -> Result<()> {
        if self.version != ENVELOPE_VERSION {
            return Err(malformed(format!("unsupported version: {}", self.version)));
        }
        if self.seller.is_empty() {
            return Err(malformed("seller name is empty"));
        }
        if self.buyer_sig.is_some() && self.buyer.is_empty() {
            return Err(malformed("buyer signature present without buyer name"));
        }
        if self.content_ct.len() < AEAD_TAG_LEN {
            return Err(malformed("content ciphertext shorter than AEAD tag"));
        }

        let mut seen = std::collections::HashSet::new();
        for wrap in &self.direct_recipients {
            validate_wrap(wrap)?;
            if !seen.insert(wrap.name.as_str()) {
                return Err(malformed(format!(
                    "duplicate direct recipient: {}",
                    wrap.name
                )));
            }
        }

        for set in &self.group_recipients {
            validate_group_wraps(&set.group_id, &set.members, &set.wraps)?;
        }

        for addendum in &self.addenda {
            self.validate_addendum_structure(addendum)?;
        }

        Ok(())
    }

    fn validate_addendum_structure(&self, addendum: &Addendum) -> Result<()> {
        let record = &addendum.share_record;
        if record.tx_id != self.tx_id {
            return Err(malformed("addendum share record for different transaction"));
        }
        match (record.kind, &addendum.wrap, &addendum.group) {
            (ShareKind::Direct, Some(wrap), None) => {
                validate_wrap(wrap)?;
                if wrap.name != record.disclosed_to {
                    return Err(malformed("direct addendum wrap name mismatch"));
                }
                Ok(())
            }
            (ShareKind::Group, None, Some(group)) => {
                if group.group_id != record.disclosed_to {
                    return Err(malformed("group addendum group id mismatch"));
                }
                if group.key_ct.ct.len() != WRAPPED_KEY_LEN {
                    return Err(malformed("group addendum sealed key has wrong length"));
                }
                validate_group_wraps(&group.group_id, &group.members, &group.wraps)
            }
            _ => Err(malformed("addendum shape does not match its share kind")),
        }
    }
}

/// AAD for the content ciphertext.
pub fn content_aad(tx_id: &TxId, seller: &str, buyer: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(16 + seller.len() + buyer.len());
    aad.extend_from_slice(tx_id.as_bytes());
    aad.extend_from_slice(seller.as_bytes());
    aad.extend_from_slice(buyer.as_bytes());
    aad
}

/// AAD for a content key sealed under a group key: `tx_id || group_id`.
pub fn group_key_aad(tx_id: &TxId, group_id: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(16 + group_id.len());
    aad.extend_from_slice(tx_id.as_bytes());
    aad.extend_from_slice(group_id.as_bytes());
    aad
}

fn validate_wrap(wrap: &WrappedKey) -> Result<()> {
    if wrap.name.is_empty() {
        return Err(malformed("wrap with empty recipient name"));
    }
    if wrap.ct.len() != WRAPPED_KEY_LEN {
        return Err(malformed(format!(
            "wrap for {} has wrong ciphertext length",
            wrap.name
        )));
    }
    Ok(())
}

fn validate_group_wraps(group_id: &str, members: &[String], wraps: &[WrappedKey]) -> Result<()> {
    if group_id.is_empty() {
        return Err(malformed("group wrap set with empty group id"));
    }
    if members.len() != wraps.len() {
        return Err(malformed(format!(
            "group {group_id}: snapshot and wrap counts differ"
        )));
    }
    let mut seen = std::collections::HashSet::new();
    for (member, wrap) in members.iter().zip(wraps) {
        validate_wrap(wrap)?;
        if member != &wrap.name {
            return Err(malformed(format!(
                "group {group_id}: snapshot order diverges from wraps"
            )));
        }
        if !seen.insert(member.as_str()) {
            return Err(malformed(format!(
                "group {group_id}: duplicate member {member}"
            )));
        }
    }
    Ok(())
}

fn malformed(msg: impl Into<String>) -> CopError {
    CopError::Malformed(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AeadNonce, Ed25519Signature, Sha256Digest, X25519PublicKey};

    fn dummy_wrap(name: &str) -> WrappedKey {
        WrappedKey {
            ct: vec![0u8; WRAPPED_KEY_LEN],
            eph_pub: X25519PublicKey::from_bytes([1u8; 32]),
            name: name.to_string(),
            nonce: AeadNonce::from_bytes([2u8; 12]),
        }
    }

    fn dummy_envelope() -> Envelope {
        Envelope {
            addenda: Vec::new(),
            buyer: "Lays Chips".into(),
            buyer_sig: None,
            content_ct: vec![0u8; 32],
            content_hash: Sha256Digest::from_bytes([3u8; 32]),
            content_nonce: AeadNonce::from_bytes([4u8; 12]),
            direct_recipients: vec![dummy_wrap("Ching Chong Extractions"), dummy_wrap("Lays Chips")],
            group_recipients: Vec::new(),
            seller: "Ching Chong Extractions".into(),
            seller_sig: Ed25519Signature::from_bytes([5u8; 64]),
            tx_id: TxId::from_bytes([6u8; 16]),
            version: ENVELOPE_VERSION.into(),
        }
    }

    #[test]
    fn test_valid_structure() {
        assert!(dummy_envelope().validate_structure().is_ok());
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut env = dummy_envelope();
        env.version = "cop/0".into();
        assert!(matches!(
            env.validate_structure(),
            Err(CopError::Malformed(_))
        ));
    }

    #[test]
    fn test_duplicate_recipient_rejected() {
        let mut env = dummy_envelope();
        env.direct_recipients.push(dummy_wrap("Lays Chips"));
        assert!(env.validate_structure().is_err());
    }

    #[test]
    fn test_buyer_sig_without_buyer_rejected() {
        let mut env = dummy_envelope();
        env.buyer = String::new();
        env.buyer_sig = Some(Ed25519Signature::from_bytes([7u8; 64]));
        assert!(env.validate_structure().is_err());
    }

    #[test]
    fn test_group_snapshot_must_match_wraps() {
        let mut env = dummy_envelope();
        env.group_recipients.push(GroupWrapSet {
            group_id: "tech_partners".into(),
            members: vec!["Auditor Corp".into(), "Other Co".into()],
            wraps: vec![dummy_wrap("Auditor Corp")],
        });
        assert!(env.validate_structure().is_err());

        env.group_recipients[0].wraps.push(dummy_wrap("Mismatch"));
        assert!(env.validate_structure().is_err());

        env.group_recipients[0].wraps[1] = dummy_wrap("Other Co");
        assert!(env.validate_structure().is_ok());
    }

    #[test]
    fn test_short_wrap_ct_rejected() {
        let mut env = dummy_envelope();
        env.direct_recipients[0].ct = vec![0u8; 32];
        assert!(env.validate_structure().is_err());
    }
}
