//! Disclosure: building addenda, signing share records, seller audit.
//!
//! A sharer must already hold the content key (as a recipient or prior
//! sharee). Every disclosure is attributed: the addendum carries a
//! share record signed by the sharer, and the seller can later verify
//! the full disclosure list.

use chrono::{DateTime, Utc};
use tracing::debug;

use cop_core::crypto::{aead_seal, AeadNonce};
use cop_core::directory::{GroupResolver, PublicKeyDirectory};
use cop_core::envelope::{group_key_aad, Addendum, Envelope, GroupAddendum, SealedKey};
use cop_core::error::{CopError, ErrorKind, Result};
use cop_core::share::{ShareKind, ShareRecord};
use cop_core::share_record_signing_digest;
use cop_core::types::TxId;
use cop_keystore::IdentityKeyPair;

use crate::unprotect::recover_content_key;
use crate::wrap::{derive_group_key, wrap_key};

/// A disclosing party. Keeps the last issued timestamp so the record
/// sequence stays non-decreasing even if the wall clock steps back.
pub struct Sharer<'a> {
    keys: &'a IdentityKeyPair,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<'a> Sharer<'a> {
    pub fn new(keys: &'a IdentityKeyPair) -> Self {
        Self {
            keys,
            last_timestamp: None,
        }
    }

    /// Disclose to one named party: rewrap the content key for them and
    /// sign the accompanying record.
    pub fn share_direct<D>(
        &mut self,
        envelope: &Envelope,
        recipient: &str,
        directory: &D,
        now: DateTime<Utc>,
    ) -> Result<Addendum>
    where
        D: PublicKeyDirectory + ?Sized,
    {
        let (_, recipient_enc) = directory.publics(recipient)?;
        let (content_key, _) = recover_content_key(envelope, self.keys, directory)?;
        let wrap = wrap_key(&content_key, recipient, &recipient_enc)?;
        drop(content_key);

        let record = self.sign_record(&envelope.tx_id, recipient, ShareKind::Direct, now)?;
        debug!(tx_id = %envelope.tx_id, sharer = self.keys.name(), recipient, "direct share");
        Ok(Addendum {
            group: None,
            share_record: record,
            wrap: Some(wrap),
        })
    }

    /// Disclose to a group: snapshot its membership now, wrap the
    /// derived group key for each member, and seal the content key
    /// under the group key so members can reach the plaintext.
    pub fn share_group<D, G>(
        &mut self,
        envelope: &Envelope,
        group_id: &str,
        directory: &D,
        resolver: &G,
        now: DateTime<Utc>,
    ) -> Result<Addendum>
    where
        D: PublicKeyDirectory + ?Sized,
        G: GroupResolver + ?Sized,
    {
        let members = resolver.snapshot(group_id)?;
        let (content_key, _) = recover_content_key(envelope, self.keys, directory)?;
        let group_key = derive_group_key(&content_key, &envelope.tx_id, group_id);

        let mut wraps = Vec::with_capacity(members.len());
        for member in &members {
            let (_, enc_pub) = directory.publics(member)?;
            wraps.push(wrap_key(&group_key, member, &enc_pub)?);
        }

        let nonce = AeadNonce::generate()?;
        let ct = aead_seal(
            &group_key,
            &nonce,
            content_key.as_bytes(),
            &group_key_aad(&envelope.tx_id, group_id),
        )?;
        drop(group_key);
        drop(content_key);

        let record = self.sign_record(&envelope.tx_id, group_id, ShareKind::Group, now)?;
        debug!(
            tx_id = %envelope.tx_id,
            sharer = self.keys.name(),
            group_id,
            members = members.len(),
            "group share"
        );
        Ok(Addendum {
            group: Some(GroupAddendum {
                group_id: group_id.to_string(),
                key_ct: SealedKey { ct, nonce },
                members,
                wraps,
            }),
            share_record: record,
            wrap: None,
        })
    }

    fn sign_record(
        &mut self,
        tx_id: &TxId,
        disclosed_to: &str,
        kind: ShareKind,
        now: DateTime<Utc>,
    ) -> Result<ShareRecord> {
        let timestamp = match self.last_timestamp {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let mut record = ShareRecord {
            disclosed_to: disclosed_to.to_string(),
            kind,
            sharer: self.keys.name().to_string(),
            sig: cop_core::crypto::Ed25519Signature::from_bytes([0u8; 64]),
            timestamp,
            tx_id: *tx_id,
        };
        let digest = share_record_signing_digest(&record)?;
        record.sig = self.keys.signing().sign(digest.as_bytes());
        Ok(record)
    }
}

/// Append an addendum to an envelope, as the application server does.
/// The share record must verify and the combined envelope must stay
/// structurally valid; on any failure the envelope is left unchanged.
pub fn apply_addendum<D>(envelope: &mut Envelope, addendum: Addendum, directory: &D) -> Result<()>
where
    D: PublicKeyDirectory + ?Sized,
{
    let record = &addendum.share_record;
    if record.tx_id != envelope.tx_id {
        return Err(CopError::Malformed(
            "addendum share record for different transaction".into(),
        ));
    }
    let (signing_pub, _) = directory.publics(&record.sharer)?;
    record.verify(&signing_pub)?;

    envelope.addenda.push(addendum);
    if let Err(e) = envelope.validate_structure() {
        envelope.addenda.pop();
        return Err(e);
    }
    Ok(())
}

/// One verified disclosure, as reconstructed during audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    pub sharer: String,
    pub disclosed_to: String,
    pub kind: ShareKind,
    pub timestamp: DateTime<Utc>,
}

/// The seller-side audit result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    /// Disclosures whose records verified, in record order.
    pub disclosures: Vec<Disclosure>,

    /// Indices of rejected records with the failure kind.
    pub rejected: Vec<(usize, ErrorKind)>,
}

impl AuditReport {
    /// True when every submitted record verified.
    pub fn all_verified(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Verify every share record for a transaction and reconstruct the
/// disclosure list.
pub fn audit_shares<D>(tx_id: &TxId, records: &[ShareRecord], directory: &D) -> AuditReport
where
    D: PublicKeyDirectory + ?Sized,
{
    let mut disclosures = Vec::new();
    let mut rejected = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if record.tx_id != *tx_id {
            rejected.push((index, ErrorKind::Malformed));
            continue;
        }
        let verified = directory
            .publics(&record.sharer)
            .and_then(|(signing_pub, _)| record.verify(&signing_pub));
        match verified {
            Ok(()) => disclosures.push(Disclosure {
                sharer: record.sharer.clone(),
                disclosed_to: record.disclosed_to.clone(),
                kind: record.kind,
                timestamp: record.timestamp,
            }),
            Err(e) => rejected.push((index, e.kind())),
        }
    }

    AuditReport {
        disclosures,
        rejected,
    }
}
