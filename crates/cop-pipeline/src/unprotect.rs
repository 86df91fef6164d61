//! The recipient-side unprotect pipeline.
//!
//! Content-key recovery order: a direct protect-time wrap, then
//! addendum wraps (each gated on its share record verifying). A
//! protect-time group wrap alone never yields the content key; it only
//! proves entitlement to receive it from a sharer.

use bytes::Bytes;
use tracing::debug;
use zeroize::Zeroize;

use cop_core::check::check;
use cop_core::crypto::{aead_open, Sha256Digest, SymmetricKey};
use cop_core::directory::PublicKeyDirectory;
use cop_core::envelope::{group_key_aad, Envelope};
use cop_core::error::{CopError, Result};
use cop_keystore::IdentityKeyPair;

use crate::wrap::unwrap_key;

/// How a caller obtained the content key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPath {
    /// A protect-time direct wrap.
    Direct,
    /// A direct-share addendum.
    SharedDirect { sharer: String },
    /// A group-share addendum.
    SharedGroup { group_id: String, sharer: String },
}

/// The outcome of a successful unprotect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unprotected {
    /// The transaction plaintext.
    pub content: Bytes,

    /// Which wrap granted access.
    pub access: AccessPath,
}

/// Decrypt a protected envelope as the party owning `keys`.
pub fn unprotect<D>(
    envelope: &Envelope,
    keys: &IdentityKeyPair,
    directory: &D,
) -> Result<Unprotected>
where
    D: PublicKeyDirectory + ?Sized,
{
    let report = check(envelope, directory);
    if !report.envelope_well_formed {
        return Err(CopError::Malformed("envelope failed structural checks".into()));
    }
    if !report.seller_sig_valid {
        return Err(CopError::SignatureInvalid);
    }

    let (content_key, access) = recover_content_key(envelope, keys, directory)?;

    let mut plaintext = aead_open(
        &content_key,
        &envelope.content_nonce,
        &envelope.content_ct,
        &envelope.content_aad(),
    )?;
    drop(content_key);

    // Defense in depth on top of the AEAD tag.
    if !Sha256Digest::hash(&plaintext).ct_eq(&envelope.content_hash) {
        plaintext.zeroize();
        return Err(CopError::AuthFailure);
    }

    debug!(tx_id = %envelope.tx_id, party = keys.name(), ?access, "unprotected transaction");
    Ok(Unprotected {
        content: Bytes::from(plaintext),
        access,
    })
}

/// Recover the content key for the party owning `keys`, searching
/// protect-time direct wraps first, then addenda. Fails with
/// `NotARecipient` when no wrap is addressed to the party — including
/// when the party holds only a protect-time group entitlement.
pub fn recover_content_key<D>(
    envelope: &Envelope,
    keys: &IdentityKeyPair,
    directory: &D,
) -> Result<(SymmetricKey, AccessPath)>
where
    D: PublicKeyDirectory + ?Sized,
{
    let party = keys.name();

    if let Some(wrapped) = envelope.direct_wrap_for(party) {
        let key = unwrap_key(wrapped, keys.encryption())?;
        return Ok((key, AccessPath::Direct));
    }

    for addendum in &envelope.addenda {
        let record = &addendum.share_record;
        if let Some(wrapped) = &addendum.wrap {
            if wrapped.name != party {
                continue;
            }
            verify_record(envelope, record, directory)?;
            let key = unwrap_key(wrapped, keys.encryption())?;
            return Ok((
                key,
                AccessPath::SharedDirect {
                    sharer: record.sharer.clone(),
                },
            ));
        }
        if let Some(group) = &addendum.group {
            let Some(index) = group.members.iter().position(|m| m == party) else {
                continue;
            };
            let Some(wrapped) = group.wraps.get(index) else {
                continue;
            };
            verify_record(envelope, record, directory)?;
            let group_key = unwrap_key(wrapped, keys.encryption())?;
            let mut key_bytes = aead_open(
                &group_key,
                &group.key_ct.nonce,
                &group.key_ct.ct,
                &group_key_aad(&envelope.tx_id, &group.group_id),
            )?;
            drop(group_key);

            if key_bytes.len() != 32 {
                key_bytes.zeroize();
                return Err(CopError::AuthFailure);
            }
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&key_bytes);
            key_bytes.zeroize();
            let key = SymmetricKey::from_bytes(arr);
            arr.zeroize();

            return Ok((
                key,
                AccessPath::SharedGroup {
                    group_id: group.group_id.clone(),
                    sharer: record.sharer.clone(),
                },
            ));
        }
    }

    Err(CopError::NotARecipient)
}

fn verify_record<D>(
    envelope: &Envelope,
    record: &cop_core::share::ShareRecord,
    directory: &D,
) -> Result<()>
where
    D: PublicKeyDirectory + ?Sized,
{
    if record.tx_id != envelope.tx_id {
        return Err(CopError::Malformed(
            "addendum share record for different transaction".into(),
        ));
    }
    let (signing_pub, _) = directory.publics(&record.sharer)?;
    record.verify(&signing_pub)
}

/// Group ids from the protect-time wrap sets whose group key the party
/// can unwrap. Proves entitlement to receive the content key from a
/// sharer; it does not by itself decrypt anything.
pub fn prove_group_entitlement(envelope: &Envelope, keys: &IdentityKeyPair) -> Vec<String> {
    let party = keys.name();
    envelope
        .group_sets_containing(party)
        .filter_map(|set| {
            let index = set.members.iter().position(|m| m == party)?;
            unwrap_key(&set.wraps[index], keys.encryption())
                .ok()
                .map(|_| set.group_id.clone())
        })
        .collect()
}
