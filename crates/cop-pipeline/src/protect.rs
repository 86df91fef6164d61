//! The seller-side protect pipeline.
//!
//! Encrypts the transaction once under a fresh content key, wraps that
//! key for every named recipient, wraps a derived group key for every
//! member of every addressed group, and signs the canonical result.
//! No partial envelope is ever observable: the envelope is assembled
//! locally and returned only after the seller signature is attached.

use tracing::debug;

use cop_core::canonical::signing_input;
use cop_core::crypto::{AeadNonce, Ed25519Signature, Sha256Digest, SymmetricKey};
use cop_core::directory::{GroupResolver, PublicKeyDirectory};
use cop_core::envelope::{content_aad, Envelope, GroupWrapSet, WrappedKey, ENVELOPE_VERSION};
use cop_core::error::{CopError, Result};
use cop_core::types::TxId;
use cop_core::{aead_seal, check};
use cop_keystore::IdentityKeyPair;

use crate::wrap::{derive_group_key, wrap_key};

/// Addressing for one protect call.
#[derive(Debug, Clone, Default)]
pub struct ProtectRequest {
    /// Buyer name; empty when no buyer is attached yet.
    pub buyer: String,

    /// Additional named recipients, beyond seller and buyer.
    pub recipients: Vec<String>,

    /// Groups to disclose to (entitlement wraps at protect time).
    pub groups: Vec<String>,
}

/// Protect a transaction. `seller_keys` must be the seller's identity
/// loaded from the keystore; its name becomes the envelope's seller.
pub fn protect<D, G>(
    content: &[u8],
    seller_keys: &IdentityKeyPair,
    request: &ProtectRequest,
    directory: &D,
    resolver: &G,
) -> Result<Envelope>
where
    D: PublicKeyDirectory + ?Sized,
    G: GroupResolver + ?Sized,
{
    let seller = seller_keys.name();
    let tx_id = TxId::generate()?;
    let content_key = SymmetricKey::generate()?;
    let content_nonce = AeadNonce::generate()?;

    let aad = content_aad(&tx_id, seller, &request.buyer);
    let content_ct = aead_seal(&content_key, &content_nonce, content, &aad)?;
    let content_hash = Sha256Digest::hash(content);

    let direct_recipients = wrap_for_direct(&content_key, seller, request, directory)?;
    let group_recipients = wrap_for_groups(&content_key, &tx_id, request, directory, resolver)?;

    let mut envelope = Envelope {
        addenda: Vec::new(),
        buyer: request.buyer.clone(),
        buyer_sig: None,
        content_ct,
        content_hash,
        content_nonce,
        direct_recipients,
        group_recipients,
        seller: seller.to_string(),
        seller_sig: Ed25519Signature::from_bytes([0u8; 64]),
        tx_id,
        version: ENVELOPE_VERSION.to_string(),
    };

    let input = signing_input(&envelope)?;
    envelope.seller_sig = seller_keys.signing().sign(&input);

    debug!(
        tx_id = %envelope.tx_id,
        recipients = envelope.direct_recipients.len(),
        groups = envelope.group_recipients.len(),
        "protected transaction"
    );
    Ok(envelope)
}

/// Recipient order: seller first, buyer second (when named), then the
/// requested recipients in their given order, deduplicated.
fn wrap_for_direct<D>(
    content_key: &SymmetricKey,
    seller: &str,
    request: &ProtectRequest,
    directory: &D,
) -> Result<Vec<WrappedKey>>
where
    D: PublicKeyDirectory + ?Sized,
{
    let mut names: Vec<&str> = vec![seller];
    if !request.buyer.is_empty() {
        names.push(&request.buyer);
    }
    names.extend(request.recipients.iter().map(String::as_str));

    let mut wraps = Vec::with_capacity(names.len());
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            continue;
        }
        let (_, enc_pub) = directory.publics(name)?;
        wraps.push(wrap_key(content_key, name, &enc_pub)?);
    }
    Ok(wraps)
}

fn wrap_for_groups<D, G>(
    content_key: &SymmetricKey,
    tx_id: &TxId,
    request: &ProtectRequest,
    directory: &D,
    resolver: &G,
) -> Result<Vec<GroupWrapSet>>
where
    D: PublicKeyDirectory + ?Sized,
    G: GroupResolver + ?Sized,
{
    let mut sets = Vec::with_capacity(request.groups.len());
    for group_id in &request.groups {
        let members = resolver.snapshot(group_id)?;
        let group_key = derive_group_key(content_key, tx_id, group_id);

        let mut wraps = Vec::with_capacity(members.len());
        for member in &members {
            // A member without published keys fails the whole protect;
            // silently skipping would hide it from the snapshot.
            let (_, enc_pub) = directory.publics(member)?;
            wraps.push(wrap_key(&group_key, member, &enc_pub)?);
        }

        sets.push(GroupWrapSet {
            group_id: group_id.clone(),
            members,
            wraps,
        });
    }
    Ok(sets)
}

/// Convenience used by callers that want protect-and-verify in one step.
pub fn protect_checked<D, G>(
    content: &[u8],
    seller_keys: &IdentityKeyPair,
    request: &ProtectRequest,
    directory: &D,
    resolver: &G,
) -> Result<Envelope>
where
    D: PublicKeyDirectory + ?Sized,
    G: GroupResolver + ?Sized,
{
    let envelope = protect(content, seller_keys, request, directory, resolver)?;
    let report = check(&envelope, directory);
    if !report.all_valid() {
        return Err(CopError::Malformed(
            "freshly protected envelope failed check".into(),
        ));
    }
    Ok(envelope)
}
