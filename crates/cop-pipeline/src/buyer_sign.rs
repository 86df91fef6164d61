//! Buyer counter-signature.
//!
//! The buyer signs the same canonical input the seller signed. Nothing
//! else in the envelope changes, so the seller signature stays valid.

use tracing::debug;

use cop_core::canonical::signing_input;
use cop_core::envelope::Envelope;
use cop_core::error::{CopError, Result};
use cop_keystore::IdentityKeyPair;

/// Attach (or replace) the buyer signature on an envelope.
///
/// Fails with `WrongBuyer` unless the signing identity matches the
/// envelope's buyer name.
pub fn buyer_sign(envelope: &mut Envelope, buyer_keys: &IdentityKeyPair) -> Result<()> {
    if envelope.buyer.is_empty() || envelope.buyer != buyer_keys.name() {
        return Err(CopError::WrongBuyer);
    }

    let input = signing_input(envelope)?;
    envelope.buyer_sig = Some(buyer_keys.signing().sign(&input));

    debug!(tx_id = %envelope.tx_id, buyer = buyer_keys.name(), "buyer signed");
    Ok(())
}
