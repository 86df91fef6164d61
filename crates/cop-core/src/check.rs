//! The check pipeline: structural and signature validity.
//!
//! Check never decrypts. It is a pure function of the envelope and the
//! public-key directory, and it reports the protect-time signature layer
//! and the addendum layer separately.

use crate::canonical::signing_input;
use crate::directory::PublicKeyDirectory;
use crate::envelope::Envelope;
use crate::error::ErrorKind;

/// The result of checking an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// Structural invariants and canonical form hold.
    pub envelope_well_formed: bool,

    /// Seller signature verifies over the canonical signing input.
    pub seller_sig_valid: bool,

    /// Buyer signature validity; `None` when no buyer signature exists.
    pub buyer_sig_valid: Option<bool>,

    /// Addendum validity (every addendum carries a verifying share
    /// record); `None` when the envelope has no addenda.
    pub addenda_valid: Option<bool>,

    /// Every failure kind observed, in check order.
    pub failures: Vec<ErrorKind>,
}

impl CheckReport {
    /// True when nothing failed at either layer.
    pub fn all_valid(&self) -> bool {
        self.envelope_well_formed
            && self.seller_sig_valid
            && self.buyer_sig_valid != Some(false)
            && self.addenda_valid != Some(false)
    }
}

/// Check an envelope against the public-key directory.
pub fn check<D>(envelope: &Envelope, directory: &D) -> CheckReport
where
    D: PublicKeyDirectory + ?Sized,
{
    let mut failures = Vec::new();

    if envelope.validate_structure().is_err() {
        return CheckReport {
            envelope_well_formed: false,
            seller_sig_valid: false,
            buyer_sig_valid: None,
            addenda_valid: None,
            failures: vec![ErrorKind::Malformed],
        };
    }

    let input = match signing_input(envelope) {
        Ok(input) => input,
        Err(e) => {
            return CheckReport {
                envelope_well_formed: false,
                seller_sig_valid: false,
                buyer_sig_valid: None,
                addenda_valid: None,
                failures: vec![e.kind()],
            };
        }
    };

    let seller_sig_valid = match directory.publics(&envelope.seller) {
        Ok((signing_pub, _)) => {
            let ok = signing_pub.verify(&input, &envelope.seller_sig).is_ok();
            if !ok {
                failures.push(ErrorKind::SignatureInvalid);
            }
            ok
        }
        Err(e) => {
            failures.push(e.kind());
            false
        }
    };

    let buyer_sig_valid = envelope.buyer_sig.as_ref().map(|sig| {
        match directory.publics(&envelope.buyer) {
            Ok((signing_pub, _)) => {
                let ok = signing_pub.verify(&input, sig).is_ok();
                if !ok {
                    failures.push(ErrorKind::SignatureInvalid);
                }
                ok
            }
            Err(e) => {
                failures.push(e.kind());
                false
            }
        }
    });

    let addenda_valid = if envelope.addenda.is_empty() {
        None
    } else {
        let mut all_ok = true;
        for addendum in &envelope.addenda {
            let record = &addendum.share_record;
            let ok = match directory.publics(&record.sharer) {
                Ok((signing_pub, _)) => record.verify(&signing_pub).is_ok(),
                Err(_) => false,
            };
            if !ok {
                all_ok = false;
            }
        }
        if !all_ok && !failures.contains(&ErrorKind::SignatureInvalid) {
            failures.push(ErrorKind::SignatureInvalid);
        }
        Some(all_ok)
    };

    CheckReport {
        envelope_well_formed: true,
        seller_sig_valid,
        buyer_sig_valid,
        addenda_valid,
        failures,
    }
}
