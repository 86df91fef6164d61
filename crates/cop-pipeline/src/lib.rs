//! # ChainOfProduct Pipelines
//!
//! The seller, buyer, and recipient-side operations over protected
//! envelopes:
//!
//! - [`protect`] - encrypt, wrap for recipients and groups, sign
//! - [`unprotect`] - recover the content key and decrypt
//! - [`buyer_sign`] - attach the buyer counter-signature
//! - [`Sharer`] / [`audit_shares`] - attributed disclosure and the
//!   seller-side audit over share records
//!
//! All pipelines are pure apart from CSPRNG use: they take the
//! keystore-loaded identity and the read-only directory/resolver views
//! as arguments, expose no suspension points, and never return partial
//! envelopes. The check pipeline lives in `cop-core` and is re-exported
//! here for convenience.

pub mod buyer_sign;
pub mod protect;
pub mod share;
pub mod unprotect;
pub mod wrap;

pub use buyer_sign::buyer_sign;
pub use cop_core::check::{check, CheckReport};
pub use protect::{protect, protect_checked, ProtectRequest};
pub use share::{apply_addendum, audit_shares, AuditReport, Disclosure, Sharer};
pub use unprotect::{
    prove_group_entitlement, recover_content_key, unprotect, AccessPath, Unprotected,
};
pub use wrap::{derive_group_key, unwrap_key, wrap_key, WRAP_INFO};
