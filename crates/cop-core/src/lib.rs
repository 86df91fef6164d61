//! # ChainOfProduct Core
//!
//! Pure cryptographic machinery for protected supply-chain transaction
//! documents: typed primitives, the canonical envelope codec, and the
//! check pipeline.
//!
//! This crate contains no I/O, no storage, no networking. The protect /
//! unprotect / share pipelines live in `cop-pipeline`; key persistence
//! lives in `cop-keystore`.
//!
//! ## Key Types
//!
//! - [`Envelope`] - The protected-document structure
//! - [`TxId`] - 128-bit random transaction identifier
//! - [`WrappedKey`] - A key encrypted to one recipient (ephemeral ECDH +
//!   HKDF + AES-256-GCM)
//! - [`ShareRecord`] - A signed disclosure receipt
//!
//! ## Canonicalization
//!
//! All signatures cover canonical JSON bytes. See [`canonical`].

pub mod canonical;
pub mod check;
pub mod crypto;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod share;
pub mod types;

pub use canonical::{
    parse_envelope, parse_share_record, share_record_signing_digest, share_record_to_bytes,
    signing_input, to_canonical_bytes,
};
pub use check::{check, CheckReport};
pub use crypto::{
    aead_open, aead_seal, hkdf32, random_bytes, AeadNonce, Ed25519PublicKey, Ed25519Signature,
    EphemeralKeyPair, Sha256Digest, SharedPoint, SigningKeypair, SymmetricKey, X25519PublicKey,
    X25519StaticSecret,
};
pub use directory::{GroupInfo, GroupResolver, PublicKeyDirectory};
pub use envelope::{
    content_aad, group_key_aad, Addendum, Envelope, GroupAddendum, GroupWrapSet, SealedKey,
    WrappedKey, ENVELOPE_VERSION, WRAPPED_KEY_LEN,
};
pub use error::{CopError, ErrorKind, Result};
pub use share::{ShareKind, ShareRecord};
pub use types::TxId;
