//! Error types for the ChainOfProduct core.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the protection pipelines and their collaborators.
///
/// `SignatureInvalid` and `AuthFailure` deliberately share one display
/// string: untrusted callers must not be able to tell a failed signature
/// from a failed AEAD tag by message text.
#[derive(Debug, Error)]
pub enum CopError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("cryptographic verification failed")]
    SignatureInvalid,

    #[error("cryptographic verification failed")]
    AuthFailure,

    #[error("no wrapped key available for caller")]
    NotARecipient,

    #[error("unknown party: {0}")]
    UnknownParty(String),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("keystore failure: {0}")]
    KeyStoreFailure(String),

    #[error("system randomness unavailable")]
    RandomnessFailure,

    #[error("buyer name does not match envelope")]
    WrongBuyer,

    #[error("identity already exists: {0}")]
    AlreadyExists(String),
}

/// Discriminant-only view of [`CopError`], used in check reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Malformed,
    SignatureInvalid,
    AuthFailure,
    NotARecipient,
    UnknownParty,
    UnknownGroup,
    KeyStoreFailure,
    RandomnessFailure,
    WrongBuyer,
    AlreadyExists,
}

impl CopError {
    /// The kind of this error, with all context stripped.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CopError::Malformed(_) => ErrorKind::Malformed,
            CopError::SignatureInvalid => ErrorKind::SignatureInvalid,
            CopError::AuthFailure => ErrorKind::AuthFailure,
            CopError::NotARecipient => ErrorKind::NotARecipient,
            CopError::UnknownParty(_) => ErrorKind::UnknownParty,
            CopError::UnknownGroup(_) => ErrorKind::UnknownGroup,
            CopError::KeyStoreFailure(_) => ErrorKind::KeyStoreFailure,
            CopError::RandomnessFailure => ErrorKind::RandomnessFailure,
            CopError::WrongBuyer => ErrorKind::WrongBuyer,
            CopError::AlreadyExists(_) => ErrorKind::AlreadyExists,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Malformed => "malformed",
            ErrorKind::SignatureInvalid => "signature_invalid",
            ErrorKind::AuthFailure => "auth_failure",
            ErrorKind::NotARecipient => "not_a_recipient",
            ErrorKind::UnknownParty => "unknown_party",
            ErrorKind::UnknownGroup => "unknown_group",
            ErrorKind::KeyStoreFailure => "keystore_failure",
            ErrorKind::RandomnessFailure => "randomness_failure",
            ErrorKind::WrongBuyer => "wrong_buyer",
            ErrorKind::AlreadyExists => "already_exists",
        };
        f.write_str(s)
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CopError>;
