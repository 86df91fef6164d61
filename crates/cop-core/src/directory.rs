//! Read-only collaborator interfaces.
//!
//! The public-key directory and the group server are external services;
//! the core only ever reads from them. Implementations must return
//! consistent snapshots for the duration of one protect or share call.

use crate::crypto::{Ed25519PublicKey, X25519PublicKey};
use crate::error::Result;

/// Maps a party name to its published key pair.
pub trait PublicKeyDirectory {
    /// Look up the signing and encryption public keys for a party.
    /// Fails with `UnknownParty` when the name is not registered.
    fn publics(&self, name: &str) -> Result<(Ed25519PublicKey, X25519PublicKey)>;
}

/// Resolves dynamic-group membership at a moment in time.
pub trait GroupResolver {
    /// The ordered member list of a group, as of this call.
    /// Fails with `UnknownGroup` when the id is not registered.
    fn snapshot(&self, group_id: &str) -> Result<Vec<String>>;

    /// Group metadata.
    fn info(&self, group_id: &str) -> Result<GroupInfo>;
}

/// Metadata about a group, as reported by the group server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub group_id: String,
    pub member_count: usize,
}
