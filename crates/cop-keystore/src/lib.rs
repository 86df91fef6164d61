//! # ChainOfProduct Keystore
//!
//! Key persistence and the read-only lookup collaborators:
//!
//! - [`KeyStore`] - a party's long-term identity key pairs on disk, with
//!   an integrity digest checked on load
//! - [`MemoryDirectory`] / [`FileDirectory`] - public-key directory
//!   implementations
//! - [`MemoryGroups`] / [`FileGroups`] - group-resolver implementations

pub mod directory;
pub mod groups;
pub mod keystore;

pub use directory::{FileDirectory, MemoryDirectory};
pub use groups::{FileGroups, MemoryGroups};
pub use keystore::{IdentityKeyPair, KeyStore};
