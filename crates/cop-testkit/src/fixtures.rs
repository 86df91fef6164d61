//! Test fixtures and helpers.
//!
//! Common setup code for pipeline and integration tests: a throwaway
//! keystore, an in-memory public-key directory, and mutable group
//! membership standing in for the group server.

use tempfile::TempDir;

use cop_keystore::{IdentityKeyPair, KeyStore, MemoryDirectory, MemoryGroups};

/// A self-contained test deployment.
pub struct TestWorld {
    _root: TempDir,
    keystore: KeyStore,
    directory: MemoryDirectory,
    groups: MemoryGroups,
}

impl TestWorld {
    /// Create an empty world with a temp-dir keystore.
    pub fn new() -> Self {
        let root = TempDir::new().expect("temp dir");
        let keystore = KeyStore::new(root.path());
        Self {
            _root: root,
            keystore,
            directory: MemoryDirectory::new(),
            groups: MemoryGroups::new(),
        }
    }

    /// Generate an identity for `name` and publish its keys.
    pub fn add_party(&mut self, name: &str) -> IdentityKeyPair {
        let identity = self.keystore.generate(name).expect("keygen");
        let (signing, encryption) = identity.publics();
        self.directory.register(name, signing, encryption);
        identity
    }

    /// Load a previously added party from the keystore.
    pub fn load_party(&self, name: &str) -> IdentityKeyPair {
        self.keystore.load(name).expect("load identity")
    }

    /// The keystore backing this world.
    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }

    /// The public-key directory.
    pub fn directory(&self) -> &MemoryDirectory {
        &self.directory
    }

    /// The group resolver.
    pub fn groups(&self) -> &MemoryGroups {
        &self.groups
    }

    /// Mutable group membership, for membership-change scenarios.
    pub fn groups_mut(&mut self) -> &mut MemoryGroups {
        &mut self.groups
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}
