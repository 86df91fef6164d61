//! Public-key directory implementations.
//!
//! The directory is read-only from the core's viewpoint; registration
//! happens out of band (keygen time). `MemoryDirectory` backs tests,
//! `FileDirectory` backs the CLI with a single JSON document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cop_core::canonical::b64;
use cop_core::crypto::{Ed25519PublicKey, X25519PublicKey};
use cop_core::directory::PublicKeyDirectory;
use cop_core::error::{CopError, Result};

/// In-memory directory, primarily for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryDirectory {
    entries: BTreeMap<String, (Ed25519PublicKey, X25519PublicKey)>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a party's public keys.
    pub fn register(&mut self, name: &str, signing: Ed25519PublicKey, encryption: X25519PublicKey) {
        self.entries.insert(name.to_string(), (signing, encryption));
    }

    /// Names of all registered parties.
    pub fn parties(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl PublicKeyDirectory for MemoryDirectory {
    fn publics(&self, name: &str) -> Result<(Ed25519PublicKey, X25519PublicKey)> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| CopError::UnknownParty(name.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
struct DirectoryEntry {
    enc_pub: String,
    sign_pub: String,
}

/// Directory backed by one JSON file (`public_keys.json` in the demo
/// deployments). Loaded eagerly; `register` rewrites the file.
pub struct FileDirectory {
    path: PathBuf,
    entries: BTreeMap<String, (Ed25519PublicKey, X25519PublicKey)>,
}

impl FileDirectory {
    /// Open a directory file; a missing file yields an empty directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut entries = BTreeMap::new();
        if path.exists() {
            let json = fs::read(&path).map_err(io_err)?;
            let raw: BTreeMap<String, DirectoryEntry> =
                serde_json::from_slice(&json).map_err(|e| CopError::KeyStoreFailure(e.to_string()))?;
            for (name, entry) in raw {
                entries.insert(
                    name,
                    (
                        Ed25519PublicKey::from_bytes(decode32(&entry.sign_pub)?),
                        X25519PublicKey::from_bytes(decode32(&entry.enc_pub)?),
                    ),
                );
            }
        }
        Ok(Self { path, entries })
    }

    /// The backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register a party and persist the directory.
    pub fn register(
        &mut self,
        name: &str,
        signing: Ed25519PublicKey,
        encryption: X25519PublicKey,
    ) -> Result<()> {
        self.entries.insert(name.to_string(), (signing, encryption));
        self.save()
    }

    fn save(&self) -> Result<()> {
        let raw: BTreeMap<&str, DirectoryEntry> = self
            .entries
            .iter()
            .map(|(name, (sign, enc))| {
                (
                    name.as_str(),
                    DirectoryEntry {
                        enc_pub: b64::encode(enc.as_bytes()),
                        sign_pub: b64::encode(sign.as_bytes()),
                    },
                )
            })
            .collect();
        let json =
            serde_json::to_vec_pretty(&raw).map_err(|e| CopError::KeyStoreFailure(e.to_string()))?;
        fs::write(&self.path, json).map_err(io_err)
    }
}

impl PublicKeyDirectory for FileDirectory {
    fn publics(&self, name: &str) -> Result<(Ed25519PublicKey, X25519PublicKey)> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| CopError::UnknownParty(name.to_string()))
    }
}

fn decode32(s: &str) -> Result<[u8; 32]> {
    let bytes = b64::decode(s).map_err(|e| CopError::KeyStoreFailure(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CopError::KeyStoreFailure("public key has wrong length".into()))
}

fn io_err(e: std::io::Error) -> CopError {
    CopError::KeyStoreFailure(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_directory_lookup() {
        let mut dir = MemoryDirectory::new();
        dir.register(
            "Auditor Corp",
            Ed25519PublicKey::from_bytes([1u8; 32]),
            X25519PublicKey::from_bytes([2u8; 32]),
        );

        assert!(dir.publics("Auditor Corp").is_ok());
        assert!(matches!(
            dir.publics("Random Co"),
            Err(CopError::UnknownParty(_))
        ));
    }

    #[test]
    fn test_file_directory_roundtrip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("public_keys.json");

        let mut dir = FileDirectory::open(&path).unwrap();
        dir.register(
            "Lays Chips",
            Ed25519PublicKey::from_bytes([3u8; 32]),
            X25519PublicKey::from_bytes([4u8; 32]),
        )
        .unwrap();

        let reopened = FileDirectory::open(&path).unwrap();
        let (sign, enc) = reopened.publics("Lays Chips").unwrap();
        assert_eq!(sign.as_bytes(), &[3u8; 32]);
        assert_eq!(enc.as_bytes(), &[4u8; 32]);
    }
}
