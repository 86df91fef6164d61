//! File-backed identity keystore.
//!
//! Each party owns one directory under the keystore root holding an
//! `identity.json` with both key pairs and an integrity digest. The
//! digest is verified on every load so that on-disk corruption surfaces
//! as `KeyStoreFailure` instead of garbage keys. Secrets never leave
//! this module except inside an [`IdentityKeyPair`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use zeroize::Zeroize;

use cop_core::canonical::b64;
use cop_core::crypto::{
    Ed25519PublicKey, Sha256Digest, SigningKeypair, X25519PublicKey, X25519StaticSecret,
};
use cop_core::error::{CopError, Result};

const IDENTITY_FILE: &str = "identity.json";

/// A party's long-term identity: one signing pair, one encryption pair.
pub struct IdentityKeyPair {
    name: String,
    signing: SigningKeypair,
    encryption: X25519StaticSecret,
}

impl IdentityKeyPair {
    /// The party this identity belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The Ed25519 signing keypair.
    pub fn signing(&self) -> &SigningKeypair {
        &self.signing
    }

    /// The X25519 encryption secret.
    pub fn encryption(&self) -> &X25519StaticSecret {
        &self.encryption
    }

    /// Both public keys, in directory-registration form.
    pub fn publics(&self) -> (Ed25519PublicKey, X25519PublicKey) {
        (self.signing.public_key(), self.encryption.public_key())
    }
}

/// On-disk form of an identity. Secrets are base64url; `digest` is a
/// SHA-256 over the four key fields, checked on load.
#[derive(Serialize, Deserialize)]
struct StoredIdentity {
    digest: String,
    enc_priv: String,
    enc_pub: String,
    sign_priv: String,
    sign_pub: String,
}

/// Persists identities under one root directory, one party per subdir.
pub struct KeyStore {
    root: PathBuf,
}

impl KeyStore {
    /// Open a keystore rooted at `root`. The directory is created lazily
    /// on first `generate`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The keystore root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh identity for `name`. Fails with `AlreadyExists`
    /// if the party already has one; existing keys are never replaced.
    pub fn generate(&self, name: &str) -> Result<IdentityKeyPair> {
        validate_name(name)?;
        let path = self.identity_path(name);
        if path.exists() {
            return Err(CopError::AlreadyExists(name.to_string()));
        }

        let signing = SigningKeypair::generate()?;
        let encryption = X25519StaticSecret::generate()?;
        let identity = IdentityKeyPair {
            name: name.to_string(),
            signing,
            encryption,
        };

        fs::create_dir_all(path.parent().expect("identity path has a parent"))
            .map_err(keystore_io)?;
        let stored = encode_identity(&identity);
        let json = serde_json::to_vec_pretty(&stored).map_err(|e| keystore(e.to_string()))?;
        fs::write(&path, json).map_err(keystore_io)?;

        debug!(party = name, "generated identity");
        Ok(identity)
    }

    /// Load an identity. Fails with `UnknownParty` when none exists and
    /// `KeyStoreFailure` when the stored bytes fail their integrity
    /// check.
    pub fn load(&self, name: &str) -> Result<IdentityKeyPair> {
        validate_name(name)?;
        let path = self.identity_path(name);
        if !path.exists() {
            return Err(CopError::UnknownParty(name.to_string()));
        }

        let json = fs::read(&path).map_err(keystore_io)?;
        let stored: StoredIdentity =
            serde_json::from_slice(&json).map_err(|e| keystore(e.to_string()))?;
        decode_identity(name, &stored)
    }

    /// A party's public keys, for directory registration.
    pub fn publics(&self, name: &str) -> Result<(Ed25519PublicKey, X25519PublicKey)> {
        Ok(self.load(name)?.publics())
    }

    /// Names of all parties with a stored identity.
    pub fn parties(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.root.exists() {
            return Ok(names);
        }
        for entry in fs::read_dir(&self.root).map_err(keystore_io)? {
            let entry = entry.map_err(keystore_io)?;
            if entry.path().join(IDENTITY_FILE).exists() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn identity_path(&self, name: &str) -> PathBuf {
        self.root.join(name).join(IDENTITY_FILE)
    }
}

fn encode_identity(identity: &IdentityKeyPair) -> StoredIdentity {
    let mut sign_priv = identity.signing.seed();
    let mut enc_priv = identity.encryption.to_bytes();
    let (sign_pub, enc_pub) = identity.publics();

    let stored = StoredIdentity {
        digest: integrity_digest(&sign_priv, &enc_priv, &sign_pub, &enc_pub).to_hex(),
        enc_priv: b64::encode(&enc_priv),
        enc_pub: b64::encode(enc_pub.as_bytes()),
        sign_priv: b64::encode(&sign_priv),
        sign_pub: b64::encode(sign_pub.as_bytes()),
    };
    sign_priv.zeroize();
    enc_priv.zeroize();
    stored
}

fn decode_identity(name: &str, stored: &StoredIdentity) -> Result<IdentityKeyPair> {
    let mut sign_priv = decode_key32(&stored.sign_priv)?;
    let mut enc_priv = decode_key32(&stored.enc_priv)?;
    let sign_pub = Ed25519PublicKey::from_bytes(decode_key32(&stored.sign_pub)?);
    let enc_pub = X25519PublicKey::from_bytes(decode_key32(&stored.enc_pub)?);

    let expected = integrity_digest(&sign_priv, &enc_priv, &sign_pub, &enc_pub).to_hex();
    if expected != stored.digest {
        sign_priv.zeroize();
        enc_priv.zeroize();
        return Err(keystore(format!("integrity check failed for {name}")));
    }

    let signing = SigningKeypair::from_seed(&sign_priv);
    let encryption = X25519StaticSecret::from_bytes(enc_priv);
    sign_priv.zeroize();
    enc_priv.zeroize();

    // The stored publics must match the ones the secrets derive.
    if signing.public_key() != sign_pub || encryption.public_key() != enc_pub {
        return Err(keystore(format!("public keys diverge for {name}")));
    }

    Ok(IdentityKeyPair {
        name: name.to_string(),
        signing,
        encryption,
    })
}

fn integrity_digest(
    sign_priv: &[u8; 32],
    enc_priv: &[u8; 32],
    sign_pub: &Ed25519PublicKey,
    enc_pub: &X25519PublicKey,
) -> Sha256Digest {
    let mut buf = Vec::with_capacity(128);
    buf.extend_from_slice(sign_priv);
    buf.extend_from_slice(enc_priv);
    buf.extend_from_slice(sign_pub.as_bytes());
    buf.extend_from_slice(enc_pub.as_bytes());
    let digest = Sha256Digest::hash(&buf);
    buf.zeroize();
    digest
}

fn decode_key32(s: &str) -> Result<[u8; 32]> {
    let bytes = b64::decode(s).map_err(|e| keystore(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| keystore("key field has wrong length".to_string()))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(keystore(format!("invalid party name: {name:?}")));
    }
    Ok(())
}

fn keystore(msg: String) -> CopError {
    CopError::KeyStoreFailure(msg)
}

fn keystore_io(e: std::io::Error) -> CopError {
    CopError::KeyStoreFailure(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_generate_load_roundtrip() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path());

        let generated = store.generate("Ching Chong Extractions").unwrap();
        let loaded = store.load("Ching Chong Extractions").unwrap();

        assert_eq!(generated.publics(), loaded.publics());
        assert_eq!(loaded.name(), "Ching Chong Extractions");
    }

    #[test]
    fn test_generate_twice_fails() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path());

        store.generate("Lays Chips").unwrap();
        assert!(matches!(
            store.generate("Lays Chips"),
            Err(CopError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_load_missing_party() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        assert!(matches!(
            store.load("Nobody Inc"),
            Err(CopError::UnknownParty(_))
        ));
    }

    #[test]
    fn test_corruption_detected() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        store.generate("Lays Chips").unwrap();

        let path = dir.path().join("Lays Chips").join(IDENTITY_FILE);
        let text = std::fs::read_to_string(&path).unwrap();
        let mut stored: StoredIdentity = serde_json::from_str(&text).unwrap();
        let mut bytes = b64::decode(&stored.enc_priv).unwrap();
        bytes[0] ^= 0x01;
        stored.enc_priv = b64::encode(&bytes);
        std::fs::write(&path, serde_json::to_vec_pretty(&stored).unwrap()).unwrap();

        assert!(matches!(
            store.load("Lays Chips"),
            Err(CopError::KeyStoreFailure(_))
        ));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        for bad in ["", "../escape", "a/b", ".hidden"] {
            assert!(store.generate(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parties_listing() {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        store.generate("B Co").unwrap();
        store.generate("A Co").unwrap();
        assert_eq!(store.parties().unwrap(), vec!["A Co", "B Co"]);
    }
}
