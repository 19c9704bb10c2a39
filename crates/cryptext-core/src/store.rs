//! Stored keys
//!
//! A key entry holds the shared secret a keyset is derived from. The secret
//! is either stored as-is or wrapped by a [`SecretSealer`] (for example under
//! a passphrase), in which case `wrapped` is set and the material must be
//! unsealed before use.
//!
//! File format (JSON, material base64):
//! ```text
//! { "keys": [ { "id": "…", "name": "…", "material": "…", "wrapped": false, "revoked": false } ] }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptextError, CryptextResult};

/// One stored key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub id: String,
    pub name: String,
    #[serde(with = "material_base64")]
    pub material: Vec<u8>,
    /// Material is sealed and must go through a [`SecretSealer`].
    #[serde(default)]
    pub wrapped: bool,
    #[serde(default)]
    pub revoked: bool,
    /// Key that replaces this one, once replacement messages exist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement_id: Option<String>,
}

impl KeyEntry {
    /// New entry with a random id.
    pub fn new(name: &str, material: Vec<u8>, wrapped: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            material,
            wrapped,
            revoked: false,
            replacement_id: None,
        }
    }
}

impl Drop for KeyEntry {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

impl std::fmt::Debug for KeyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("material", &format_args!("[REDACTED; {} bytes]", self.material.len()))
            .field("wrapped", &self.wrapped)
            .field("revoked", &self.revoked)
            .field("replacement_id", &self.replacement_id)
            .finish()
    }
}

mod material_base64 {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = Zeroizing::new(String::deserialize(d)?);
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}

/// Persistent collection of key entries.
pub trait KeyStore {
    fn get(&self, id: &str) -> Option<&KeyEntry>;

    /// Add a new entry and return its id. Ids and names must be unique.
    fn add(&mut self, entry: KeyEntry) -> CryptextResult<String>;

    /// Replace the entry with the same id.
    fn update(&mut self, entry: KeyEntry) -> CryptextResult<()>;

    fn delete(&mut self, id: &str) -> CryptextResult<()>;

    fn list(&self) -> &[KeyEntry];

    fn find_by_name(&self, name: &str) -> Option<&KeyEntry> {
        self.list().iter().find(|e| e.name == name)
    }

    /// Look up by id first, then by name.
    fn lookup(&self, id_or_name: &str) -> CryptextResult<&KeyEntry> {
        self.get(id_or_name)
            .or_else(|| self.find_by_name(id_or_name))
            .ok_or_else(|| CryptextError::KeyNotFound(id_or_name.to_string()))
    }
}

/// In-memory store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryKeyStore {
    keys: Vec<KeyEntry>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn get(&self, id: &str) -> Option<&KeyEntry> {
        self.keys.iter().find(|e| e.id == id)
    }

    fn add(&mut self, entry: KeyEntry) -> CryptextResult<String> {
        if self.get(&entry.id).is_some() {
            return Err(CryptextError::Store(format!("duplicate key id {}", entry.id)));
        }
        if self.find_by_name(&entry.name).is_some() {
            return Err(CryptextError::Store(format!(
                "a key named '{}' already exists",
                entry.name
            )));
        }
        let id = entry.id.clone();
        self.keys.push(entry);
        Ok(id)
    }

    fn update(&mut self, entry: KeyEntry) -> CryptextResult<()> {
        let slot = self
            .keys
            .iter_mut()
            .find(|e| e.id == entry.id)
            .ok_or_else(|| CryptextError::KeyNotFound(entry.id.clone()))?;
        *slot = entry;
        Ok(())
    }

    fn delete(&mut self, id: &str) -> CryptextResult<()> {
        let before = self.keys.len();
        self.keys.retain(|e| e.id != id);
        if self.keys.len() == before {
            return Err(CryptextError::KeyNotFound(id.to_string()));
        }
        Ok(())
    }

    fn list(&self) -> &[KeyEntry] {
        &self.keys
    }
}

/// JSON-file store. Every change is written back immediately.
#[derive(Debug)]
pub struct JsonKeyStore {
    path: PathBuf,
    inner: MemoryKeyStore,
}

impl JsonKeyStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> CryptextResult<Self> {
        let inner = if path.exists() {
            let content = Zeroizing::new(std::fs::read_to_string(path)?);
            serde_json::from_str(&content)
                .map_err(|e| CryptextError::Store(format!("parsing {}: {e}", path.display())))?
        } else {
            MemoryKeyStore::default()
        };
        tracing::debug!(path = %path.display(), keys = inner.keys.len(), "opened key store");
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> CryptextResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = Zeroizing::new(
            serde_json::to_string_pretty(&self.inner)
                .map_err(|e| CryptextError::Store(format!("serializing key store: {e}")))?,
        );
        std::fs::write(&self.path, json.as_bytes())?;
        Ok(())
    }
}

impl KeyStore for JsonKeyStore {
    fn get(&self, id: &str) -> Option<&KeyEntry> {
        self.inner.get(id)
    }

    fn add(&mut self, entry: KeyEntry) -> CryptextResult<String> {
        let id = self.inner.add(entry)?;
        self.save()?;
        Ok(id)
    }

    fn update(&mut self, entry: KeyEntry) -> CryptextResult<()> {
        self.inner.update(entry)?;
        self.save()
    }

    fn delete(&mut self, id: &str) -> CryptextResult<()> {
        self.inner.delete(id)?;
        self.save()
    }

    fn list(&self) -> &[KeyEntry] {
        self.inner.list()
    }
}

/// Wraps and unwraps stored key material.
pub trait SecretSealer {
    fn seal(&self, identifier: &str, secret: &[u8]) -> CryptextResult<Vec<u8>>;

    fn unseal(&self, identifier: &str, wrapped: &[u8]) -> CryptextResult<Zeroizing<Vec<u8>>>;
}

/// Raw key bytes for `entry`, unsealing wrapped material with `sealer`.
pub fn resolve_key_material(
    entry: &KeyEntry,
    sealer: Option<&dyn SecretSealer>,
) -> CryptextResult<Zeroizing<Vec<u8>>> {
    if !entry.wrapped {
        return Ok(Zeroizing::new(entry.material.clone()));
    }
    let sealer = sealer.ok_or_else(|| {
        CryptextError::Seal(format!("key '{}' is sealed and no sealer is available", entry.name))
    })?;
    sealer.unseal(&entry.id, &entry.material)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// XORs with a byte derived from the identifier.
    struct XorSealer;

    impl XorSealer {
        fn mask(identifier: &str) -> u8 {
            identifier.bytes().fold(0x5A, |acc, b| acc ^ b) | 1
        }
    }

    impl SecretSealer for XorSealer {
        fn seal(&self, identifier: &str, secret: &[u8]) -> CryptextResult<Vec<u8>> {
            let m = Self::mask(identifier);
            Ok(secret.iter().map(|b| b ^ m).collect())
        }

        fn unseal(&self, identifier: &str, wrapped: &[u8]) -> CryptextResult<Zeroizing<Vec<u8>>> {
            let m = Self::mask(identifier);
            Ok(Zeroizing::new(wrapped.iter().map(|b| b ^ m).collect()))
        }
    }

    #[test]
    fn test_add_get_find() {
        let mut store = MemoryKeyStore::new();
        let entry = KeyEntry::new("alice", vec![1; 32], false);
        let expected = entry.id.clone();
        let id = store.add(entry).unwrap();
        assert_eq!(id, expected);

        assert_eq!(store.get(&id).unwrap().name, "alice");
        assert_eq!(store.find_by_name("alice").unwrap().id, id);
        assert_eq!(store.lookup("alice").unwrap().id, id);
        assert_eq!(store.lookup(&id).unwrap().name, "alice");
        assert!(matches!(store.lookup("bob"), Err(CryptextError::KeyNotFound(_))));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut store = MemoryKeyStore::new();
        store.add(KeyEntry::new("alice", vec![1; 32], false)).unwrap();
        let err = store.add(KeyEntry::new("alice", vec![2; 32], false));
        assert!(matches!(err, Err(CryptextError::Store(_))));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_update_and_delete() {
        let mut store = MemoryKeyStore::new();
        let entry = KeyEntry::new("alice", vec![1; 32], false);
        let id = entry.id.clone();
        store.add(entry).unwrap();

        let mut revoked = store.get(&id).unwrap().clone();
        revoked.revoked = true;
        store.update(revoked).unwrap();
        assert!(store.get(&id).unwrap().revoked);

        store.delete(&id).unwrap();
        assert!(store.list().is_empty());
        assert!(matches!(store.delete(&id), Err(CryptextError::KeyNotFound(_))));
    }

    #[test]
    fn test_update_unknown_id() {
        let mut store = MemoryKeyStore::new();
        let err = store.update(KeyEntry::new("ghost", vec![], false));
        assert!(matches!(err, Err(CryptextError::KeyNotFound(_))));
    }

    #[test]
    fn test_json_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("keys.json");

        let id = {
            let mut store = JsonKeyStore::open(&path).unwrap();
            assert!(store.list().is_empty());
            store.add(KeyEntry::new("alice", vec![7; 32], false)).unwrap()
        };

        let store = JsonKeyStore::open(&path).unwrap();
        let entry = store.get(&id).unwrap();
        assert_eq!(entry.name, "alice");
        assert_eq!(entry.material, vec![7; 32]);
        assert!(!entry.wrapped);
    }

    #[test]
    fn test_json_material_is_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let mut store = JsonKeyStore::open(&path).unwrap();
        store.add(KeyEntry::new("k", b"hello".to_vec(), false)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"aGVsbG8=\""));
        assert!(!raw.contains("replacement_id"));
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonKeyStore::open(&path), Err(CryptextError::Store(_))));
    }

    #[test]
    fn test_debug_redacts_material() {
        let entry = KeyEntry::new("alice", vec![0xAB; 4], false);
        let debug = format!("{entry:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("[171"));
    }

    #[test]
    fn test_resolve_plain_material() {
        let entry = KeyEntry::new("plain", vec![3; 32], false);
        let bytes = resolve_key_material(&entry, None).unwrap();
        assert_eq!(bytes.as_slice(), &[3; 32]);
    }

    #[test]
    fn test_resolve_wrapped_material() {
        let mut entry = KeyEntry::new("sealed", Vec::new(), true);
        entry.material = XorSealer.seal(&entry.id, &[9; 32]).unwrap();
        assert_ne!(entry.material, vec![9; 32]);

        let bytes = resolve_key_material(&entry, Some(&XorSealer as &dyn SecretSealer)).unwrap();
        assert_eq!(bytes.as_slice(), &[9; 32]);
    }

    #[test]
    fn test_resolve_wrapped_without_sealer() {
        let entry = KeyEntry::new("sealed", vec![1; 40], true);
        assert!(matches!(
            resolve_key_material(&entry, None),
            Err(CryptextError::Seal(_))
        ));
    }
}
