//! Key-value storage backend.
//!
//! # Responsibility
//! - Mirror the browser-storage adapter: every row is one string value
//!   under a namespaced key.
//! - Offer an in-memory map and a single-file JSON map as storages.
//!
//! # Invariants
//! - Keys are prefixed with `canvasnote:`.
//! - `initialize` writes the sentinel last, so a crash before commit leaves
//!   the store reported as not initialized.
//! - Atomicity is per [`KeyValueStorage::commit`]; there are no transactions.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::model::concept::ConceptId;
use crate::store::backend::{
    BackendError, BackendResult, SerializedConcept, StorageBackend, WriteOp,
};

const KEY_PREFIX: &str = "canvasnote:";
const KEY_CONCEPT_INDEX: &str = "concept_index";
const KEY_SETTINGS: &str = "settings";
const KEY_VERSION: &str = "version";
const KEY_LAST_UPDATED: &str = "last_updated";
const KEY_INITIALIZED: &str = "initialized";

/// String-to-string storage with an explicit durability point.
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: String) -> BackendResult<()>;
    fn remove_item(&mut self, key: &str) -> BackendResult<()>;
    /// Makes every change since the previous commit durable.
    fn commit(&mut self) -> BackendResult<()>;
}

/// Process-local storage; nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: String) -> BackendResult<()> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> BackendResult<()> {
        self.items.remove(key);
        Ok(())
    }

    fn commit(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

/// JSON object file holding every item.
///
/// Changes are kept in memory until [`KeyValueStorage::commit`], which
/// writes a sibling temp file and renames it over the target.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
    dirty: bool,
}

impl FileStorage {
    /// Opens a storage file, starting empty if it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> BackendResult<Self> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            items,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> BackendResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: String) -> BackendResult<()> {
        self.items.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> BackendResult<()> {
        if self.items.remove(key).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn commit(&mut self) -> BackendResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("tmp");
        let json = serde_json::to_string(&self.items)?;
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        self.dirty = false;
        debug!(
            "event=kv_commit module=store status=ok path={} items={}",
            self.path.display(),
            self.items.len()
        );
        Ok(())
    }
}

/// Concept/settings rows over any [`KeyValueStorage`].
#[derive(Debug)]
pub struct KeyValueBackend<S> {
    storage: S,
}

impl<S: KeyValueStorage> KeyValueBackend<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn get(&self, key: &str) -> BackendResult<Option<String>> {
        self.storage.get_item(&namespaced(key))
    }

    fn set(&mut self, key: &str, value: String) -> BackendResult<()> {
        self.storage.set_item(&namespaced(key), value)
    }

    fn concept_index(&self) -> BackendResult<Vec<ConceptId>> {
        match self.get(KEY_CONCEPT_INDEX)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Writes one concept row and returns whether the index grew.
    fn put_concept(
        &mut self,
        index: &mut Vec<ConceptId>,
        concept: &SerializedConcept,
    ) -> BackendResult<bool> {
        self.set(&concept_key(concept.id), concept.json.clone())?;
        if index.contains(&concept.id) {
            return Ok(false);
        }
        index.push(concept.id);
        Ok(true)
    }

    fn read_number<T: std::str::FromStr>(&self, key: &str) -> BackendResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| BackendError::Corrupt(format!("invalid `{key}` value `{raw}`"))),
            None => Ok(None),
        }
    }
}

impl<S: KeyValueStorage> StorageBackend for KeyValueBackend<S> {
    fn name(&self) -> &'static str {
        "kv"
    }

    fn is_initialized(&self) -> BackendResult<bool> {
        Ok(self.get(KEY_INITIALIZED)?.is_some())
    }

    fn initialize(
        &mut self,
        settings_json: &str,
        concepts: &[SerializedConcept],
        data_version: u32,
        now_ms: i64,
    ) -> BackendResult<()> {
        let mut index = self.concept_index()?;
        for concept in concepts {
            self.put_concept(&mut index, concept)?;
        }
        self.set(KEY_CONCEPT_INDEX, serde_json::to_string(&index)?)?;
        self.set(KEY_SETTINGS, settings_json.to_string())?;
        self.set(KEY_VERSION, data_version.to_string())?;
        self.set(KEY_LAST_UPDATED, now_ms.to_string())?;
        self.set(KEY_INITIALIZED, "true".to_string())?;
        self.storage.commit()
    }

    fn read_concept(&self, id: ConceptId) -> BackendResult<Option<String>> {
        self.get(&concept_key(id))
    }

    fn read_all_concepts(&self) -> BackendResult<Vec<String>> {
        let mut rows = Vec::new();
        for id in self.concept_index()? {
            match self.get(&concept_key(id))? {
                Some(raw) => rows.push(raw),
                None => {
                    return Err(BackendError::Corrupt(format!(
                        "concept index names missing row {id}"
                    )))
                }
            }
        }
        Ok(rows)
    }

    fn read_settings(&self) -> BackendResult<Option<String>> {
        self.get(KEY_SETTINGS)
    }

    fn write_batch(&mut self, ops: &[WriteOp], now_ms: i64) -> BackendResult<()> {
        let mut index = self.concept_index()?;
        let mut index_changed = false;
        for op in ops {
            match op {
                WriteOp::PutConcept(concept) => {
                    index_changed |= self.put_concept(&mut index, concept)?;
                }
                WriteOp::PutSettings(json) => self.set(KEY_SETTINGS, json.clone())?,
            }
        }
        if index_changed {
            self.set(KEY_CONCEPT_INDEX, serde_json::to_string(&index)?)?;
        }
        self.set(KEY_LAST_UPDATED, now_ms.to_string())?;
        self.storage.commit()
    }

    fn read_version(&self) -> BackendResult<Option<u32>> {
        self.read_number(KEY_VERSION)
    }

    fn write_version(&mut self, version: u32) -> BackendResult<()> {
        self.set(KEY_VERSION, version.to_string())?;
        self.storage.commit()
    }

    fn read_last_updated(&self) -> BackendResult<Option<i64>> {
        self.read_number(KEY_LAST_UPDATED)
    }
}

fn namespaced(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

fn concept_key(id: ConceptId) -> String {
    format!("concept:{id}")
}

#[cfg(test)]
mod tests {
    use super::{FileStorage, KeyValueBackend, KeyValueStorage, MemoryStorage};
    use crate::store::backend::{BackendError, SerializedConcept, StorageBackend, WriteOp};
    use uuid::Uuid;

    fn row(id: Uuid, json: &str) -> SerializedConcept {
        SerializedConcept {
            id,
            kind: "text".to_string(),
            json: json.to_string(),
        }
    }

    #[test]
    fn keys_are_namespaced() {
        let mut backend = KeyValueBackend::new(MemoryStorage::new());
        backend.initialize("{}", &[], 1, 0).unwrap();
        let storage = backend.into_storage();
        assert_eq!(
            storage.get_item("canvasnote:initialized").unwrap().as_deref(),
            Some("true")
        );
        assert!(storage.get_item("initialized").unwrap().is_none());
    }

    #[test]
    fn index_tracks_insertion_order_without_duplicates() {
        let mut backend = KeyValueBackend::new(MemoryStorage::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        backend.initialize("{}", &[row(a, "\"a\"")], 1, 0).unwrap();
        backend
            .write_batch(
                &[WriteOp::PutConcept(row(b, "\"b\"")), WriteOp::PutConcept(row(a, "\"a2\""))],
                5,
            )
            .unwrap();

        assert_eq!(
            backend.read_all_concepts().unwrap(),
            vec!["\"a2\"".to_string(), "\"b\"".to_string()]
        );
        assert_eq!(backend.read_last_updated().unwrap(), Some(5));
    }

    #[test]
    fn dangling_index_entry_is_reported_corrupt() {
        let mut storage = MemoryStorage::new();
        storage
            .set_item(
                "canvasnote:concept_index",
                format!("[\"{}\"]", Uuid::new_v4()),
            )
            .unwrap();
        let backend = KeyValueBackend::new(storage);
        assert!(matches!(
            backend.read_all_concepts(),
            Err(BackendError::Corrupt(_))
        ));
    }

    #[test]
    fn file_storage_persists_only_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut storage = FileStorage::open(&path).unwrap();
        storage.set_item("k", "v".to_string()).unwrap();
        assert!(!path.exists());
        storage.commit().unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("k").unwrap().as_deref(), Some("v"));
    }
}
