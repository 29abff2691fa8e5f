//! Key-value persistence for the registry
//! Layout: one JSON object, `{ "<key>": { "schema_version": 1, ... } }`

use crate::registration::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SCHEMA_VERSION: u32 = 1;

/// Get/set string interface over JSON-serializable values. No atomicity across keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: HashMap<String, String>,
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Keeps every key in a single JSON file, read once on open and rewritten
/// in full after each change.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl FileKeyValueStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(data) if data.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(data) => serde_json::from_slice(&data).map_err(|source| StorageError::Corrupt {
                key: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No data file at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        info!("Opened data file {} ({} keys)", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StorageError::Encode {
                key: self.path.display().to_string(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(Value::to_string)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        let value: Value = serde_json::from_str(&value).map_err(|source| StorageError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct VersionedRef<'a, T> {
    schema_version: u32,
    #[serde(flatten)]
    body: &'a T,
}

/// Reads the typed document stored under `key`. `Ok(None)` when the key is absent;
/// malformed JSON or an unknown schema version is an error, never an empty document.
pub fn load_document<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = store.get(key) else {
        return Ok(None);
    };

    let corrupt = |source| StorageError::Corrupt {
        key: key.to_string(),
        source,
    };
    let value: Value = serde_json::from_str(&raw).map_err(corrupt)?;

    let found = value
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if found != u64::from(SCHEMA_VERSION) {
        return Err(StorageError::UnsupportedSchema {
            key: key.to_string(),
            found,
            expected: SCHEMA_VERSION,
        });
    }

    // `schema_version` is an unknown field to `T` and is skipped.
    let doc = serde_json::from_value(value).map_err(corrupt)?;
    Ok(Some(doc))
}

pub fn save_document<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    body: &T,
) -> Result<(), StorageError> {
    let doc = VersionedRef {
        schema_version: SCHEMA_VERSION,
        body,
    };
    let json = serde_json::to_string(&doc).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, json)
}

#[cfg(test)]
pub(crate) fn temp_data_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("mototaxi-registry-{}", uuid::Uuid::new_v4()))
        .join("registry.json")
}
