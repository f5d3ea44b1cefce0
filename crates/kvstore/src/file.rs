use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::warn;

use crate::{Result, Storage, StorageError};

/// JSON-file backed storage.
///
/// The whole map is held in memory and rewritten on every mutation
/// (write to `<path>.tmp`, then rename), so a crash mid-write leaves the
/// previous file intact.
pub struct FileBackedStorage {
    path: PathBuf,
    data: RwLock<BTreeMap<String, String>>,
}

impl FileBackedStorage {
    /// Opens `path`, creating an empty store if the file does not exist yet.
    ///
    /// A file that does not parse is treated as empty; the next write
    /// replaces it.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "discarding unreadable store file"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &BTreeMap<String, String>) -> Result<()> {
        let bytes =
            serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileBackedStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let data = self
            .data
            .read()
            .map_err(|_| StorageError::Unreachable("lock poisoned".into()))?;
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Unreachable("lock poisoned".into()))?;

        let previous = data.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush(&data) {
            // keep memory and disk in agreement
            match previous {
                Some(v) => data.insert(key.to_string(), v),
                None => data.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut data = self
            .data
            .write()
            .map_err(|_| StorageError::Unreachable("lock poisoned".into()))?;

        if data.remove(key).is_some() {
            self.flush(&data)?;
        }
        Ok(())
    }
}
