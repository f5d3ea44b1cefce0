//! Storage trait and in-process implementations

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Result, StorageError};

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

/// In-memory storage (for testing and demos)
#[derive(Clone)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for InMemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let data = self.data.read().unwrap();
        Ok(data.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.data.write().unwrap();
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut data = self.data.write().unwrap();
        data.remove(key);
        Ok(())
    }
}

/// A store that rejects every operation, like local storage in a private
/// window or with quota exhausted.
#[derive(Clone, Debug, Default)]
pub struct UnreachableStorage;

impl Storage for UnreachableStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(StorageError::Unreachable("get".into()))
    }

    fn put(&self, _key: &str, _value: &str) -> Result<()> {
        Err(StorageError::Unreachable("put".into()))
    }

    fn delete(&self, _key: &str) -> Result<()> {
        Err(StorageError::Unreachable("delete".into()))
    }
}
