//! In-memory storage backend

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{Backend, Error};

/// Storage living only as long as the process
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    /// Backend pre-filled with values
    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<Option<String>, Error> {
        Ok(self.values.write().insert(key.to_owned(), value.to_owned()))
    }

    fn remove(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.write().remove(key))
    }
}
