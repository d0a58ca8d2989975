//! JSON file storage backend

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use super::{Backend, Error};

/// Storage persisted to a JSON object of string values
///
/// Reads are served from memory. Every change re-reads the file, applies itself and rewrites the
/// whole file: written next to the target first and then renamed over it, so a crash never leaves
/// a truncated file behind.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Opens storage at `path`. A missing or empty file is an empty storage.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let values = read(&path)?;

        debug!(path = %path.display(), keys = values.len(), "Storage file opened");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Storage file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies a change and persists it; memory is only updated once the file is written
    ///
    /// The change is applied on top of the file as it is on disk, so keys written by another
    /// process since the last update are kept.
    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> Option<String>,
    ) -> Result<Option<String>, Error> {
        let mut values = self.values.write();
        let mut updated = read(&self.path)?;
        let previous = change(&mut updated);

        self.persist(&updated)?;
        *values = updated;
        Ok(previous)
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Reads a storage file. A missing or blank file is an empty storage.
fn read(path: &Path) -> Result<BTreeMap<String, String>, Error> {
    match fs::read(path) {
        Ok(content) if content.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(content) => Ok(serde_json::from_slice(&content)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(err) => Err(err.into()),
    }
}

impl Backend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<Option<String>, Error> {
        self.update(|values| values.insert(key.to_owned(), value.to_owned()))
    }

    fn remove(&self, key: &str) -> Result<Option<String>, Error> {
        self.update(|values| values.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::open(dir.path().join("storage.json")).unwrap();
        assert_eq!(backend.get("token").unwrap(), None);
        assert!(!backend.path().exists());
    }

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.set("token", "t1").unwrap(), None);
        assert_eq!(backend.set("role", "ADMIN").unwrap(), None);
        assert_eq!(backend.set("role", "GUEST").unwrap().as_deref(), Some("ADMIN"));
        assert_eq!(backend.remove("token").unwrap().as_deref(), Some("t1"));
        drop(backend);

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.get("role").unwrap().as_deref(), Some("GUEST"));
        assert_eq!(backend.get("token").unwrap(), None);

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());
    }

    #[test]
    fn keeps_keys_written_by_other_process() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let first = FileBackend::open(&path).unwrap();
        let second = FileBackend::open(&path).unwrap();
        first.set("email", "jane@example.com").unwrap();
        second.set("token", "t1").unwrap();
        assert_eq!(first.remove("role").unwrap(), None);

        let reopened = FileBackend::open(&path).unwrap();
        assert_eq!(reopened.get("email").unwrap().as_deref(), Some("jane@example.com"));
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("t1"));
        assert_eq!(first.get("token").unwrap().as_deref(), Some("t1"));
    }

    #[test]
    fn empty_file_is_empty_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "\n").unwrap();

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.get("token").unwrap(), None);
    }

    #[test]
    fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(FileBackend::open(&path), Err(Error::Malformed(_))));
    }
}
