use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::prelude::*;

use crate::domain::repository::storage::{InvalidKeySnafu, KeyValueStore, StorageError};

/// A [`KeyValueStore`] keeping one file per key in a directory.
///
/// Writes go to a temporary sibling first and are moved into place, so a
/// crash never leaves a half-written value behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a new [`FileStore`] rooted at `dir`. The directory is created
    /// on first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        ensure!(valid, InvalidKeySnafu { key });
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_whatever_context(|_| format!("Could not read {}", path.display())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.dir)
            .with_whatever_context(|_| format!("Could not create {}", self.dir.display()))?;

        let temporary = path.with_extension("json.tmp");
        fs::write(&temporary, value)
            .with_whatever_context(|_| format!("Could not write {}", temporary.display()))?;
        fs::rename(&temporary, &path)
            .with_whatever_context(|_| format!("Could not replace {}", path.display()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_whatever_context(|_| format!("Could not remove {}", path.display())),
        }
    }
}
