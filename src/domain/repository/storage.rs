use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Mutex, MutexGuard, PoisonError};

use snafu::prelude::*;

/// An abstract interface for durable client-side key/value storage.
///
/// All operations are synchronous. Values are opaque strings; callers decide
/// the encoding.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the storage could not be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing the previous value as a whole.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value could not be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value stored under `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// This function will return an error if the value could not be removed.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// An error type of accessing a [`KeyValueStore`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub))]
pub enum StorageError {
    #[snafu(display("Could not use invalid storage key {key:?}"))]
    #[non_exhaustive]
    InvalidKey { key: String },
    #[snafu(whatever, display("Storage access failed: {message}"))]
    #[non_exhaustive]
    Unknown {
        message: String,
        #[snafu(source(from(Box<dyn StdError + Send + Sync>, Some)))]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

/// A [`KeyValueStore`] kept in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates a new empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}
