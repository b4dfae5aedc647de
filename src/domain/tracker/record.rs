use std::borrow::Borrow;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::repository::KeyValueStore;
use crate::tracing_report;

/// Version written next to every stored value. Values of another version
/// read as absent.
pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Record<T> {
    version: u32,
    data: T,
}

/// A typed slot in a [`KeyValueStore`]. The whole value is written as one
/// versioned record, so related fields never get out of step.
///
/// Failures are logged and swallowed: a slot that can not be read yields
/// `None` and a failed write leaves the previous record in place.
pub struct DurableCell<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DurableCell<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a new [`DurableCell`] stored under `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    /// Read the stored value.
    pub fn load(&self) -> Option<T> {
        let raw = match self.store.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing_report!(error, err, key = self.key, "Could not read record");
                return None;
            }
        };

        match serde_json::from_str::<Record<T>>(&raw) {
            Ok(record) if record.version == RECORD_VERSION => Some(record.data),
            Ok(record) => {
                tracing::warn!(key = self.key, version = record.version, "Ignored record");
                None
            }
            Err(err) => {
                tracing::warn!(key = self.key, %err, "Ignored undecodable record");
                None
            }
        }
    }

    /// Replace the stored value. Accepts any borrowed form of `T`, such as
    /// a slice for a `Vec`.
    pub fn save<Q>(&self, data: &Q)
    where
        T: Borrow<Q>,
        Q: Serialize + ?Sized,
    {
        let record = Record {
            version: RECORD_VERSION,
            data,
        };
        let raw = match serde_json::to_string(&record) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(key = self.key, %err, "Could not encode record");
                return;
            }
        };
        if let Err(err) = self.store.set(self.key, &raw) {
            tracing_report!(error, err, key = self.key, "Could not write record");
        }
    }

    /// Remove the stored value entirely.
    pub fn clear(&self) {
        if let Err(err) = self.store.remove(self.key) {
            tracing_report!(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::repository::MemoryStore;
    use crate::domain::repository::storage::MockKeyValueStore;

    #[test]
    fn durable_cell_round_trip_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let cell = DurableCell::<Vec<u32>>::new(store.clone(), "numbers");
        assert_eq!(cell.load(), None);

        cell.save(&vec![1u32, 2, 3]);
        assert_eq!(
            store.get("numbers").unwrap().as_deref(),
            Some(r#"{"version":1,"data":[1,2,3]}"#)
        );
        assert_eq!(cell.load(), Some(vec![1, 2, 3]));

        cell.clear();
        assert_eq!(store.get("numbers").unwrap(), None);
    }

    #[test]
    fn durable_cell_ignores_corrupt_and_foreign_records() {
        let store = Arc::new(MemoryStore::new());
        let cell = DurableCell::<Vec<u32>>::new(store.clone(), "numbers");

        store.set("numbers", "{not json").unwrap();
        assert_eq!(cell.load(), None);

        store.set("numbers", r#"{"version":9,"data":[1]}"#).unwrap();
        assert_eq!(cell.load(), None);

        store.set("numbers", "[1,2]").unwrap();
        assert_eq!(cell.load(), None);
    }

    #[test]
    fn durable_cell_swallows_storage_errors() {
        let mut mock = MockKeyValueStore::new();
        mock.expect_get().returning(|_| snafu::whatever!("io"));
        mock.expect_set().returning(|_, _| snafu::whatever!("io"));
        mock.expect_remove().returning(|_| snafu::whatever!("io"));

        let cell = DurableCell::<u32>::new(Arc::new(mock), "n");
        assert_eq!(cell.load(), None);
        cell.save(&1u32);
        cell.clear();
    }
}
