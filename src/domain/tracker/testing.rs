use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use snafu::ensure;

use crate::adapter::repository::Tables;
use crate::domain::entity::{EpochMillis, Row, Table};
use crate::domain::repository::remote::{RemoteError, UnreachableSnafu};
use crate::domain::repository::{Clock, RemoteStore};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: EpochMillis) -> Arc<Self> {
        Arc::new(Self {
            now: AtomicI64::new(now),
        })
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> EpochMillis {
        self.now.load(Ordering::SeqCst)
    }
}

/// An in-memory remote store that can be switched off and can hand out its
/// own row identifiers.
#[derive(Debug, Default)]
pub struct FakeRemote {
    tables: Mutex<Tables>,
    unreachable: AtomicBool,
    reassign_ids: AtomicBool,
    writes: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Ignore client identifiers on insert.
    pub fn reassign_ids(&self, reassign: bool) {
        self.reassign_ids.store(reassign, Ordering::SeqCst);
    }

    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.tables().rows(table).to_vec()
    }

    pub fn column(&self, table: Table, column: &str) -> Vec<Value> {
        self.rows(table)
            .iter()
            .map(|row| row.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Number of write requests that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn reach(&self) -> Result<(), RemoteError> {
        ensure!(
            !self.unreachable.load(Ordering::SeqCst),
            UnreachableSnafu { endpoint: "fake" }
        );
        Ok(())
    }

    fn write(&self) -> Result<MutexGuard<'_, Tables>, RemoteError> {
        self.reach()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.tables())
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl RemoteStore for FakeRemote {
    async fn fetch(&self, table: Table, user_id: String) -> Result<Vec<Row>, RemoteError> {
        self.reach()?;
        Ok(self.tables().fetch(table, &user_id))
    }

    async fn insert(&self, table: Table, mut row: Row) -> Result<Row, RemoteError> {
        let mut tables = self.write()?;
        if self.reassign_ids.load(Ordering::SeqCst) {
            row.remove("id");
        }
        tables.insert(table, row)
    }

    async fn update(&self, table: Table, id: String, columns: Row) -> Result<(), RemoteError> {
        self.write()?.update(table, &id, columns);
        Ok(())
    }

    async fn delete(&self, table: Table, id: String) -> Result<(), RemoteError> {
        self.write()?.delete(table, &id);
        Ok(())
    }

    async fn upsert(&self, table: Table, key: Vec<String>, row: Row) -> Result<(), RemoteError> {
        self.write()?.upsert(table, &key, row);
        Ok(())
    }
}
