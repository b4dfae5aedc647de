use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::domain::entity::{ChangeKind, PendingChange, Row, Table};
use crate::domain::repository::{Clock, KeyValueStore};
use crate::domain::tracker::record::DurableCell;

pub const PENDING_KEY: &str = "pending_changes";

/// The durable log of mutations waiting for the remote store, oldest first.
///
/// The log is read and rewritten as a whole on every operation.
pub struct PendingQueue {
    cell: DurableCell<Vec<PendingChange>>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl PendingQueue {
    /// Creates a new [`PendingQueue`] on top of `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cell: DurableCell::new(store, PENDING_KEY),
            clock,
            lock: Mutex::new(()),
        }
    }

    /// Append a change to the end of the log.
    #[tracing::instrument(skip(self, data))]
    pub fn enqueue(&self, table: Table, kind: ChangeKind, data: Row) -> PendingChange {
        let _guard = self.guard();
        let change = PendingChange::new(table, kind, data, self.clock.now());
        let mut changes = self.load();
        changes.push(change.clone());
        self.cell.save(&changes);
        tracing::info!(id = %change.id, pending = changes.len(), "Queued change");
        change
    }

    /// All queued changes, oldest first.
    pub fn snapshot(&self) -> Vec<PendingChange> {
        let _guard = self.guard();
        self.load()
    }

    /// Number of queued changes.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write back the outcome of a drain. `attempted` lists the changes the
    /// drain took from the log and `retained` the ones among them to keep.
    /// Changes appended while the drain was running stay behind `retained`.
    pub fn settle(&self, attempted: &[PendingChange], retained: Vec<PendingChange>) {
        let _guard = self.guard();
        let attempted: HashSet<Uuid> = attempted.iter().map(|change| change.id).collect();
        let mut changes = retained;
        changes.extend(
            self.load()
                .into_iter()
                .filter(|change| !attempted.contains(&change.id)),
        );
        self.cell.save(&changes);
    }

    /// Rewrite queued references from one row identifier to another.
    pub fn retarget(&self, from: &str, to: &str) {
        let _guard = self.guard();
        let mut changes = self.load();
        let mut changed = false;
        for change in &mut changes {
            changed |= change.retarget(from, to);
        }
        if changed {
            self.cell.save(&changes);
        }
    }

    fn load(&self) -> Vec<PendingChange> {
        self.cell.load().unwrap_or_default()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
