use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::entity::{PendingChange, Table};
use crate::domain::repository::RemoteStore;
use crate::domain::tracker::network::NetworkSignal;
use crate::domain::tracker::queue::PendingQueue;
use crate::domain::tracker::replay::{ApplyChange, ChangeOp};
use crate::tracing_report;
use crate::utils::task::ScopedTask;

/// Callbacks of a drain.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SyncListener: Send + Sync + 'static {
    /// Run after a drain delivered at least one change, typically to
    /// re-fetch authoritative state.
    async fn synced(&self);

    /// The remote store kept a queued task under another identifier.
    fn task_renamed(&self, from: &str, to: &str);
}

/// What one pass over the queue did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Changes the remote store accepted.
    pub applied: usize,
    /// Changes removed without being applied: duplicates of rows that
    /// already exist remotely, or payloads that can not be sent.
    pub dropped: usize,
    /// Changes kept for a later pass.
    pub retained: usize,
}

/// Replays the pending queue against the remote store.
///
/// At most one drain runs at a time. Changes are sent oldest first and a
/// failure does not stop the pass: later changes are still attempted and
/// the failed one keeps its place in the queue.
pub struct SyncReconciler {
    queue: Arc<PendingQueue>,
    remote: Arc<dyn RemoteStore>,
    network: NetworkSignal,
    listener: Arc<dyn SyncListener>,
    draining: AtomicBool,
}

impl SyncReconciler {
    /// Creates a new [`SyncReconciler`].
    pub fn new(
        queue: Arc<PendingQueue>,
        remote: Arc<dyn RemoteStore>,
        network: NetworkSignal,
        listener: Arc<dyn SyncListener>,
    ) -> Self {
        Self {
            queue,
            remote,
            network,
            listener,
            draining: AtomicBool::new(false),
        }
    }

    /// Run one pass over the queue. Returns `None` without doing anything
    /// if another pass is in progress.
    pub async fn drain(&self) -> Option<DrainReport> {
        let Some(latch) = DrainLatch::acquire(&self.draining) else {
            tracing::debug!("Drain already in progress");
            return None;
        };

        let attempted = self.queue.snapshot();
        let mut report = DrainReport::default();
        if attempted.is_empty() {
            return Some(report);
        }
        tracing::info!(pending = attempted.len(), "Draining pending changes");

        let mut retained: Vec<PendingChange> = Vec::new();
        let mut renames: Vec<(String, String)> = Vec::new();
        for change in &attempted {
            let mut change = change.clone();
            for (from, to) in &renames {
                change.retarget(from, to);
            }
            let op = match ChangeOp::parse(change.table, change.kind, change.data.clone()) {
                Ok(op) => op,
                Err(err) => {
                    tracing_report!(warn, err, id = %change.id, "Discarded malformed change");
                    report.dropped += 1;
                    continue;
                }
            };

            match op.apply(change.table, self.remote.as_ref()).await {
                Ok(stored) => {
                    report.applied += 1;
                    let assigned = stored.as_ref().and_then(|row| row.get("id")?.as_str());
                    if let (Some(from), Some(to)) = (change.row_id(), assigned) {
                        if from != to {
                            tracing::info!(table = %change.table, from, to, "Row renamed by remote store");
                            self.queue.retarget(from, to);
                            for kept in &mut retained {
                                kept.retarget(from, to);
                            }
                            if change.table == Table::Tasks {
                                self.listener.task_renamed(from, to);
                            }
                            renames.push((from.to_owned(), to.to_owned()));
                        }
                    }
                }
                Err(err) if err.is_duplicate() => {
                    tracing::info!(id = %change.id, table = %change.table, "Dropped duplicate change");
                    report.dropped += 1;
                }
                Err(err) => {
                    tracing::warn!(id = %change.id, table = %change.table, %err, "Kept change for retry");
                    retained.push(change);
                }
            }
        }

        report.retained = retained.len();
        self.queue.settle(&attempted, retained);
        drop(latch);

        tracing::info!(?report, "Drain finished");
        if report.applied > 0 {
            self.listener.synced().await;
        }
        Some(report)
    }

    /// Drain once if the remote store is believed reachable.
    pub async fn on_startup(&self) -> Option<DrainReport> {
        if self.network.is_online() {
            self.drain().await
        } else {
            None
        }
    }

    /// Drain every time connectivity comes back. The watch stops when the
    /// returned handle is dropped.
    ///
    /// The subscription is taken before the task is spawned, so a change
    /// published right after this call is still seen. Every wake-up that
    /// finds the signal online counts as a return: quick offline and online
    /// flips collapse into one value.
    pub fn watch(self: &Arc<Self>) -> ScopedTask {
        let reconciler = Arc::clone(self);
        let mut online = self.network.subscribe();
        online.borrow_and_update();
        ScopedTask::spawn(async move {
            while online.changed().await.is_ok() {
                let is_online = *online.borrow_and_update();
                if is_online {
                    reconciler.drain().await;
                }
            }
        })
    }
}

/// Held while a drain runs. Released on drop, so a panicking or cancelled
/// drain does not block later ones.
struct DrainLatch<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DrainLatch<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DrainLatch<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
