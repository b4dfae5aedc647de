pub mod breaks;
pub mod cache;
pub mod network;
pub mod planner;
pub mod queue;
pub mod sync;
pub mod ticker;
pub mod timer;

mod app;
mod record;
mod replay;

#[cfg(test)]
pub(crate) mod testing;

pub use app::{Tracker, TrackerError, BREAK_TASK_ID, BREAK_TASK_NAME};
pub use breaks::{BreakTracker, FinishedBreak};
pub use cache::LocalCache;
pub use network::NetworkSignal;
pub use planner::{Delivery, Outcome, Planner, PlannerError, Source};
pub use queue::PendingQueue;
pub use replay::MalformedChange;
pub use sync::{DrainReport, SyncListener, SyncReconciler};
pub use ticker::{Stopwatch, Ticker};
pub use timer::PersistentTimer;
