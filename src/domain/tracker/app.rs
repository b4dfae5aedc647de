use std::sync::Arc;

use chrono::NaiveDate;
use snafu::prelude::*;

use crate::domain::entity::{EpochMillis, SessionDraft, SessionDuration, SessionKind, TaskDraft};
use crate::domain::repository::{local_day, Clock, KeyValueStore, RemoteStore};
use crate::domain::tracker::breaks::BreakTracker;
use crate::domain::tracker::cache::LocalCache;
use crate::domain::tracker::network::NetworkSignal;
use crate::domain::tracker::planner::{Outcome, Planner, PlannerError, Source};
use crate::domain::tracker::queue::PendingQueue;
use crate::domain::tracker::sync::{SyncListener, SyncReconciler};
use crate::domain::tracker::timer::PersistentTimer;
use crate::utils::task::ScopedTask;

/// Task identifier recorded on break sessions taken without an active task.
pub const BREAK_TASK_ID: &str = "break";
pub const BREAK_TASK_NAME: &str = "Break";

/// Entrance to the tracker, owning every service and the workday flows
/// that combine them.
pub struct Tracker {
    pub timer: Arc<PersistentTimer>,
    pub breaks: Arc<BreakTracker>,
    pub planner: Arc<Planner>,
    pub queue: Arc<PendingQueue>,
    pub sync: Arc<SyncReconciler>,
    pub network: NetworkSignal,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    /// Wire the tracker on top of external repositories. Timer and break
    /// state are recovered from `store` right away.
    pub fn new(
        user_id: String,
        store: Arc<dyn KeyValueStore>,
        remote: Arc<dyn RemoteStore>,
        network: NetworkSignal,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timer = Arc::new(PersistentTimer::recover(Arc::clone(&store), Arc::clone(&clock)));
        let breaks = Arc::new(BreakTracker::recover(Arc::clone(&store), Arc::clone(&clock)));
        let queue = Arc::new(PendingQueue::new(Arc::clone(&store), Arc::clone(&clock)));
        let planner = Arc::new(Planner::new(
            user_id,
            Arc::clone(&remote),
            Arc::clone(&queue),
            LocalCache::new(store),
            network.clone(),
        ));
        let listener: Arc<dyn SyncListener> = Arc::new(Followers {
            planner: Arc::clone(&planner),
            timer: Arc::clone(&timer),
        });
        let sync = Arc::new(SyncReconciler::new(
            Arc::clone(&queue),
            remote,
            network.clone(),
            listener,
        ));

        Self {
            timer,
            breaks,
            planner,
            queue,
            sync,
            network,
            clock,
        }
    }

    /// Load the collections and send whatever is still queued.
    pub async fn open(&self) -> Source {
        let source = self.planner.refresh().await;
        self.sync.on_startup().await;
        source
    }

    /// The local calendar day right now.
    pub fn today(&self) -> NaiveDate {
        local_day(self.clock.now())
    }

    /// Drain the queue whenever connectivity returns, for as long as the
    /// returned handle lives.
    pub fn watch_sync(&self) -> ScopedTask {
        self.sync.watch()
    }

    /// Create a task. A running timer follows the task if the remote store
    /// renames it.
    ///
    /// # Errors
    ///
    /// This function will return an error if the task can not be encoded.
    pub async fn add_task(&self, draft: TaskDraft) -> Result<Outcome, TrackerError> {
        let outcome = self.planner.add_task(draft).await.context(PlannerSnafu)?;
        if let Outcome::Confirmed {
            id,
            renamed_from: Some(from),
        } = &outcome
        {
            self.timer.rename_task(from, id);
        }
        Ok(outcome)
    }

    /// Start timing a task. A running break is ended and an unsaved work
    /// interval is recorded first.
    ///
    /// # Errors
    ///
    /// This function will return an error if the task is unknown or a
    /// session can not be recorded.
    #[tracing::instrument(skip(self))]
    pub async fn start_work(&self, task_id: &str) -> Result<(), TrackerError> {
        let task = self
            .planner
            .task(task_id)
            .context(UnknownTaskSnafu { id: task_id })?;
        self.end_break().await?;
        self.finish_work().await?;
        self.timer.start(task.id, task.name);
        Ok(())
    }

    /// Stop the timer, record the interval as a work session if it is not
    /// empty and clear the timer.
    ///
    /// # Errors
    ///
    /// This function will return an error if the session can not be recorded.
    #[tracing::instrument(skip(self))]
    pub async fn finish_work(&self) -> Result<Option<Outcome>, TrackerError> {
        let state = self.timer.snapshot();
        let seconds = self.timer.stop();
        self.timer.reset();
        self.record(
            SessionKind::Work,
            state.current_task_id,
            state.current_task_name.unwrap_or_default(),
            state.started_at,
            seconds,
        )
        .await
    }

    /// Finish the current interval and mark its task completed today.
    ///
    /// # Errors
    ///
    /// This function will return an error if the session or the completion
    /// can not be recorded.
    #[tracing::instrument(skip(self))]
    pub async fn complete_task(&self) -> Result<Option<Outcome>, TrackerError> {
        let task_id = self.timer.snapshot().current_task_id;
        let recorded = self.finish_work().await?;
        if let Some(task_id) = task_id {
            self.planner
                .set_task_completed(&task_id, self.today(), true)
                .await
                .context(PlannerSnafu)?;
        }
        Ok(recorded)
    }

    /// Record the current work interval and begin a break. Does nothing
    /// while a break is already running.
    ///
    /// # Errors
    ///
    /// This function will return an error if the work session can not be
    /// recorded.
    #[tracing::instrument(skip(self))]
    pub async fn start_break(&self) -> Result<Option<Outcome>, TrackerError> {
        if self.breaks.is_on_break() {
            return Ok(None);
        }
        let task_id = self.timer.snapshot().current_task_id;
        let recorded = self.finish_work().await?;
        self.breaks.start(task_id);
        Ok(recorded)
    }

    /// End the running break and record it as a break session if it is not
    /// empty.
    ///
    /// # Errors
    ///
    /// This function will return an error if the session can not be recorded.
    #[tracing::instrument(skip(self))]
    pub async fn end_break(&self) -> Result<Option<Outcome>, TrackerError> {
        let Some(ended) = self.breaks.end() else {
            return Ok(None);
        };
        let task_id = ended
            .state
            .task_id
            .unwrap_or_else(|| BREAK_TASK_ID.to_owned());
        self.record(
            SessionKind::Break,
            Some(task_id),
            BREAK_TASK_NAME.to_owned(),
            Some(ended.state.break_start),
            ended.seconds,
        )
        .await
    }

    async fn record(
        &self,
        kind: SessionKind,
        task_id: Option<String>,
        task_name: String,
        started_at: Option<EpochMillis>,
        seconds: u64,
    ) -> Result<Option<Outcome>, TrackerError> {
        let Ok(duration) = SessionDuration::try_new(seconds) else {
            tracing::debug!(%kind, "Skipped empty session");
            return Ok(None);
        };
        let timestamp =
            started_at.unwrap_or_else(|| self.clock.now() - (seconds as EpochMillis) * 1000);
        let draft = SessionDraft {
            task_id,
            task_name,
            date: local_day(timestamp),
            duration,
            kind,
            timestamp,
        };
        let outcome = self.planner.add_session(draft).await.context(PlannerSnafu)?;
        tracing::info!(%kind, seconds, id = outcome.id(), "Recorded session");
        Ok(Some(outcome))
    }
}

/// Keeps the planner and the timer in step with what a drain delivered.
struct Followers {
    planner: Arc<Planner>,
    timer: Arc<PersistentTimer>,
}

#[async_trait::async_trait]
impl SyncListener for Followers {
    async fn synced(&self) {
        self.planner.refresh().await;
    }

    fn task_renamed(&self, from: &str, to: &str) {
        self.planner.rename_task(from, to);
        self.timer.rename_task(from, to);
    }
}

/// An error type of the workday flows.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum TrackerError {
    #[snafu(display("Could not find task {id}"))]
    #[non_exhaustive]
    UnknownTask { id: String },
    #[snafu(display("Could not save the change"))]
    #[non_exhaustive]
    Planner { source: PlannerError },
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::time::Duration;

    use crate::domain::entity::{Table, TimerState};
    use crate::domain::repository::MemoryStore;
    use crate::domain::tracker::testing::{FakeRemote, ManualClock};
    use crate::domain::tracker::timer::TIMER_KEY;

    const T0: EpochMillis = 1_700_000_000_000;

    struct Fixture {
        store: Arc<MemoryStore>,
        remote: Arc<FakeRemote>,
        clock: Arc<ManualClock>,
        network: NetworkSignal,
        tracker: Tracker,
    }

    fn fixture(online: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let remote = FakeRemote::new();
        remote.set_reachable(online);
        let clock = ManualClock::new(T0);
        let network = NetworkSignal::new(online);
        let tracker = Tracker::new(
            "u".into(),
            store.clone(),
            remote.clone(),
            network.clone(),
            clock.clone(),
        );
        Fixture {
            store,
            remote,
            clock,
            network,
            tracker,
        }
    }

    #[tokio::test]
    async fn work_interval_becomes_session() {
        let f = fixture(true);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        f.tracker.start_work(task.id()).await.unwrap();
        assert!(f.tracker.timer.is_running());

        f.clock.advance(125_000);
        let outcome = f.tracker.finish_work().await.unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Confirmed { .. }));

        let session = &f.tracker.planner.sessions()[0];
        assert_eq!(session.duration.seconds(), 125);
        assert_eq!(session.kind, SessionKind::Work);
        assert_eq!(session.task_id.as_deref(), Some(task.id()));
        assert_eq!(session.task_name, "Study");
        assert_eq!(session.timestamp, T0);
        assert_eq!(session.date, local_day(T0));
        assert_eq!(f.remote.rows(Table::Sessions).len(), 1);

        assert_eq!(f.tracker.timer.snapshot(), TimerState::default());
        let reloaded = PersistentTimer::recover(f.store.clone(), f.clock.clone());
        assert_eq!(reloaded.snapshot(), TimerState::default());
    }

    #[tokio::test]
    async fn empty_interval_records_nothing() {
        let f = fixture(true);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        f.tracker.start_work(task.id()).await.unwrap();
        f.clock.advance(999);
        assert_eq!(f.tracker.finish_work().await.unwrap(), None);
        assert!(f.tracker.planner.sessions().is_empty());
    }

    #[tokio::test]
    async fn start_work_unknown_task() {
        let f = fixture(true);
        assert!(matches!(
            f.tracker.start_work("missing").await,
            Err(TrackerError::UnknownTask { .. })
        ));
    }

    #[tokio::test]
    async fn break_flow() {
        let f = fixture(true);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        f.tracker.start_work(task.id()).await.unwrap();

        f.clock.advance(60_000);
        let work = f.tracker.start_break().await.unwrap();
        assert!(work.is_some());
        assert!(!f.tracker.timer.is_running());
        assert!(f.tracker.breaks.is_on_break());
        assert_eq!(f.tracker.start_break().await.unwrap(), None);

        f.clock.advance(30_000);
        f.tracker.end_break().await.unwrap().unwrap();
        assert_eq!(f.tracker.end_break().await.unwrap(), None);

        let sessions = f.tracker.planner.sessions();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].kind, SessionKind::Break);
        assert_eq!(sessions[0].duration.seconds(), 30);
        assert_eq!(sessions[0].task_id.as_deref(), Some(task.id()));
        assert_eq!(sessions[0].task_name, BREAK_TASK_NAME);
        assert_eq!(sessions[1].duration.seconds(), 60);
    }

    #[tokio::test]
    async fn break_without_task_and_start_work_ends_break() {
        let f = fixture(true);
        assert_eq!(f.tracker.start_break().await.unwrap(), None);
        f.clock.advance(5_000);

        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        f.tracker.start_work(task.id()).await.unwrap();
        assert!(!f.tracker.breaks.is_on_break());
        assert!(f.tracker.timer.is_running());

        let sessions = f.tracker.planner.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].task_id.as_deref(), Some(BREAK_TASK_ID));
        assert_eq!(sessions[0].duration.seconds(), 5);
    }

    #[tokio::test]
    async fn complete_task_marks_today() {
        let f = fixture(true);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        f.tracker.start_work(task.id()).await.unwrap();
        f.clock.advance(10_000);

        f.tracker.complete_task().await.unwrap().unwrap();
        assert!(f
            .tracker
            .planner
            .is_task_completed(task.id(), local_day(f.clock.now())));
        assert_eq!(f.remote.rows(Table::Completions).len(), 1);
    }

    #[tokio::test]
    async fn timer_survives_restart() {
        let f = fixture(true);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        f.tracker.start_work(task.id()).await.unwrap();
        drop(f.tracker);

        f.clock.advance(125_000);
        let tracker = Tracker::new(
            "u".into(),
            f.store.clone(),
            f.remote.clone(),
            f.network.clone(),
            f.clock.clone(),
        );
        assert_eq!(tracker.open().await, Source::Remote);
        assert!(tracker.timer.is_running());
        assert_eq!(tracker.timer.elapsed(), 125);

        let outcome = tracker.finish_work().await.unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Confirmed { .. }));
        assert_eq!(tracker.planner.sessions()[0].duration.seconds(), 125);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_session_syncs_when_online() {
        let f = fixture(false);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        f.tracker.start_work(task.id()).await.unwrap();
        f.clock.advance(42_000);
        let outcome = f.tracker.finish_work().await.unwrap().unwrap();
        assert!(matches!(outcome, Outcome::Queued { .. }));
        assert_eq!(f.tracker.queue.len(), 2);
        assert!(f.store.get(TIMER_KEY).unwrap().is_some());

        let _watch = f.tracker.watch_sync();
        f.remote.set_reachable(true);
        f.network.set_online(true);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(f.tracker.queue.is_empty());
        assert_eq!(f.remote.rows(Table::Tasks).len(), 1);
        assert_eq!(f.remote.rows(Table::Sessions)[0]["duration"], 42);
        assert_eq!(f.tracker.planner.sessions().len(), 1);
    }

    #[tokio::test]
    async fn completions_survive_restart_offline() {
        let f = fixture(false);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        let day = local_day(T0);
        f.tracker
            .planner
            .toggle_task_completion(task.id(), day)
            .await
            .unwrap();
        drop(f.tracker);

        let tracker = Tracker::new(
            "u".into(),
            f.store.clone(),
            f.remote.clone(),
            f.network.clone(),
            f.clock.clone(),
        );
        assert_eq!(tracker.open().await, Source::Cache);
        assert!(tracker.planner.is_task_completed(task.id(), day));

        tracker
            .planner
            .toggle_task_completion(task.id(), day)
            .await
            .unwrap();
        assert!(!tracker.planner.is_task_completed(task.id(), day));

        let queued: Vec<_> = tracker
            .queue
            .snapshot()
            .into_iter()
            .filter(|change| change.table == Table::Completions)
            .map(|change| change.data["completed"].clone())
            .collect();
        assert_eq!(queued, [serde_json::json!(true), serde_json::json!(false)]);
    }

    #[tokio::test]
    async fn replay_follows_server_assigned_task_id() {
        let f = fixture(false);
        let task = f.tracker.add_task(TaskDraft::named("Study")).await.unwrap();
        let local = task.id().to_owned();
        f.tracker.start_work(&local).await.unwrap();
        f.clock.advance(30_000);
        f.tracker.finish_work().await.unwrap();
        f.tracker
            .planner
            .set_task_completed(&local, local_day(T0), true)
            .await
            .unwrap();
        f.tracker.start_work(&local).await.unwrap();

        f.remote.reassign_ids(true);
        f.remote.set_reachable(true);
        f.network.set_online(true);
        let report = f.tracker.sync.drain().await.unwrap();
        assert_eq!(report.applied, 3);
        assert!(f.tracker.queue.is_empty());

        let assigned = f.remote.column(Table::Tasks, "id")[0]
            .as_str()
            .unwrap()
            .to_owned();
        assert_ne!(assigned, local);
        assert_eq!(f.remote.rows(Table::Sessions)[0]["task_id"], assigned.as_str());
        assert_eq!(f.remote.rows(Table::Completions)[0]["task_id"], assigned.as_str());
        assert_eq!(
            f.tracker.timer.snapshot().current_task_id.as_deref(),
            Some(assigned.as_str())
        );
        assert!(f.tracker.planner.task(&assigned).is_some());
        assert!(f
            .tracker
            .planner
            .is_task_completed(&assigned, local_day(T0)));
    }
}
