use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use snafu::prelude::*;
use uuid::Uuid;

use crate::domain::entity::{
    ChangeKind, Completion, CompletionKey, Row, Session, SessionDraft, Table, Task, TaskDraft,
    TaskPatch,
};
use crate::domain::repository::{RemoteError, RemoteStore};
use crate::domain::tracker::cache::LocalCache;
use crate::domain::tracker::network::NetworkSignal;
use crate::domain::tracker::queue::PendingQueue;
use crate::domain::tracker::replay::{ApplyChange, ChangeOp, MalformedChange};

/// Result of creating a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The remote store has the row under `id`. `renamed_from` holds the
    /// local identifier if the store assigned a different one.
    Confirmed {
        id: String,
        renamed_from: Option<String>,
    },
    /// The row is queued under its local identifier.
    Queued { id: String },
}

impl Outcome {
    /// The identifier the row is known by now.
    pub fn id(&self) -> &str {
        match self {
            Self::Confirmed { id, .. } | Self::Queued { id } => id,
        }
    }
}

/// Result of changing or removing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    Queued,
}

/// Where a refresh got its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Cache,
}

#[derive(Debug, Default)]
struct Collections {
    tasks: Vec<Task>,
    sessions: Vec<Session>,
    completions: HashMap<CompletionKey, bool>,
}

enum Pushed {
    Applied(Option<Row>),
    Queued,
}

impl From<Pushed> for Delivery {
    fn from(value: Pushed) -> Self {
        match value {
            Pushed::Applied(_) => Self::Applied,
            Pushed::Queued => Self::Queued,
        }
    }
}

/// The mutation façade over tasks, sessions and completions.
///
/// Every mutation is applied to memory first and then sent to the remote
/// store. When the store is offline or the write fails, the change goes to
/// the pending queue and the in-memory copy is kept. Reads never touch the
/// network.
pub struct Planner {
    user_id: String,
    collections: Mutex<Collections>,
    remote: Arc<dyn RemoteStore>,
    queue: Arc<PendingQueue>,
    cache: LocalCache,
    network: NetworkSignal,
}

impl Planner {
    /// Creates a new [`Planner`] seeded from the local cache.
    pub fn new(
        user_id: String,
        remote: Arc<dyn RemoteStore>,
        queue: Arc<PendingQueue>,
        cache: LocalCache,
        network: NetworkSignal,
    ) -> Self {
        let collections = Collections {
            tasks: cache.tasks(),
            sessions: cache.sessions(),
            completions: completion_map(cache.completions()),
        };
        Self {
            user_id,
            collections: Mutex::new(collections),
            remote,
            queue,
            cache,
            network,
        }
    }

    /// Give a draft a local identifier and put it at the front of the task
    /// list. Nothing is sent yet.
    pub fn stage_task(&self, draft: TaskDraft) -> Task {
        let task = Task::from_draft(Uuid::new_v4().to_string(), draft);
        self.collections().tasks.insert(0, task.clone());
        task
    }

    /// Send a staged task to the remote store.
    ///
    /// # Errors
    ///
    /// This function will return an error if the task can not be encoded.
    #[tracing::instrument(skip_all, fields(id = %task.id))]
    pub async fn commit_task(&self, task: Task) -> Result<Outcome, PlannerError> {
        let row = self.owned_row(Table::Tasks, &task)?;
        let outcome = match self.push(Table::Tasks, ChangeKind::Insert, row).await? {
            Pushed::Applied(row) => match row.as_ref().and_then(row_id) {
                Some(id) if id != task.id => {
                    self.rename_task(&task.id, id);
                    Outcome::Confirmed {
                        id: id.to_owned(),
                        renamed_from: Some(task.id),
                    }
                }
                _ => Outcome::Confirmed {
                    id: task.id,
                    renamed_from: None,
                },
            },
            Pushed::Queued => Outcome::Queued { id: task.id },
        };
        self.store_cache();
        Ok(outcome)
    }

    /// Create a task: [`Planner::stage_task`] followed by
    /// [`Planner::commit_task`].
    ///
    /// # Errors
    ///
    /// This function will return an error if the task can not be encoded.
    pub async fn add_task(&self, draft: TaskDraft) -> Result<Outcome, PlannerError> {
        let task = self.stage_task(draft);
        self.commit_task(task).await
    }

    /// Change the fields of a task present in `patch`.
    ///
    /// # Errors
    ///
    /// This function will return an error if no task has the identifier.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Delivery, PlannerError> {
        {
            let mut collections = self.collections();
            let task = collections
                .tasks
                .iter_mut()
                .find(|task| task.id == id)
                .context(UnknownTaskSnafu { id })?;
            task.apply(&patch);
        }
        if patch.is_empty() {
            return Ok(Delivery::Applied);
        }

        let mut data = encode(Table::Tasks, &patch)?;
        data.insert("id".into(), Value::String(id.to_owned()));
        let delivery = self.push(Table::Tasks, ChangeKind::Update, data).await?;
        self.store_cache();
        Ok(delivery.into())
    }

    /// Remove a task.
    ///
    /// # Errors
    ///
    /// This function will return an error if the change can not be encoded.
    #[tracing::instrument(skip(self))]
    pub async fn delete_task(&self, id: &str) -> Result<Delivery, PlannerError> {
        self.collections().tasks.retain(|task| task.id != id);

        let mut data = Row::new();
        data.insert("id".into(), Value::String(id.to_owned()));
        let delivery = self.push(Table::Tasks, ChangeKind::Delete, data).await?;
        self.store_cache();
        Ok(delivery.into())
    }

    /// Schedule a task on `day`. Returns `None` if it already was.
    ///
    /// # Errors
    ///
    /// This function will return an error if no task has the identifier.
    pub async fn add_task_to_date(
        &self,
        id: &str,
        day: NaiveDate,
    ) -> Result<Option<Delivery>, PlannerError> {
        let dates = {
            let collections = self.collections();
            let task = collections
                .tasks
                .iter()
                .find(|task| task.id == id)
                .context(UnknownTaskSnafu { id })?;
            if task.is_scheduled(day) {
                return Ok(None);
            }
            let mut dates = task.dates.clone();
            dates.push(day);
            dates
        };
        self.update_task(id, TaskPatch::dates(dates)).await.map(Some)
    }

    /// Record a finished session.
    ///
    /// # Errors
    ///
    /// This function will return an error if the session can not be encoded.
    #[tracing::instrument(skip_all, fields(kind = %draft.kind, duration = draft.duration.seconds()))]
    pub async fn add_session(&self, draft: SessionDraft) -> Result<Outcome, PlannerError> {
        let session = Session::from_draft(Uuid::new_v4().to_string(), draft);
        let row = self.owned_row(Table::Sessions, &session)?;

        let (stored, outcome) = match self.push(Table::Sessions, ChangeKind::Insert, row).await? {
            Pushed::Applied(row) => {
                let stored = row.and_then(decode::<Session>).unwrap_or_else(|| session.clone());
                let renamed_from = (stored.id != session.id).then_some(session.id);
                let outcome = Outcome::Confirmed {
                    id: stored.id.clone(),
                    renamed_from,
                };
                (stored, outcome)
            }
            Pushed::Queued => {
                let outcome = Outcome::Queued {
                    id: session.id.clone(),
                };
                (session, outcome)
            }
        };

        self.collections().sessions.insert(0, stored);
        self.store_cache();
        Ok(outcome)
    }

    /// Set the completion flag of a task on `day`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the row can not be encoded.
    #[tracing::instrument(skip(self))]
    pub async fn set_task_completed(
        &self,
        task_id: &str,
        day: NaiveDate,
        completed: bool,
    ) -> Result<Delivery, PlannerError> {
        self.collections()
            .completions
            .insert(CompletionKey::new(task_id, day), completed);

        let completion = Completion {
            user_id: self.user_id.clone(),
            task_id: task_id.to_owned(),
            date: day,
            completed,
        };
        let row = encode(Table::Completions, &completion)?;
        let delivery = self.push(Table::Completions, ChangeKind::Upsert, row).await?;
        self.store_cache();
        Ok(delivery.into())
    }

    /// Flip the completion flag of a task on `day`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the row can not be encoded.
    pub async fn toggle_task_completion(
        &self,
        task_id: &str,
        day: NaiveDate,
    ) -> Result<Delivery, PlannerError> {
        let completed = !self.is_task_completed(task_id, day);
        self.set_task_completed(task_id, day, completed).await
    }

    pub fn is_task_completed(&self, task_id: &str, day: NaiveDate) -> bool {
        self.collections()
            .completions
            .get(&CompletionKey::new(task_id, day))
            .copied()
            .unwrap_or(false)
    }

    /// All tasks, most recent first.
    pub fn tasks(&self) -> Vec<Task> {
        self.collections().tasks.clone()
    }

    /// All sessions, most recent first.
    pub fn sessions(&self) -> Vec<Session> {
        self.collections().sessions.clone()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.collections().tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Tasks scheduled on `day`.
    pub fn tasks_for_date(&self, day: NaiveDate) -> Vec<Task> {
        self.collections()
            .tasks
            .iter()
            .filter(|task| task.is_scheduled(day))
            .cloned()
            .collect()
    }

    /// Sessions recorded on `day`.
    pub fn sessions_for_date(&self, day: NaiveDate) -> Vec<Session> {
        self.collections()
            .sessions
            .iter()
            .filter(|session| session.date == day)
            .cloned()
            .collect()
    }

    /// Returns `true` if a task has this name, ignoring case and
    /// surrounding whitespace.
    pub fn task_exists(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.collections()
            .tasks
            .iter()
            .any(|task| task.name.trim().to_lowercase() == name)
    }

    /// Dump every collection as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// This function will return an error if serialization fails.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        #[derive(Serialize)]
        struct Export<'a> {
            tasks: &'a [Task],
            sessions: &'a [Session],
            completions: BTreeMap<String, bool>,
        }

        let collections = self.collections();
        let completions = collections
            .completions
            .iter()
            .map(|(key, completed)| (format!("{}_{}", key.task_id, key.date), *completed))
            .collect();
        serde_json::to_string_pretty(&Export {
            tasks: &collections.tasks,
            sessions: &collections.sessions,
            completions,
        })
    }

    /// Replace the in-memory collections with the remote ones. Collections
    /// that can not be fetched are read from the local cache instead.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Source {
        if !self.network.is_online() {
            let mut collections = self.collections();
            collections.tasks = self.cache.tasks();
            collections.sessions = self.cache.sessions();
            collections.completions = completion_map(self.cache.completions());
            tracing::info!("Offline, loaded collections from cache");
            return Source::Cache;
        }

        let tasks = self.fetch::<Task>(Table::Tasks).await;
        let sessions = self.fetch::<Session>(Table::Sessions).await;
        let completions = self.fetch::<Completion>(Table::Completions).await;
        let source = if tasks.is_ok() && sessions.is_ok() && completions.is_ok() {
            Source::Remote
        } else {
            Source::Cache
        };

        let mut collections = self.collections();
        collections.tasks = match tasks {
            Ok(tasks) => {
                self.cache.store_tasks(&tasks);
                tasks
            }
            Err(err) => {
                tracing::warn!(%err, "Could not fetch tasks, loaded cache");
                self.cache.tasks()
            }
        };
        collections.sessions = match sessions {
            Ok(sessions) => {
                self.cache.store_sessions(&sessions);
                sessions
            }
            Err(err) => {
                tracing::warn!(%err, "Could not fetch sessions, loaded cache");
                self.cache.sessions()
            }
        };
        match completions {
            Ok(completions) => {
                self.cache.store_completions(&completions);
                collections.completions = completion_map(completions);
            }
            Err(err) => {
                tracing::warn!(%err, "Could not fetch completions, loaded cache");
                collections.completions = completion_map(self.cache.completions());
            }
        }
        source
    }

    /// Move every reference from a local task identifier to the one the
    /// remote store assigned.
    pub fn rename_task(&self, from: &str, to: &str) {
        tracing::info!(from, to, "Task renamed by remote store");
        {
            let mut collections = self.collections();
            for task in collections.tasks.iter_mut().filter(|task| task.id == from) {
                task.id = to.to_owned();
            }
            for session in &mut collections.sessions {
                if session.task_id.as_deref() == Some(from) {
                    session.task_id = Some(to.to_owned());
                }
            }
            let moved: Vec<CompletionKey> = collections
                .completions
                .keys()
                .filter(|key| key.task_id == from)
                .cloned()
                .collect();
            for key in moved {
                if let Some(completed) = collections.completions.remove(&key) {
                    collections
                        .completions
                        .insert(CompletionKey::new(to, key.date), completed);
                }
            }
        }
        self.queue.retarget(from, to);
        self.store_cache();
    }

    /// Try the remote store first and fall back to the queue.
    async fn push(&self, table: Table, kind: ChangeKind, data: Row) -> Result<Pushed, PlannerError> {
        if self.network.is_online() {
            let op = ChangeOp::parse(table, kind, data.clone()).context(MalformedSnafu)?;
            match op.apply(table, self.remote.as_ref()).await {
                Ok(row) => return Ok(Pushed::Applied(row)),
                Err(err) if err.is_duplicate() => {
                    tracing::info!(%table, %kind, "Row already exists remotely");
                    return Ok(Pushed::Applied(None));
                }
                Err(err) => tracing::warn!(%table, %kind, %err, "Remote write failed, queued"),
            }
        }
        self.queue.enqueue(table, kind, data);
        Ok(Pushed::Queued)
    }

    async fn fetch<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>, RemoteError> {
        let rows = self.remote.fetch(table, self.user_id.clone()).await?;
        Ok(rows.into_iter().filter_map(decode).collect())
    }

    fn owned_row<T: Serialize>(&self, table: Table, value: &T) -> Result<Row, PlannerError> {
        let mut row = encode(table, value)?;
        row.insert("user_id".into(), Value::String(self.user_id.clone()));
        Ok(row)
    }

    fn store_cache(&self) {
        let collections = self.collections();
        self.cache.store_tasks(&collections.tasks);
        self.cache.store_sessions(&collections.sessions);
        let completions: Vec<Completion> = collections
            .completions
            .iter()
            .map(|(key, completed)| Completion {
                user_id: self.user_id.clone(),
                task_id: key.task_id.clone(),
                date: key.date,
                completed: *completed,
            })
            .collect();
        self.cache.store_completions(&completions);
    }

    fn collections(&self) -> MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn completion_map(completions: Vec<Completion>) -> HashMap<CompletionKey, bool> {
    completions
        .into_iter()
        .map(|completion| (completion.key(), completion.completed))
        .collect()
}

fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn encode<T: Serialize>(table: Table, value: &T) -> Result<Row, PlannerError> {
    match serde_json::to_value(value).context(EncodeSnafu { table })? {
        Value::Object(row) => Ok(row),
        _ => NotAnObjectSnafu { table }.fail(),
    }
}

fn decode<T: DeserializeOwned>(row: Row) -> Option<T> {
    match serde_json::from_value(Value::Object(row)) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%err, "Skipped undecodable row");
            None
        }
    }
}

/// An error type of the [`Planner`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum PlannerError {
    #[snafu(display("Could not find task {id}"))]
    #[non_exhaustive]
    UnknownTask { id: String },
    #[snafu(display("Could not encode a {table} row"))]
    #[non_exhaustive]
    Encode {
        table: Table,
        source: serde_json::Error,
    },
    #[snafu(display("A {table} row must encode to an object"))]
    #[non_exhaustive]
    NotAnObject { table: Table },
    #[snafu(display("Could not build the remote change"))]
    #[non_exhaustive]
    Malformed { source: MalformedChange },
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::domain::entity::{SessionDuration, SessionKind};
    use crate::domain::repository::MemoryStore;
    use crate::domain::tracker::sync::{MockSyncListener, SyncReconciler};
    use crate::domain::tracker::testing::{FakeRemote, ManualClock};

    const USER: &str = "u";

    struct Fixture {
        store: Arc<MemoryStore>,
        remote: Arc<FakeRemote>,
        queue: Arc<PendingQueue>,
        network: NetworkSignal,
        planner: Planner,
    }

    fn fixture(online: bool) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let remote = FakeRemote::new();
        remote.set_reachable(online);
        let queue = Arc::new(PendingQueue::new(store.clone(), ManualClock::new(0)));
        let network = NetworkSignal::new(online);
        let planner = Planner::new(
            USER.into(),
            remote.clone(),
            Arc::clone(&queue),
            LocalCache::new(store.clone()),
            network.clone(),
        );
        Fixture {
            store,
            remote,
            queue,
            network,
            planner,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn session_draft(task_id: &str, seconds: u64) -> SessionDraft {
        SessionDraft {
            task_id: Some(task_id.into()),
            task_name: "Study".into(),
            date: day(1),
            duration: SessionDuration::try_new(seconds).unwrap(),
            kind: SessionKind::Work,
            timestamp: 0,
        }
    }

    #[tokio::test]
    async fn add_task_online_is_confirmed() {
        let f = fixture(true);
        let outcome = f.planner.add_task(TaskDraft::named("Study")).await.unwrap();
        assert!(matches!(outcome, Outcome::Confirmed { renamed_from: None, .. }));

        let rows = f.remote.rows(Table::Tasks);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], outcome.id());
        assert_eq!(rows[0]["user_id"], USER);
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn add_task_offline_then_sync() {
        let f = fixture(false);
        let outcome = f.planner.add_task(TaskDraft::named("Study")).await.unwrap();
        let Outcome::Queued { id } = outcome else {
            panic!("task should be queued offline");
        };

        assert_eq!(f.planner.tasks()[0].id, id);
        let queued = f.queue.snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind, ChangeKind::Insert);
        assert_eq!(queued[0].row_id(), Some(id.as_str()));
        assert_eq!(LocalCache::new(f.store.clone()).tasks()[0].id, id);

        f.remote.set_reachable(true);
        f.network.set_online(true);
        let mut listener = MockSyncListener::new();
        listener.expect_synced().times(1).returning(|| ());
        let reconciler = SyncReconciler::new(
            Arc::clone(&f.queue),
            f.remote.clone(),
            f.network.clone(),
            Arc::new(listener),
        );
        let report = reconciler.drain().await.unwrap();
        assert_eq!(report.applied, 1);
        assert!(f.queue.is_empty());
        assert_eq!(f.remote.column(Table::Tasks, "id"), [json!(id)]);
    }

    #[tokio::test]
    async fn add_task_renamed_by_remote() {
        let f = fixture(false);
        let task = f.planner.stage_task(TaskDraft::named("Study"));
        f.planner
            .set_task_completed(&task.id, day(1), true)
            .await
            .unwrap();
        f.planner
            .add_session(session_draft(&task.id, 60))
            .await
            .unwrap();
        assert_eq!(f.queue.len(), 2);

        f.remote.set_reachable(true);
        f.remote.reassign_ids(true);
        f.network.set_online(true);
        let outcome = f.planner.commit_task(task.clone()).await.unwrap();
        let Outcome::Confirmed {
            id,
            renamed_from: Some(local),
        } = outcome
        else {
            panic!("task should be renamed");
        };
        assert_eq!(local, task.id);
        assert_ne!(id, task.id);

        assert_eq!(f.planner.tasks()[0].id, id);
        assert_eq!(f.planner.sessions()[0].task_id.as_deref(), Some(id.as_str()));
        assert!(f.planner.is_task_completed(&id, day(1)));
        assert!(!f.planner.is_task_completed(&task.id, day(1)));
        assert!(f
            .queue
            .snapshot()
            .iter()
            .all(|change| change.data["task_id"] == json!(id)));
    }

    #[tokio::test]
    async fn update_task_unknown_id() {
        let f = fixture(true);
        let err = f
            .planner
            .update_task("missing", TaskPatch::dates(vec![day(1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, PlannerError::UnknownTask { .. }));
    }

    #[tokio::test]
    async fn update_and_delete_are_queued_offline() {
        let f = fixture(false);
        let task = f.planner.stage_task(TaskDraft::named("Study"));

        let patch = TaskPatch {
            name: Some("Read".into()),
            ..Default::default()
        };
        assert_eq!(
            f.planner.update_task(&task.id, patch).await.unwrap(),
            Delivery::Queued
        );
        assert_eq!(f.planner.tasks()[0].name, "Read");
        assert_eq!(
            f.planner.delete_task(&task.id).await.unwrap(),
            Delivery::Queued
        );
        assert!(f.planner.tasks().is_empty());

        let kinds: Vec<_> = f.queue.snapshot().iter().map(|change| change.kind).collect();
        assert_eq!(kinds, [ChangeKind::Update, ChangeKind::Delete]);
        assert_eq!(f.queue.snapshot()[0].data["name"], "Read");
    }

    #[tokio::test]
    async fn add_task_to_date_is_idempotent() {
        let f = fixture(true);
        let outcome = f.planner.add_task(TaskDraft::named("Study")).await.unwrap();
        let id = outcome.id();

        assert_eq!(
            f.planner.add_task_to_date(id, day(2)).await.unwrap(),
            Some(Delivery::Applied)
        );
        assert_eq!(f.planner.add_task_to_date(id, day(2)).await.unwrap(), None);
        assert_eq!(f.planner.tasks_for_date(day(2)).len(), 1);
        assert!(f.planner.tasks_for_date(day(3)).is_empty());
        assert_eq!(f.remote.rows(Table::Tasks)[0]["dates"], json!(["2024-05-02"]));
    }

    #[tokio::test]
    async fn add_session_online_and_offline() {
        let f = fixture(true);
        let outcome = f.planner.add_session(session_draft("t", 125)).await.unwrap();
        assert!(matches!(outcome, Outcome::Confirmed { .. }));
        assert_eq!(f.remote.rows(Table::Sessions)[0]["duration"], 125);
        assert_eq!(f.remote.rows(Table::Sessions)[0]["type"], "work");

        f.network.set_online(false);
        let outcome = f.planner.add_session(session_draft("t", 30)).await.unwrap();
        assert!(matches!(outcome, Outcome::Queued { .. }));
        assert_eq!(f.planner.sessions_for_date(day(1)).len(), 2);
        assert_eq!(f.planner.sessions()[0].duration.seconds(), 30);
        assert_eq!(f.queue.len(), 1);
    }

    #[tokio::test]
    async fn toggle_task_completion_upserts() {
        let f = fixture(true);
        assert!(!f.planner.is_task_completed("t", day(1)));

        f.planner.toggle_task_completion("t", day(1)).await.unwrap();
        assert!(f.planner.is_task_completed("t", day(1)));
        f.planner.toggle_task_completion("t", day(1)).await.unwrap();
        assert!(!f.planner.is_task_completed("t", day(1)));

        let rows = f.remote.rows(Table::Completions);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["completed"], false);
    }

    #[tokio::test]
    async fn failed_write_is_queued() {
        let f = fixture(true);
        f.remote.set_reachable(false);
        assert_eq!(
            f.planner.set_task_completed("t", day(1), true).await.unwrap(),
            Delivery::Queued
        );
        assert_eq!(f.queue.snapshot()[0].kind, ChangeKind::Upsert);
        assert!(f.planner.is_task_completed("t", day(1)));
    }

    #[tokio::test]
    async fn refresh_falls_back_to_cache() {
        let f = fixture(true);
        f.planner.add_task(TaskDraft::named("Study")).await.unwrap();
        f.planner
            .set_task_completed("t", day(1), true)
            .await
            .unwrap();
        assert_eq!(f.planner.refresh().await, Source::Remote);
        let tasks = f.planner.tasks();
        assert!(f.planner.is_task_completed("t", day(1)));

        f.remote.set_reachable(false);
        assert_eq!(f.planner.refresh().await, Source::Cache);
        assert_eq!(f.planner.tasks(), tasks);

        assert!(f.planner.is_task_completed("t", day(1)));

        f.network.set_online(false);
        assert_eq!(f.planner.refresh().await, Source::Cache);
        assert_eq!(f.planner.tasks(), tasks);
        assert!(f.planner.is_task_completed("t", day(1)));
    }

    #[tokio::test]
    async fn refresh_with_nothing_cached() {
        let f = fixture(false);
        assert_eq!(f.planner.refresh().await, Source::Cache);
        assert!(f.planner.tasks().is_empty());
        assert!(f.planner.sessions().is_empty());
    }

    #[tokio::test]
    async fn task_exists_and_export() {
        let f = fixture(true);
        let outcome = f.planner.add_task(TaskDraft::named("Deep Work")).await.unwrap();
        f.planner
            .set_task_completed(outcome.id(), day(1), true)
            .await
            .unwrap();
        assert!(f.planner.task_exists("  deep work "));
        assert!(!f.planner.task_exists("shallow work"));

        let export: Value = serde_json::from_str(&f.planner.export_json().unwrap()).unwrap();
        assert_eq!(export["tasks"][0]["name"], "Deep Work");
        assert_eq!(
            export["completions"][format!("{}_2024-05-01", outcome.id())],
            true
        );
    }
}
