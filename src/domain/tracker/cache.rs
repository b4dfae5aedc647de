use std::sync::Arc;

use crate::domain::entity::{Completion, Session, Task};
use crate::domain::repository::KeyValueStore;
use crate::domain::tracker::record::DurableCell;

pub const TASKS_CACHE_KEY: &str = "tasks_cache";
pub const SESSIONS_CACHE_KEY: &str = "sessions_cache";
pub const COMPLETIONS_CACHE_KEY: &str = "completions_cache";

/// Last known good copy of the remote collections, read when the remote
/// store can not be.
pub struct LocalCache {
    tasks: DurableCell<Vec<Task>>,
    sessions: DurableCell<Vec<Session>>,
    completions: DurableCell<Vec<Completion>>,
}

impl LocalCache {
    /// Creates a new [`LocalCache`] on top of `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            tasks: DurableCell::new(Arc::clone(&store), TASKS_CACHE_KEY),
            sessions: DurableCell::new(Arc::clone(&store), SESSIONS_CACHE_KEY),
            completions: DurableCell::new(store, COMPLETIONS_CACHE_KEY),
        }
    }

    /// The cached tasks, empty if nothing usable is stored.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.load().unwrap_or_default()
    }

    /// The cached sessions, empty if nothing usable is stored.
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.load().unwrap_or_default()
    }

    /// The cached completion flags, empty if nothing usable is stored.
    pub fn completions(&self) -> Vec<Completion> {
        self.completions.load().unwrap_or_default()
    }

    pub fn store_tasks(&self, tasks: &[Task]) {
        self.tasks.save(tasks);
    }

    pub fn store_sessions(&self, sessions: &[Session]) {
        self.sessions.save(sessions);
    }

    pub fn store_completions(&self, completions: &[Completion]) {
        self.completions.save(completions);
    }
}
