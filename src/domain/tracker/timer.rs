use std::sync::Arc;

use tokio::sync::watch::{self, Receiver, Sender};
use tokio::time::Duration;

use crate::domain::entity::TimerState;
use crate::domain::repository::{Clock, KeyValueStore};
use crate::domain::tracker::record::DurableCell;
use crate::domain::tracker::ticker::Ticker;

pub const TIMER_KEY: &str = "timer";

/// The work timer. Every change is written through to durable storage as a
/// single record, and the state is recovered from it on construction.
pub struct PersistentTimer {
    state: Sender<TimerState>,
    cell: DurableCell<TimerState>,
    clock: Arc<dyn Clock>,
}

impl PersistentTimer {
    /// Recover the timer from `store`. Missing or unreadable records yield a
    /// stopped timer. A timer that was running keeps counting the time that
    /// passed while the process was gone.
    pub fn recover(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let cell = DurableCell::<TimerState>::new(store, TIMER_KEY);
        let state = cell.load().unwrap_or_default();
        if state.is_running {
            tracing::info!(
                task = state.current_task_name.as_deref(),
                elapsed = state.elapsed(clock.now()),
                "Recovered running timer"
            );
        }
        let (state, _) = watch::channel(state);
        Self { state, cell, clock }
    }

    /// Start a new interval for a task, discarding any unsaved interval.
    pub fn start(&self, task_id: String, task_name: String) {
        let now = self.clock.now();
        self.modify(|state| {
            state.start(task_id, task_name, now);
            true
        });
    }

    /// Pause the running interval. Does nothing if already paused.
    pub fn pause(&self) {
        let now = self.clock.now();
        self.modify(|state| state.pause(now));
    }

    /// Resume a paused interval. Does nothing if already running.
    pub fn resume(&self) {
        let now = self.clock.now();
        self.modify(|state| state.resume(now));
    }

    /// Stop the interval and return its length in seconds. Recording a
    /// session is left to the caller.
    pub fn stop(&self) -> u64 {
        let now = self.clock.now();
        let mut total = 0;
        self.modify(|state| {
            total = state.stop(now);
            true
        });
        total
    }

    /// Clear every field, including the task identity.
    pub fn reset(&self) {
        self.modify(|state| {
            let changed = *state != TimerState::default();
            state.reset();
            changed
        });
    }

    /// Point the timer at a task's new identifier.
    pub fn rename_task(&self, from: &str, to: &str) {
        self.modify(|state| match &state.current_task_id {
            Some(id) if id == from => {
                state.current_task_id = Some(to.to_owned());
                true
            }
            _ => false,
        });
    }

    /// Seconds measured so far.
    pub fn elapsed(&self) -> u64 {
        self.state.borrow().elapsed(self.clock.now())
    }

    /// Returns `true` while the timer runs.
    pub fn is_running(&self) -> bool {
        self.state.borrow().is_running
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> TimerState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> Receiver<TimerState> {
        self.state.subscribe()
    }

    /// Spawn a [`Ticker`] publishing elapsed seconds every `frame` while the
    /// timer runs.
    pub fn ticker(&self, frame: Duration) -> Ticker {
        Ticker::spawn(self.subscribe(), Arc::clone(&self.clock), frame)
    }

    fn modify(&self, f: impl FnOnce(&mut TimerState) -> bool) {
        self.state.send_if_modified(|state| {
            let changed = f(state);
            if changed {
                self.cell.save(&*state);
            }
            changed
        });
    }
}
