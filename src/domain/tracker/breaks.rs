use std::sync::Arc;

use tokio::sync::watch::{self, Receiver, Sender};
use tokio::time::Duration;

use crate::domain::entity::BreakState;
use crate::domain::repository::{Clock, KeyValueStore};
use crate::domain::tracker::record::DurableCell;
use crate::domain::tracker::ticker::Ticker;

pub const BREAK_KEY: &str = "break";

/// A break that has just ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedBreak {
    pub state: BreakState,
    pub seconds: u64,
}

/// The break stopwatch. The stored record exists exactly while a break is
/// running.
pub struct BreakTracker {
    state: Sender<Option<BreakState>>,
    cell: DurableCell<BreakState>,
    clock: Arc<dyn Clock>,
}

impl BreakTracker {
    /// Recover the break state from `store`.
    pub fn recover(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let cell = DurableCell::<BreakState>::new(store, BREAK_KEY);
        let state = cell.load();
        if let Some(state) = &state {
            tracing::info!(elapsed = state.elapsed(clock.now()), "Recovered break");
        }
        let (state, _) = watch::channel(state);
        Self { state, cell, clock }
    }

    /// Begin a break, remembering the task that was active. Returns `false`
    /// if a break is already running.
    pub fn start(&self, task_id: Option<String>) -> bool {
        let now = self.clock.now();
        self.state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            let started = BreakState::new(now, task_id);
            self.cell.save(&started);
            *state = Some(started);
            true
        })
    }

    /// End the running break and remove its record. Returns `None` if no
    /// break was running.
    pub fn end(&self) -> Option<FinishedBreak> {
        let now = self.clock.now();
        let mut ended = None;
        self.state.send_if_modified(|state| match state.take() {
            Some(running) => {
                self.cell.clear();
                ended = Some(running);
                true
            }
            None => false,
        });
        ended.map(|state| FinishedBreak {
            seconds: state.elapsed(now),
            state,
        })
    }

    /// Returns `true` while a break runs.
    pub fn is_on_break(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Seconds since the running break began, zero without a break.
    pub fn elapsed(&self) -> u64 {
        self.state
            .borrow()
            .as_ref()
            .map_or(0, |state| state.elapsed(self.clock.now()))
    }

    /// Subscribe to break changes.
    pub fn subscribe(&self) -> Receiver<Option<BreakState>> {
        self.state.subscribe()
    }

    /// Spawn a [`Ticker`] publishing the break's elapsed seconds every
    /// `period` while a break runs.
    pub fn ticker(&self, period: Duration) -> Ticker {
        Ticker::spawn(self.subscribe(), Arc::clone(&self.clock), period)
    }
}
