use std::sync::Arc;

use tokio::sync::watch::{self, Receiver, Sender};
use tokio::time::{Duration, MissedTickBehavior};

use crate::domain::entity::{BreakState, EpochMillis, TimerState};
use crate::domain::repository::Clock;
use crate::utils::task::ScopedTask;

/// A stopwatch-like state whose elapsed time can be sampled.
pub trait Stopwatch: Send + Sync + 'static {
    /// Returns `true` while time is accruing.
    fn is_active(&self) -> bool;

    /// Whole seconds measured at `now`.
    fn elapsed(&self, now: EpochMillis) -> u64;
}

impl Stopwatch for TimerState {
    fn is_active(&self) -> bool {
        self.is_running
    }

    fn elapsed(&self, now: EpochMillis) -> u64 {
        TimerState::elapsed(self, now)
    }
}

impl Stopwatch for Option<BreakState> {
    fn is_active(&self) -> bool {
        self.is_some()
    }

    fn elapsed(&self, now: EpochMillis) -> u64 {
        self.as_ref().map_or(0, |state| state.elapsed(now))
    }
}

/// A background loop publishing the elapsed seconds of a [`Stopwatch`]
/// once per `period` while it is active. While inactive the loop sleeps
/// until the state changes.
///
/// The loop is owned by this handle: dropping it cancels the loop.
#[derive(Debug)]
pub struct Ticker {
    _task: ScopedTask,
    elapsed: Receiver<u64>,
}

impl Ticker {
    /// Spawn a [`Ticker`] following `state`.
    pub fn spawn<S: Stopwatch>(
        state: Receiver<S>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> Self {
        let initial = state.borrow().elapsed(clock.now());
        let (sender, elapsed) = watch::channel(initial);
        let task = ScopedTask::spawn(run(state, clock, period, sender));
        Self {
            _task: task,
            elapsed,
        }
    }

    /// The last published value.
    pub fn elapsed(&self) -> u64 {
        *self.elapsed.borrow()
    }

    /// Subscribe to published values.
    pub fn subscribe(&self) -> Receiver<u64> {
        self.elapsed.clone()
    }
}

async fn run<S: Stopwatch>(
    mut state: Receiver<S>,
    clock: Arc<dyn Clock>,
    period: Duration,
    sender: Sender<u64>,
) {
    loop {
        let active = state.borrow_and_update().is_active();

        if !active {
            let value = state.borrow().elapsed(clock.now());
            sender.send_replace(value);
            if state.changed().await.is_err() {
                return;
            }
            continue;
        }

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let value = state.borrow().elapsed(clock.now());
                    sender.send_replace(value);
                }
                changed = state.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}
