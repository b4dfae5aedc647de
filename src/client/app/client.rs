use std::io::{self, Error as IoError, Write};
use std::sync::Arc;

use chrono::NaiveDate;
use snafu::prelude::*;
use tokio::time::Duration;

use crate::adapter::probe::ReachabilityProbe;
use crate::client::app::command::{BreakCommand, Command, TaskCommand};
use crate::domain::entity::{format_time, SessionKind, Task, TaskDraft};
use crate::domain::tracker::{Delivery, Outcome, PlannerError, Tracker, TrackerError};

/// How often the client refreshes what it shows or probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub frame: Duration,
    pub break_tick: Duration,
    pub probe: Duration,
}

/// Main business logic implementation in client side.
pub struct Client {
    tracker: Arc<Tracker>,
    probe: ReachabilityProbe,
    intervals: Intervals,
}

impl Client {
    /// Creates a new [`Client`].
    pub fn new(tracker: Arc<Tracker>, probe: ReachabilityProbe, intervals: Intervals) -> Self {
        Self {
            tracker,
            probe,
            intervals,
        }
    }

    /// Run specific function according to `command`. Connectivity is
    /// probed, collections are loaded and queued changes are sent first.
    ///
    /// # Errors
    ///
    /// This function will return an error if any error occurs.
    pub async fn run(&self, command: Command) -> Result<(), ClientError> {
        let online = self.probe.probe().await;
        let source = self.tracker.open().await;
        tracing::debug!(online, ?source, "Opened tracker");

        match command {
            Command::Start { task } => self.start(&task).await,
            Command::Pause => {
                self.tracker.timer.pause();
                self.status()
            }
            Command::Resume => {
                self.tracker.timer.resume();
                self.status()
            }
            Command::Stop => self.stop().await,
            Command::Complete => self.complete().await,
            Command::Reset => {
                self.tracker.timer.reset();
                println!("Discarded the current interval");
                Ok(())
            }
            Command::Status { watch: false } => self.status(),
            Command::Status { watch: true } => self.watch_status().await,
            Command::Break(BreakCommand::Start) => self.start_break().await,
            Command::Break(BreakCommand::End) => self.end_break().await,
            Command::Task(command) => self.task(command).await,
            Command::Sync { watch: false } => self.sync().await,
            Command::Sync { watch: true } => self.watch_sync().await,
            Command::Export => self.export(),
        }
    }

    async fn start(&self, query: &str) -> Result<(), ClientError> {
        let task = self.resolve(query)?;
        self.tracker.start_work(&task.id).await.context(TrackerSnafu)?;
        println!("Started {}", task.name);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ClientError> {
        let name = self.tracker.timer.snapshot().current_task_name;
        let seconds = self.tracker.timer.elapsed();
        let recorded = self.tracker.finish_work().await.context(TrackerSnafu)?;
        report_session(name.as_deref(), recorded.as_ref(), seconds);
        Ok(())
    }

    async fn complete(&self) -> Result<(), ClientError> {
        let name = self.tracker.timer.snapshot().current_task_name;
        let seconds = self.tracker.timer.elapsed();
        let recorded = self.tracker.complete_task().await.context(TrackerSnafu)?;
        report_session(name.as_deref(), recorded.as_ref(), seconds);
        if let Some(name) = name {
            println!("Completed {name}");
        }
        Ok(())
    }

    async fn start_break(&self) -> Result<(), ClientError> {
        if self.tracker.breaks.is_on_break() {
            println!("Already on a break for {}", format_time(self.tracker.breaks.elapsed()));
            return Ok(());
        }
        let name = self.tracker.timer.snapshot().current_task_name;
        let seconds = self.tracker.timer.elapsed();
        let recorded = self.tracker.start_break().await.context(TrackerSnafu)?;
        if recorded.is_some() {
            report_session(name.as_deref(), recorded.as_ref(), seconds);
        }
        println!("Break started");
        Ok(())
    }

    async fn end_break(&self) -> Result<(), ClientError> {
        if !self.tracker.breaks.is_on_break() {
            println!("No break is running");
            return Ok(());
        }
        let seconds = self.tracker.breaks.elapsed();
        match self.tracker.end_break().await.context(TrackerSnafu)? {
            Some(outcome) => println!(
                "Break of {} recorded{}",
                format_time(seconds),
                pending_suffix(&outcome)
            ),
            None => println!("Break ended"),
        }
        Ok(())
    }

    /// Print the timer's status as aligned `key = value` lines.
    fn status(&self) -> Result<(), ClientError> {
        let state = self.tracker.timer.snapshot();
        let mut outputs = Vec::new();

        let current = if state.is_running {
            "Running"
        } else if state.current_task_id.is_some() {
            "Paused"
        } else {
            "Idle"
        };
        outputs.push(("Timer".to_owned(), current.to_owned()));

        if let Some(name) = state.current_task_name {
            outputs.push(("Task".to_owned(), name));
        }
        outputs.push(("Elapsed".to_owned(), format_time(self.tracker.timer.elapsed())));

        if self.tracker.breaks.is_on_break() {
            outputs.push(("Break".to_owned(), format_time(self.tracker.breaks.elapsed())));
        }

        let network = if self.tracker.network.is_online() {
            "Online"
        } else {
            "Offline"
        };
        outputs.push(("Network".to_owned(), network.to_owned()));
        outputs.push(("Pending".to_owned(), self.tracker.queue.len().to_string()));

        print_aligned(outputs);
        Ok(())
    }

    /// Redraw the elapsed time in place until interrupted.
    async fn watch_status(&self) -> Result<(), ClientError> {
        let work = self.tracker.timer.ticker(self.intervals.frame);
        let rest = self.tracker.breaks.ticker(self.intervals.break_tick);
        let mut work_elapsed = work.subscribe();
        let mut rest_elapsed = rest.subscribe();
        let interrupt = tokio::signal::ctrl_c();
        tokio::pin!(interrupt);

        let mut shown = None;
        loop {
            let work_seconds = *work_elapsed.borrow_and_update();
            let rest_seconds = *rest_elapsed.borrow_and_update();
            let line = if self.tracker.breaks.is_on_break() {
                format!("Break {}", format_time(rest_seconds))
            } else {
                format!("Work  {}", format_time(work_seconds))
            };
            if shown.as_ref() != Some(&line) {
                print!("\r{line:<24}");
                io::stdout().flush().context(OutputSnafu)?;
                shown = Some(line);
            }

            tokio::select! {
                changed = work_elapsed.changed() => if changed.is_err() { break },
                changed = rest_elapsed.changed() => if changed.is_err() { break },
                res = &mut interrupt => {
                    res.context(OutputSnafu)?;
                    break;
                }
            }
        }
        println!();
        Ok(())
    }

    async fn task(&self, command: TaskCommand) -> Result<(), ClientError> {
        match command {
            TaskCommand::Add(draft) => self.add_task(draft).await,
            TaskCommand::List { date } => {
                self.list_tasks(date);
                Ok(())
            }
            TaskCommand::Remove { task } => {
                let task = self.resolve(&task)?;
                let delivery = self
                    .tracker
                    .planner
                    .delete_task(&task.id)
                    .await
                    .context(PlannerSnafu)?;
                println!("Removed {}{}", task.name, delivery_suffix(delivery));
                Ok(())
            }
            TaskCommand::Plan { task, date } => {
                let task = self.resolve(&task)?;
                let delivery = self
                    .tracker
                    .planner
                    .add_task_to_date(&task.id, date)
                    .await
                    .context(PlannerSnafu)?;
                match delivery {
                    Some(delivery) => {
                        println!("Planned {} on {date}{}", task.name, delivery_suffix(delivery))
                    }
                    None => println!("{} is already planned on {date}", task.name),
                }
                Ok(())
            }
            TaskCommand::Done { task, date } => {
                let task = self.resolve(&task)?;
                let date = date.unwrap_or_else(|| self.tracker.today());
                let delivery = self
                    .tracker
                    .planner
                    .toggle_task_completion(&task.id, date)
                    .await
                    .context(PlannerSnafu)?;
                let state = if self.tracker.planner.is_task_completed(&task.id, date) {
                    "done"
                } else {
                    "not done"
                };
                println!("{} is {state} on {date}{}", task.name, delivery_suffix(delivery));
                Ok(())
            }
        }
    }

    async fn add_task(&self, draft: TaskDraft) -> Result<(), ClientError> {
        ensure!(
            !self.tracker.planner.task_exists(&draft.name),
            DuplicateTaskSnafu { name: draft.name }
        );
        let name = draft.name.clone();
        let outcome = self.tracker.add_task(draft).await.context(TrackerSnafu)?;
        println!("Added {name} as {}{}", outcome.id(), pending_suffix(&outcome));
        Ok(())
    }

    fn list_tasks(&self, date: Option<NaiveDate>) {
        let day = date.unwrap_or_else(|| self.tracker.today());
        let tasks = match date {
            Some(date) => self.tracker.planner.tasks_for_date(date),
            None => self.tracker.planner.tasks(),
        };
        if tasks.is_empty() {
            println!("No tasks");
            return;
        }

        let spent: u64 = self
            .tracker
            .planner
            .sessions_for_date(day)
            .iter()
            .filter(|session| session.kind == SessionKind::Work)
            .map(|session| session.duration.seconds())
            .sum();

        for task in tasks {
            let mark = if self.tracker.planner.is_task_completed(&task.id, day) {
                "x"
            } else {
                " "
            };
            let mut line = format!("[{mark}] {}", task.name);
            if let Some(category) = &task.category {
                line.push_str(&format!(" #{category}"));
            }
            if let Some(minutes) = task.planned_duration {
                line.push_str(&format!(" ({minutes} min)"));
            }
            if let Some(hour) = task.start_hour {
                line.push_str(&format!(" at {hour:02}:00"));
            }
            println!("{line}  {}", task.id);
        }
        println!("Worked {} on {day}", format_time(spent));
    }

    async fn sync(&self) -> Result<(), ClientError> {
        if !self.tracker.network.is_online() {
            println!("Offline, {} changes pending", self.tracker.queue.len());
            return Ok(());
        }
        match self.tracker.sync.drain().await {
            Some(report) => println!(
                "Applied {}, dropped {}, pending {}",
                report.applied, report.dropped, report.retained
            ),
            None => println!("A sync is already running"),
        }
        Ok(())
    }

    /// Probe the remote store and drain whenever it comes back, until
    /// interrupted.
    async fn watch_sync(&self) -> Result<(), ClientError> {
        let _sync = self.tracker.watch_sync();
        let _probe = self.probe.spawn(self.intervals.probe);
        println!("Watching connectivity, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await.context(OutputSnafu)?;
        println!("{} changes pending", self.tracker.queue.len());
        Ok(())
    }

    fn export(&self) -> Result<(), ClientError> {
        let content = self.tracker.planner.export_json().context(ExportSnafu)?;
        println!("{content}");
        Ok(())
    }

    /// Find a task by identifier, or else by name ignoring case.
    fn resolve(&self, query: &str) -> Result<Task, ClientError> {
        if let Some(task) = self.tracker.planner.task(query) {
            return Ok(task);
        }
        let lowered = query.trim().to_lowercase();
        self.tracker
            .planner
            .tasks()
            .into_iter()
            .find(|task| task.name.trim().to_lowercase() == lowered)
            .context(UnknownTaskSnafu { query })
    }
}

fn report_session(name: Option<&str>, recorded: Option<&Outcome>, seconds: u64) {
    match recorded {
        Some(outcome) => println!(
            "Recorded {} of {}{}",
            format_time(seconds),
            name.unwrap_or("work"),
            pending_suffix(outcome)
        ),
        None => println!("Nothing to record"),
    }
}

fn pending_suffix(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Confirmed { .. } => "",
        Outcome::Queued { .. } => " (queued until online)",
    }
}

fn delivery_suffix(delivery: Delivery) -> &'static str {
    match delivery {
        Delivery::Applied => "",
        Delivery::Queued => " (queued until online)",
    }
}

fn print_aligned(outputs: Vec<(String, String)>) {
    let key_align = outputs
        .iter()
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or_default();

    for (mut key, value) in outputs {
        let padding = " ".repeat(key_align - key.len());
        key.push_str(&padding);
        println!("{key} = {value}");
    }
}

/// An error for client's operations.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ClientError {
    #[snafu(display("Could not find a task matching {query:?}"))]
    UnknownTask { query: String },
    #[snafu(display("A task named {name:?} already exists"))]
    DuplicateTask { name: String },
    #[snafu(display("Could not run the workday flow"))]
    Tracker { source: TrackerError },
    #[snafu(display("Could not change the plan"))]
    Planner { source: PlannerError },
    #[snafu(display("Could not export collections"))]
    Export { source: serde_json::Error },
    #[snafu(display("Could not use the terminal"))]
    Output { source: IoError },
}
