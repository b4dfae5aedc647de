use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use takip::client::app::{
    BreakCommand as ClientBreakCommand, Command as ClientCommand, TaskCommand as ClientTaskCommand,
};
use takip::domain::entity::TaskDraft;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    /// Path to a custom configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Maximum logging level the subscriber should use
    #[arg(short, long, global = true, default_value_t = Level::WARN)]
    pub verbosity: Level,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start timing a task, given by id or name
    Start { task: String },
    /// Pause the work timer
    Pause,
    /// Resume the work timer
    Resume,
    /// Stop the work timer and record the interval
    Stop,
    /// Record the interval and mark its task completed today
    Complete,
    /// Discard the current interval without recording it
    Reset,
    /// Show the timer's status
    Status {
        /// Keep redrawing the elapsed time until interrupted
        #[arg(short, long)]
        watch: bool,
    },
    /// Start or end a break
    #[command(subcommand)]
    Break(BreakCommand),
    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Send queued changes to the remote store
    Sync {
        /// Keep probing and sync every time the remote store comes back
        #[arg(short, long)]
        watch: bool,
    },
    /// Print every task, session and completion as JSON
    Export,
}

#[derive(Debug, Subcommand)]
pub enum BreakCommand {
    /// Record the current work interval and start a break
    Start,
    /// End the break and record it
    End,
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Add {
        name: String,
        /// Free-form category
        #[arg(long)]
        category: Option<String>,
        /// Planned duration in minutes
        #[arg(short, long)]
        planned: Option<u32>,
        /// Hour of the day the task starts at
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..24))]
        hour: Option<u8>,
        /// Days to schedule the task on, as YYYY-MM-DD
        #[arg(short, long)]
        date: Vec<NaiveDate>,
    },
    /// List tasks
    List {
        /// Only show tasks scheduled on this day
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Delete a task, given by id or name
    Remove { task: String },
    /// Schedule a task on a day
    Plan { task: String, date: NaiveDate },
    /// Toggle the completion of a task
    Done {
        task: String,
        /// Day of the completion, today if omitted
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
}

impl From<Command> for ClientCommand {
    fn from(value: Command) -> Self {
        match value {
            Command::Start { task } => Self::Start { task },
            Command::Pause => Self::Pause,
            Command::Resume => Self::Resume,
            Command::Stop => Self::Stop,
            Command::Complete => Self::Complete,
            Command::Reset => Self::Reset,
            Command::Status { watch } => Self::Status { watch },
            Command::Break(BreakCommand::Start) => Self::Break(ClientBreakCommand::Start),
            Command::Break(BreakCommand::End) => Self::Break(ClientBreakCommand::End),
            Command::Task(command) => Self::Task(command.into()),
            Command::Sync { watch } => Self::Sync { watch },
            Command::Export => Self::Export,
        }
    }
}

impl From<TaskCommand> for ClientTaskCommand {
    fn from(value: TaskCommand) -> Self {
        match value {
            TaskCommand::Add {
                name,
                category,
                planned,
                hour,
                date,
            } => Self::Add(TaskDraft {
                name,
                category,
                planned_duration: planned,
                start_hour: hour,
                dates: date,
            }),
            TaskCommand::List { date } => Self::List { date },
            TaskCommand::Remove { task } => Self::Remove { task },
            TaskCommand::Plan { task, date } => Self::Plan { task, date },
            TaskCommand::Done { task, date } => Self::Done { task, date },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn arguments_parse() {
        Arguments::command().debug_assert();
    }

    #[test]
    fn task_add_converts_to_draft() {
        let args = Arguments::try_parse_from([
            "takip", "task", "add", "Read", "--planned", "30", "--hour", "9", "-d", "2024-05-01",
        ])
        .unwrap();
        let ClientCommand::Task(ClientTaskCommand::Add(draft)) = args.command.into() else {
            panic!("expected a task draft");
        };
        assert_eq!(draft.name, "Read");
        assert_eq!(draft.planned_duration, Some(30));
        assert_eq!(draft.start_hour, Some(9));
        assert_eq!(draft.dates, [NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()]);
    }

    #[test]
    fn hour_out_of_range() {
        assert!(Arguments::try_parse_from(["takip", "task", "add", "Read", "--hour", "24"]).is_err());
    }
}
