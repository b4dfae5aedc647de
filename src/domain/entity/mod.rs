pub mod breaks;
pub mod change;
pub mod completion;
pub mod session;
pub mod task;
pub mod timer;

pub use breaks::BreakState;
pub use change::{ChangeKind, PendingChange, Row, Table};
pub use completion::{Completion, CompletionKey};
pub use session::{Session, SessionDraft, SessionDuration, SessionKind};
pub use task::{Task, TaskDraft, TaskPatch};
pub use timer::{format_time, EpochMillis, TimerState};
