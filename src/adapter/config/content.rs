use std::path::PathBuf;

use serde::Deserialize;
use tokio::time::Duration;

pub const DEFAULT_CONTENT: &str = r#"
# This configuration file is generated automatically. Feel free to do some
# modification.

# The `user` section names the owner of every task and session.
[user]
id = "local"

# The `storage` section specifies where timer state, the pending queue and
# the offline cache are kept. Leave it empty to use the XDG data directory.
# [storage]
# data = "/path/to/data/directory"

# The `remote` section specifies the shared folder holding the remote
# tables, e.g. a mounted network drive. The tracker works offline while the
# folder is missing. Leave it empty to use a folder in the data directory.
# [remote]
# root = "/path/to/shared/folder"

# The `timer` section specifies how often running clocks are redrawn, in
# milliseconds.
[timer]
frame = 16
break_tick = 1000

# The `sync` section specifies how often the remote folder is probed, in
# milliseconds.
[sync]
probe_interval = 5000
"#;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Configuration {
    pub user: UserContent,
    #[serde(default)]
    pub storage: StorageContent,
    #[serde(default)]
    pub remote: RemoteContent,
    #[serde(default)]
    pub timer: TimerContent,
    #[serde(default)]
    pub sync: SyncContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserContent {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorageContent {
    pub data: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteContent {
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimerContent {
    frame: u64,
    break_tick: u64,
}

impl TimerContent {
    /// Interval between redraws of the work timer.
    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame.max(1))
    }

    /// Interval between redraws of the break timer.
    pub fn break_tick(&self) -> Duration {
        Duration::from_millis(self.break_tick.max(1))
    }
}

impl Default for TimerContent {
    fn default() -> Self {
        Self {
            frame: 16,
            break_tick: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncContent {
    probe_interval: u64,
}

impl SyncContent {
    /// Interval between reachability checks of the remote folder.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval.max(1))
    }
}

impl Default for SyncContent {
    fn default() -> Self {
        Self {
            probe_interval: 5000,
        }
    }
}
