use tokio::sync::watch::{self, Receiver, Sender};

/// Shared connectivity state. Adapters publish reachability, the tracker
/// reads it before talking to the remote store and reacts to transitions.
#[derive(Debug, Clone)]
pub struct NetworkSignal {
    sender: Sender<bool>,
}

impl NetworkSignal {
    /// Creates a new [`NetworkSignal`] with an initial state.
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender }
    }

    /// Returns `true` if the remote store is currently believed reachable.
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Publish the latest probe result. Subscribers only wake on changes.
    pub fn set_online(&self, online: bool) {
        self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                tracing::info!(online, "Connectivity changed");
                *current = online;
                true
            }
        });
    }

    /// Subscribe to connectivity changes.
    pub fn subscribe(&self) -> Receiver<bool> {
        self.sender.subscribe()
    }
}
