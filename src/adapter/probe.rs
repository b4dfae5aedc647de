use std::sync::Arc;

use tokio::time::{Duration, MissedTickBehavior};

use crate::adapter::repository::FolderRemote;
use crate::domain::tracker::NetworkSignal;
use crate::utils::task::ScopedTask;

/// Checks whether the remote folder can be reached and publishes the result
/// on a [`NetworkSignal`].
#[derive(Clone)]
pub struct ReachabilityProbe {
    remote: Arc<FolderRemote>,
    network: NetworkSignal,
}

impl ReachabilityProbe {
    /// Creates a new [`ReachabilityProbe`].
    pub fn new(remote: Arc<FolderRemote>, network: NetworkSignal) -> Self {
        Self { remote, network }
    }

    /// Check once and publish the result.
    pub async fn probe(&self) -> bool {
        let online = self.remote.is_reachable().await;
        self.network.set_online(online);
        online
    }

    /// Check every `period` until the returned handle is dropped.
    pub fn spawn(&self, period: Duration) -> ScopedTask {
        let probe = self.clone();
        ScopedTask::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                probe.probe().await;
            }
        })
    }
}
