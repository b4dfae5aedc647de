use std::future::Future;

use tokio::task::JoinHandle;

/// A spawned background task that lives as long as this handle. Dropping
/// the handle aborts the task.
#[derive(Debug)]
pub struct ScopedTask {
    handle: JoinHandle<()>,
}

impl ScopedTask {
    /// Spawn `future` on the current runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
        }
    }

    /// Returns `true` once the task has completed or was aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ScopedTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
