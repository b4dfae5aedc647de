pub mod clock;
pub mod remote;
pub mod storage;

pub use clock::{local_day, Clock};
pub use remote::{RemoteError, RemoteStore};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
