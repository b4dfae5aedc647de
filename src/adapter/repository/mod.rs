mod clock;
mod file;
mod folder;
mod tables;

pub use clock::SystemClock;
pub use file::FileStore;
pub use folder::FolderRemote;
pub use tables::Tables;
