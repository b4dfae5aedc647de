pub mod app;

pub use app::{Client, ClientError};
