pub mod client;
pub mod command;

pub use client::{Client, ClientError, Intervals};
pub use command::{BreakCommand, Command, TaskCommand};
