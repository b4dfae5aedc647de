pub mod adapter;
pub mod client;
pub mod domain;
pub mod utils;
