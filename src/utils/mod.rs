pub mod task;
pub mod tracing;
pub mod xdg;
