//! Process-wide tracing setup shared by the dispenser binaries.

pub mod subscriber;

pub use subscriber::{LogFormat, init, init_with};
