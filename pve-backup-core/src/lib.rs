pub mod api;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod log_classifier;
pub mod probe;
pub mod resolver;
pub mod schedule;
pub mod verdict;

pub use error::{ProbeError, Result};
