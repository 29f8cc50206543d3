//! Utility modules for procmetrics.

pub mod start_time;

pub use start_time::process_start_time;
