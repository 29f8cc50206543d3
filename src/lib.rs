//! procmetrics - resource usage metrics of the current process.
//!
//! Reads `/proc/self/{stat,smaps,io,limits,fd}` on every call and renders the
//! values as flat `name value` lines for a scraper:
//! - `collector` - filesystem abstraction, procfs parsers, the process collector
//! - `metrics` - metric names, values and the line writer
//! - `util` - process-wide start timestamp

pub mod collector;
pub mod metrics;
pub mod util;
