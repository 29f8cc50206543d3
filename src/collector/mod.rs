//! Process metrics collector for Linux.
//!
//! This module reads the kernel reports of the current process from the
//! `/proc` filesystem, with support for mocking for testing off Linux.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ProcessMetrics                       │
//! │  - /proc/self/stat    -> parse_proc_stat                 │
//! │  - /proc/self/smaps   -> SmapsEntryScanner               │
//! │  - /proc/self/io      -> parse_proc_io                   │
//! │  - /proc/self/limits  -> parse_max_open_files            │
//! │  - /proc/self/fd      -> read_dir                        │
//! │                           │                              │
//! │                    ┌──────▼──────┐                       │
//! │                    │  FileSystem │ (trait)               │
//! │                    └──────┬──────┘                       │
//! └───────────────────────────┼──────────────────────────────┘
//!                  ┌──────────┴──────────┐
//!           ┌──────▼──────┐       ┌──────▼──────┐
//!           │   RealFs    │       │   MockFs    │
//!           │  (Linux)    │       │  (Testing)  │
//!           └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use procmetrics::collector::{ProcessMetrics, RealFs};
//!
//! let metrics = ProcessMetrics::new(RealFs::new(), "/proc");
//! metrics.write_process_metrics(&mut std::io::stdout()).unwrap();
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use procmetrics::collector::{MockFs, ProcessMetrics};
//!
//! let fs = MockFs::typical_process();
//! let metrics = ProcessMetrics::new(fs, "/proc").with_start_time(1_700_000_000);
//! let sample = metrics.collect();
//! assert!(sample.status.is_some());
//! ```

pub mod mock;
mod process;
pub mod procfs;
pub mod traits;

pub use mock::MockFs;
pub use process::{CollectError, ProcessMetrics, ProcessSample};
pub use procfs::ParseError;
pub use traits::{FileSystem, RealFs};
