//! Parsers for the `/proc/[pid]` reports of a single process.
//!
//! `parser` covers the line-oriented reports (`stat`, `io`, `limits`),
//! `smaps` the per-mapping memory accounting report.

pub mod parser;
pub mod smaps;

pub use parser::{IoCounters, ParseError, ProcessStatusRecord};
pub use smaps::{MemoryRegionEntry, RssBreakdown, SmapsEntryScanner};
